//! Image resampling.
//!
//! Thin wrapper over the `image` crate's resize. Returns a new packed
//! `PixelBuffer` without modifying the input.

use super::{DecodeError, FilterType};
use crate::pixel::PixelBuffer;

/// Resize an image to exact dimensions.
///
/// # Errors
///
/// Returns `DecodeError::InvalidDimensions` if either target dimension is zero
/// or the output would not fit in memory.
pub fn resize(
    image: &PixelBuffer,
    width: u32,
    height: u32,
    filter: FilterType,
) -> Result<PixelBuffer, DecodeError> {
    let len = (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(crate::pixel::BYTES_PER_PIXEL));
    if width == 0 || height == 0 || len.is_none() {
        return Err(DecodeError::InvalidDimensions { width, height });
    }

    // Fast path: if dimensions match, just clone
    if image.width() == width && image.height() == height {
        return Ok(image.clone());
    }

    let rgba = image
        .to_rgba_image()
        .ok_or_else(|| DecodeError::CorruptedFile("Failed to create RgbaImage".to_string()))?;

    let resized = image::imageops::resize(&rgba, width, height, filter.to_image_filter());

    Ok(PixelBuffer::from_rgba_image(resized))
}
