//! Aspect-preserving center-crop to a square.
//!
//! The source is scaled so that its shorter side matches the target size, then
//! a `side x side` window is cut from the middle of the longer side.
//!
//! # Example
//!
//! ```ignore
//! // 200x100 source, 50px target
//! let geom = square_geometry(200, 100, 50.0)?;
//! assert_eq!((geom.scaled_width, geom.scaled_height), (100, 50));
//! assert_eq!((geom.x, geom.y), (25, 0));
//! ```

use crate::codec::ImageCodec;
use crate::decode::{self, DecodeError, FilterType};
use crate::error::ServiceError;
use crate::pixel::PixelBuffer;

/// Where the square window sits inside the rescaled source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SquareGeometry {
    /// Output side length in pixels.
    pub side: u32,
    /// Source width after scaling.
    pub scaled_width: u32,
    /// Source height after scaling.
    pub scaled_height: u32,
    /// Left edge of the window in the scaled image.
    pub x: u32,
    /// Top edge of the window in the scaled image.
    pub y: u32,
}

/// Largest output side length accepted.
pub const MAX_SIDE: u32 = 8192;

/// Largest rescaled source, in RGBA bytes, a crop may allocate.
///
/// A tall or wide source is scaled past the output square along its long
/// side, so this bounds the intermediate image rather than the output.
pub const MAX_SCALED_BYTES: u64 = 512 * 1024 * 1024;

/// Convert a requested size into an output side length.
///
/// The side is the size truncated toward zero; anything that truncates to
/// zero, is not finite, or exceeds [`MAX_SIDE`] is rejected.
pub fn target_side(size: f32) -> Result<u32, ServiceError> {
    if !size.is_finite() || size <= 0.0 {
        return Err(ServiceError::invalid(format!(
            "size must be a positive number, got {size}"
        )));
    }
    let side = size.trunc();
    if side < 1.0 || side > MAX_SIDE as f32 {
        return Err(ServiceError::invalid(format!(
            "size {size} is outside 1..={MAX_SIDE}"
        )));
    }
    Ok(side as u32)
}

/// Compute scale and crop window for a `width x height` source.
///
/// # Errors
///
/// - `ServiceError::InvalidRequest` if the target is unusable or the
///   rescaled source would exceed [`MAX_SCALED_BYTES`]
/// - `ServiceError::Decode` if the source has no pixels
pub fn square_geometry(
    width: u32,
    height: u32,
    target_size: f32,
) -> Result<SquareGeometry, ServiceError> {
    if width == 0 || height == 0 {
        return Err(DecodeError::InvalidDimensions { width, height }.into());
    }
    let side = target_side(target_size)?;

    let min_side = width.min(height) as f64;
    let ratio = target_size as f64 / min_side;
    let square = min_side * ratio;

    // Rounding can leave a scaled side a hair short of the window.
    let scaled_w = (width as f64 * ratio).round().max(side as f64);
    let scaled_h = (height as f64 * ratio).round().max(side as f64);
    let scaled_bytes = scaled_w * scaled_h * crate::pixel::BYTES_PER_PIXEL as f64;
    if scaled_bytes > MAX_SCALED_BYTES as f64 {
        return Err(ServiceError::invalid(format!(
            "{width}x{height} source scaled to {scaled_w}x{scaled_h} exceeds {MAX_SCALED_BYTES} bytes"
        )));
    }
    let scaled_width = scaled_w as u32;
    let scaled_height = scaled_h as u32;

    let x = centered_origin(scaled_width, square).min(scaled_width - side);
    let y = centered_origin(scaled_height, square).min(scaled_height - side);

    Ok(SquareGeometry {
        side,
        scaled_width,
        scaled_height,
        x,
        y,
    })
}

/// Truncate the slack to a whole pixel count first, then halve it.
fn centered_origin(scaled: u32, square: f64) -> u32 {
    let slack = (scaled as f64 - square).max(0.0) as u32;
    slack / 2
}

/// Scale `image` and cut out the square window described by `geometry`.
pub fn crop_square(
    image: &PixelBuffer,
    geometry: &SquareGeometry,
    filter: FilterType,
) -> Result<PixelBuffer, DecodeError> {
    let scaled = decode::resize(
        image,
        geometry.scaled_width,
        geometry.scaled_height,
        filter,
    )?;

    let side = geometry.side;
    let start = geometry.x as usize * crate::pixel::BYTES_PER_PIXEL;
    let len = side as usize * crate::pixel::BYTES_PER_PIXEL;
    let mut output =
        PixelBuffer::new(side, side).ok_or(DecodeError::InvalidDimensions {
            width: side,
            height: side,
        })?;

    // Copy pixel data row by row
    for y in 0..side {
        let src = scaled
            .row(geometry.y + y)
            .and_then(|row| row.get(start..start + len));
        let dst = output.row_mut(y);
        match (src, dst) {
            (Some(src), Some(dst)) => dst.copy_from_slice(src),
            _ => {
                return Err(DecodeError::CorruptedFile(format!(
                    "crop window row {} outside {}x{} image",
                    geometry.y + y,
                    scaled.width(),
                    scaled.height()
                )))
            }
        }
    }

    Ok(output)
}

/// Decode `source`, center-crop it to a `size x size` square and encode it.
///
/// # Errors
///
/// - `ServiceError::InvalidRequest` if `size` is not usable
/// - `ServiceError::Decode` if `source` is empty, truncated or unsupported
/// - `ServiceError::Encode` if the result cannot be written
pub fn compute_cropped_square(
    codec: &dyn ImageCodec,
    source: &[u8],
    size: f32,
    filter: FilterType,
) -> Result<Vec<u8>, ServiceError> {
    target_side(size)?;

    let image = codec.decode(source)?;
    let geometry = square_geometry(image.width(), image.height(), size)?;

    log::debug!(
        "cropping {}x{} source to {}px square (scaled {}x{}, origin {},{})",
        image.width(),
        image.height(),
        geometry.side,
        geometry.scaled_width,
        geometry.scaled_height,
        geometry.x,
        geometry.y
    );

    let square = crop_square(&image, &geometry, filter)?;
    Ok(codec.encode(&square)?)
}
