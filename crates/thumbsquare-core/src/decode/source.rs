//! Source image decoding with EXIF orientation handling.
//!
//! Any format the `image` crate is built with is accepted; the format is
//! guessed from the leading bytes rather than trusted from a file name.

use std::io::{Cursor, Read};

use exif::{In, Reader, Tag};
use image::{DynamicImage, ImageError, ImageReader};

use super::DecodeError;
use crate::pixel::PixelBuffer;

/// Decode an image from bytes, applying EXIF orientation correction.
///
/// # Errors
///
/// Returns `DecodeError::Empty` for zero-length input,
/// `DecodeError::InvalidFormat` if the format is not recognized, and
/// `DecodeError::CorruptedFile` if the data is truncated or corrupt.
pub fn decode_image(bytes: &[u8]) -> Result<PixelBuffer, DecodeError> {
    let orientation = extract_orientation(bytes);
    let img = decode_dynamic(bytes)?;
    let oriented = apply_orientation(img, orientation);
    Ok(PixelBuffer::from_rgba_image(oriented.into_rgba8()))
}

/// Decode an image from bytes without applying EXIF orientation.
pub fn decode_image_no_orientation(bytes: &[u8]) -> Result<PixelBuffer, DecodeError> {
    let img = decode_dynamic(bytes)?;
    Ok(PixelBuffer::from_rgba_image(img.into_rgba8()))
}

/// Drain a readable stream into memory.
///
/// Decoders need random access for format sniffing and EXIF lookup, so the
/// stream is buffered in full before decoding.
pub fn read_source<R: Read>(mut reader: R) -> Result<Vec<u8>, DecodeError> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    if bytes.is_empty() {
        return Err(DecodeError::Empty);
    }
    Ok(bytes)
}

fn decode_dynamic(bytes: &[u8]) -> Result<DynamicImage, DecodeError> {
    if bytes.is_empty() {
        return Err(DecodeError::Empty);
    }

    let reader = ImageReader::new(Cursor::new(bytes)).with_guessed_format()?;
    if reader.format().is_none() {
        return Err(DecodeError::InvalidFormat);
    }

    reader.decode().map_err(map_image_error)
}

fn map_image_error(err: ImageError) -> DecodeError {
    match err {
        ImageError::Unsupported(_) => DecodeError::InvalidFormat,
        other => DecodeError::CorruptedFile(other.to_string()),
    }
}

/// EXIF orientation tag values 1 through 8.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Orientation {
    Upright,
    MirrorX,
    Turn180,
    MirrorY,
    Transpose,
    Turn90,
    Transverse,
    Turn270,
}

impl Orientation {
    fn from_exif(value: u32) -> Self {
        match value {
            2 => Orientation::MirrorX,
            3 => Orientation::Turn180,
            4 => Orientation::MirrorY,
            5 => Orientation::Transpose,
            6 => Orientation::Turn90,
            7 => Orientation::Transverse,
            8 => Orientation::Turn270,
            _ => Orientation::Upright,
        }
    }
}

/// Sources without EXIF, or with an unreadable tag, are taken as upright.
fn extract_orientation(bytes: &[u8]) -> Orientation {
    let mut cursor = Cursor::new(bytes);
    Reader::new()
        .read_from_container(&mut cursor)
        .ok()
        .and_then(|exif| {
            exif.get_field(Tag::Orientation, In::PRIMARY)
                .and_then(|field| field.value.get_uint(0))
        })
        .map_or(Orientation::Upright, Orientation::from_exif)
}

/// Rotate or mirror `img` so it displays upright.
fn apply_orientation(img: DynamicImage, orientation: Orientation) -> DynamicImage {
    match orientation {
        Orientation::Upright => img,
        Orientation::MirrorX => img.fliph(),
        Orientation::Turn180 => img.rotate180(),
        Orientation::MirrorY => img.flipv(),
        Orientation::Transpose => img.rotate90().fliph(),
        Orientation::Turn90 => img.rotate90(),
        Orientation::Transverse => img.rotate270().fliph(),
        Orientation::Turn270 => img.rotate270(),
    }
}
