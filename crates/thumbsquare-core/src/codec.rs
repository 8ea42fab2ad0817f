//! Swappable decode/encode capability.
//!
//! The cropping math in [`crate::transform`] is codec-agnostic. An
//! [`ImageCodec`] supplies the two format-specific steps around it: turning
//! source bytes into a [`PixelBuffer`] and turning the result back into bytes.

use crate::decode::{self, DecodeError};
use crate::encode::{self, EncodeError};
use crate::pixel::PixelBuffer;

/// A decoder/encoder pair used by the transform engine.
pub trait ImageCodec: Send + Sync {
    /// Decode source bytes into RGBA pixels.
    fn decode(&self, bytes: &[u8]) -> Result<PixelBuffer, DecodeError>;

    /// Encode RGBA pixels into the output format.
    fn encode(&self, image: &PixelBuffer) -> Result<Vec<u8>, EncodeError>;
}

/// Default codec: sniffs any supported input format, writes PNG.
#[derive(Debug, Clone, Copy)]
pub struct PngCodec {
    apply_orientation: bool,
}

impl PngCodec {
    pub fn new() -> Self {
        Self {
            apply_orientation: true,
        }
    }

    /// Whether EXIF orientation is applied when decoding.
    pub fn with_orientation(apply_orientation: bool) -> Self {
        Self { apply_orientation }
    }
}

impl Default for PngCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageCodec for PngCodec {
    fn decode(&self, bytes: &[u8]) -> Result<PixelBuffer, DecodeError> {
        if self.apply_orientation {
            decode::decode_image(bytes)
        } else {
            decode::decode_image_no_orientation(bytes)
        }
    }

    fn encode(&self, image: &PixelBuffer) -> Result<Vec<u8>, EncodeError> {
        encode::encode_pixel_buffer(image)
    }
}
