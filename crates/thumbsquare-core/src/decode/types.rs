//! Decode errors and resampling filters.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a source could not be turned into pixels.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The input stream contained no bytes.
    #[error("Empty image stream")]
    Empty,

    /// The leading bytes match no enabled format.
    #[error("Invalid or unsupported image format")]
    InvalidFormat,

    /// The format was recognized but the data is truncated or corrupt.
    #[error("Corrupted or incomplete image file: {0}")]
    CorruptedFile(String),

    #[error("I/O error: {0}")]
    IoError(String),

    /// A buffer of this size is empty or cannot be allocated.
    #[error("Invalid dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
}

impl From<std::io::Error> for DecodeError {
    fn from(err: std::io::Error) -> Self {
        DecodeError::IoError(err.to_string())
    }
}

/// Resampling filter used when scaling a source to the square's short side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FilterType {
    Nearest,
    /// Linear interpolation; matches the usual platform thumbnail scaler.
    #[default]
    Bilinear,
    Lanczos3,
}

impl FilterType {
    pub fn to_image_filter(self) -> image::imageops::FilterType {
        match self {
            FilterType::Nearest => image::imageops::FilterType::Nearest,
            FilterType::Bilinear => image::imageops::FilterType::Triangle,
            FilterType::Lanczos3 => image::imageops::FilterType::Lanczos3,
        }
    }
}
