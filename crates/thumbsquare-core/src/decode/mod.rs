//! Source image decoding and resampling.
//!
//! This module provides functionality for:
//! - Decoding source images (PNG, JPEG) from bytes or readable streams
//! - Correcting EXIF orientation so crops are taken from an upright image
//! - Resampling decoded pixel buffers
//!
//! All operations are synchronous and CPU-bound. Callers are expected to run
//! them off any UI thread.

mod resize;
mod source;
mod types;

pub use resize::resize;
pub use source::{decode_image, decode_image_no_orientation, read_source};
pub use types::{DecodeError, FilterType};
