//! Output encoding.
//!
//! Results are encoded to PNG so that they are portable and lossless.

mod png;

pub use png::{encode_pixel_buffer, encode_png, EncodeError};
