//! Thumbsquare Core - square thumbnails with an in-memory result cache
//!
//! This crate turns a source image (or a solid color) into a fixed-size square
//! PNG and remembers the result under a caller-chosen cache name.
//!
//! # Module Structure
//!
//! - `pixel` - RGBA colors and row-strided pixel buffers
//! - `decode` - Source decoding (format sniffing, EXIF orientation) and resampling
//! - `encode` - PNG output
//! - `codec` - The swappable decode/encode pair used by the transforms
//! - `transform` - Center-cropped and solid-color squares
//! - `cache` - Result cache and the memory-pressure signal that bounds it
//! - `service` - Cache-fronted entry points for callers
//!
//! # Example
//!
//! ```ignore
//! use thumbsquare_core::{ImageRequest, ImageService, MemoryPressure, ServiceConfig};
//!
//! let pressure = MemoryPressure::new();
//! let service = ImageService::with_pressure(ServiceConfig::default(), &pressure)?;
//!
//! let request = ImageRequest::from_source(photo_bytes, 96.0).with_cache_key("user-42");
//! let png = service.get_square_image(&request)?;
//!
//! // Host reports low memory
//! pressure.notify(PressureLevel::Moderate);
//! ```

pub mod cache;
pub mod codec;
pub mod config;
pub mod decode;
pub mod encode;
pub mod error;
pub mod pixel;
pub mod service;
pub mod transform;

pub use cache::{MemoryPressure, PressureLevel, ResultCache};
pub use codec::{ImageCodec, PngCodec};
pub use config::ServiceConfig;
pub use error::ServiceError;
pub use pixel::{PixelBuffer, Rgba};
pub use service::{ImageRequest, ImageService};
pub use transform::{compute_cropped_square, compute_solid_square};
