//! Thumbsquare WASM - WebAssembly bindings for thumbsquare
//!
//! This crate exposes the thumbsquare-core square image service to
//! JavaScript/TypeScript applications.
//!
//! # Module Structure
//!
//! - `service` - Cache-fronted service object (`JsImageService`)
//! - `transform` - Uncached square transforms
//! - `types` - JS-facing config/stats types and error conversion
//! - `logging` - Console backend for the `log` facade
//!
//! # Usage
//!
//! ```typescript
//! import init, { JsImageService, compute_solid_square } from '@thumbsquare/wasm';
//!
//! // Initialize WASM module (must call first)
//! await init();
//!
//! const service = new JsImageService();
//! const bytes = new Uint8Array(await file.arrayBuffer());
//! const png = service.square(bytes, 128, file.name);
//! ```

use wasm_bindgen::prelude::*;

mod logging;
mod service;
mod transform;
mod types;

// Re-export public types
pub use service::JsImageService;
pub use transform::{compute_cropped_square, compute_solid_square};

/// Initialize the WASM module (called automatically on load)
#[wasm_bindgen(start)]
pub fn init() {
    logging::install(log::LevelFilter::Info);
}

/// Get the version of the WASM module
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
