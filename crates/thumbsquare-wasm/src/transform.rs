//! WASM bindings for the uncached square transforms.
//!
//! These run the transform engine directly, without the result cache. Use
//! [`crate::JsImageService`] when repeated requests should be served from
//! memory.
//!
//! # Example (TypeScript)
//!
//! ```typescript
//! const bytes = new Uint8Array(await file.arrayBuffer());
//! const avatar = compute_cropped_square(bytes, 96);
//! const placeholder = compute_solid_square(96, 200, 200, 200, 255);
//! ```

use thumbsquare_core::decode::FilterType;
use thumbsquare_core::{transform, PngCodec, Rgba, ServiceError};
use wasm_bindgen::prelude::*;

use crate::types::to_js_error;

/// Center-crop an encoded image to a `size x size` PNG.
///
/// # Arguments
///
/// * `bytes` - Encoded source image (PNG or JPEG) as a `Uint8Array`
/// * `size` - Output side length in pixels
///
/// # Errors
///
/// Returns an error if the size is not positive or the source cannot be decoded.
#[wasm_bindgen]
pub fn compute_cropped_square(bytes: &[u8], size: f32) -> Result<Vec<u8>, JsValue> {
    cropped_square(bytes, size).map_err(to_js_error)
}

/// Create a `size x size` PNG filled with one RGBA color.
#[wasm_bindgen]
pub fn compute_solid_square(size: f32, r: u8, g: u8, b: u8, a: u8) -> Result<Vec<u8>, JsValue> {
    solid_square(size, Rgba::new(r, g, b, a)).map_err(to_js_error)
}

pub(crate) fn cropped_square(bytes: &[u8], size: f32) -> Result<Vec<u8>, ServiceError> {
    transform::compute_cropped_square(&PngCodec::new(), bytes, size, FilterType::Bilinear)
}

pub(crate) fn solid_square(size: f32, color: Rgba) -> Result<Vec<u8>, ServiceError> {
    transform::compute_solid_square(&PngCodec::new(), size, color)
}

/// Tests that avoid `JsValue` and run on every target.
#[cfg(test)]
mod tests {
    use super::*;
    use thumbsquare_core::ImageCodec;

    #[test]
    fn test_solid_square_binding_path() {
        let png = solid_square(6.0, Rgba::new(0, 128, 0, 255)).unwrap();
        let img = PngCodec::new().decode(&png).unwrap();
        assert_eq!((img.width(), img.height()), (6, 6));
        assert_eq!(img.pixel(5, 5), Some(Rgba::new(0, 128, 0, 255)));
    }

    #[test]
    fn test_cropped_square_binding_path() {
        let source = solid_square(40.0, Rgba::opaque(9, 9, 9)).unwrap();
        let png = cropped_square(&source, 10.0).unwrap();
        let img = PngCodec::new().decode(&png).unwrap();
        assert_eq!((img.width(), img.height()), (10, 10));
    }

    #[test]
    fn test_cropped_square_rejects_empty_source() {
        assert!(matches!(
            cropped_square(&[], 10.0),
            Err(ServiceError::Decode(_))
        ));
    }
}
