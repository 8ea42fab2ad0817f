//! Solid-color squares.
//!
//! No decode step: the buffer is synthesized directly and every pixel is
//! written through the row views of [`PixelBuffer`].

use crate::codec::ImageCodec;
use crate::error::ServiceError;
use crate::pixel::{PixelBuffer, Rgba};

use super::square::target_side;

/// Allocate a `side x side` buffer and fill it with `color`.
///
/// Returns `None` if the buffer size overflows.
pub fn solid_square(side: u32, color: Rgba) -> Option<PixelBuffer> {
    let mut buffer = PixelBuffer::new(side, side)?;
    buffer.fill(color);
    Some(buffer)
}

/// Synthesize a `size x size` square of `color` and encode it.
///
/// Any color is valid; this only fails on an unusable size or an encoder error.
pub fn compute_solid_square(
    codec: &dyn ImageCodec,
    size: f32,
    color: Rgba,
) -> Result<Vec<u8>, ServiceError> {
    let side = target_side(size)?;
    log::debug!("filling {side}px square with {color:?}");
    let buffer = solid_square(side, color)
        .ok_or_else(|| ServiceError::invalid(format!("cannot allocate {side}px square")))?;
    Ok(codec.encode(&buffer)?)
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::codec::PngCodec;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        /// Property: Every decoded pixel equals the requested color.
        #[test]
        fn prop_solid_square_is_uniform(
            size in 1u32..=32,
            color in any::<[u8; 4]>(),
        ) {
            let color = Rgba::from(color);
            let codec = PngCodec::new();
            let png = compute_solid_square(&codec, size as f32, color).unwrap();
            let out = codec.decode(&png).unwrap();

            prop_assert_eq!((out.width(), out.height()), (size, size));
            for row in 0..size {
                for col in 0..size {
                    prop_assert_eq!(out.pixel(col, row), Some(color));
                }
            }
        }
    }
}
