//! Square image transforms.
//!
//! Both operations are pure request/response functions: they hold no state
//! and perform no caching.
//!
//! # Coordinate System
//!
//! - Origin is the top-left corner
//! - Crop windows are expressed in pixels of the rescaled source

mod solid;
mod square;

pub use solid::{compute_solid_square, solid_square};
pub use square::{
    compute_cropped_square, crop_square, square_geometry, target_side, SquareGeometry,
    MAX_SCALED_BYTES, MAX_SIDE,
};
