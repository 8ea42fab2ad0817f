//! RGBA pixel storage.
//!
//! [`PixelBuffer`] is a rectangular grid of 8-bit RGBA pixels with an explicit
//! row stride. Rows may be padded (stride > width * 4), which is how most
//! platform bitmaps lay out their planes. All access goes through bounds-checked
//! row slices, so the byte layout is
//!
//! ```text
//! offset(col, row) = stride * row + 4 * col + channel
//! ```
//!
//! with channels in R, G, B, A order.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Bytes per RGBA pixel.
pub const BYTES_PER_PIXEL: usize = 4;

/// An 8-bit RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Fully opaque color.
    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    /// Channel values in buffer order.
    #[inline]
    pub const fn to_bytes(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl From<[u8; 4]> for Rgba {
    fn from(bytes: [u8; 4]) -> Self {
        Self::new(bytes[0], bytes[1], bytes[2], bytes[3])
    }
}

/// A row-strided RGBA pixel grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    stride: usize,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Allocate a zeroed buffer with tightly packed rows.
    ///
    /// Returns `None` if `width * height * 4` does not fit in `usize`.
    pub fn new(width: u32, height: u32) -> Option<Self> {
        let stride = (width as usize).checked_mul(BYTES_PER_PIXEL)?;
        Self::with_stride(width, height, stride)
    }

    /// Allocate a zeroed buffer with the given row stride.
    ///
    /// A stride smaller than `width * 4` is raised to `width * 4`. Returns
    /// `None` if the backing store size overflows `usize`.
    pub fn with_stride(width: u32, height: u32, stride: usize) -> Option<Self> {
        let stride = stride.max((width as usize).checked_mul(BYTES_PER_PIXEL)?);
        let len = stride.checked_mul(height as usize)?;
        Some(Self {
            width,
            height,
            stride,
            data: vec![0u8; len],
        })
    }

    /// Wrap an existing backing store.
    ///
    /// Returns `None` if the stride cannot hold a row or the store is too
    /// short for `stride * height` bytes.
    pub fn from_raw(width: u32, height: u32, stride: usize, data: Vec<u8>) -> Option<Self> {
        if stride < (width as usize).checked_mul(BYTES_PER_PIXEL)? {
            return None;
        }
        if data.len() < stride.checked_mul(height as usize)? {
            return None;
        }
        Some(Self {
            width,
            height,
            stride,
            data,
        })
    }

    /// Take ownership of a packed `image::RgbaImage`.
    pub fn from_rgba_image(img: image::RgbaImage) -> Self {
        let (width, height) = img.dimensions();
        Self {
            width,
            height,
            stride: width as usize * BYTES_PER_PIXEL,
            data: img.into_raw(),
        }
    }

    /// Copy into a packed `image::RgbaImage`.
    pub fn to_rgba_image(&self) -> Option<image::RgbaImage> {
        image::RgbaImage::from_raw(self.width, self.height, self.packed_pixels().into_owned())
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Bytes per row, including any padding.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// The raw backing store, padding included.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Check if this buffer has no pixels.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Pixel bytes of one row, without padding.
    pub fn row(&self, row: u32) -> Option<&[u8]> {
        let range = self.row_range(row)?;
        self.data.get(range)
    }

    /// Mutable pixel bytes of one row, without padding.
    pub fn row_mut(&mut self, row: u32) -> Option<&mut [u8]> {
        let range = self.row_range(row)?;
        self.data.get_mut(range)
    }

    /// Read the pixel at `(col, row)`.
    pub fn pixel(&self, col: u32, row: u32) -> Option<Rgba> {
        if col >= self.width {
            return None;
        }
        let start = col as usize * BYTES_PER_PIXEL;
        let px = self.row(row)?.get(start..start + BYTES_PER_PIXEL)?;
        Some(Rgba::new(px[0], px[1], px[2], px[3]))
    }

    /// Write the pixel at `(col, row)`. Returns `false` if out of bounds.
    pub fn set_pixel(&mut self, col: u32, row: u32, color: Rgba) -> bool {
        if col >= self.width {
            return false;
        }
        let start = col as usize * BYTES_PER_PIXEL;
        match self
            .row_mut(row)
            .and_then(|r| r.get_mut(start..start + BYTES_PER_PIXEL))
        {
            Some(px) => {
                px.copy_from_slice(&color.to_bytes());
                true
            }
            None => false,
        }
    }

    /// Write `color` into every pixel, row by row. Padding bytes are left alone.
    pub fn fill(&mut self, color: Rgba) {
        let bytes = color.to_bytes();
        for row in 0..self.height {
            if let Some(r) = self.row_mut(row) {
                for px in r.chunks_exact_mut(BYTES_PER_PIXEL) {
                    px.copy_from_slice(&bytes);
                }
            }
        }
    }

    /// Pixel data with row padding removed (borrowed when already packed).
    pub fn packed_pixels(&self) -> Cow<'_, [u8]> {
        let row_len = self.width as usize * BYTES_PER_PIXEL;
        let packed_len = row_len * self.height as usize;
        if self.stride == row_len {
            return Cow::Borrowed(&self.data[..packed_len]);
        }

        let mut out = Vec::with_capacity(packed_len);
        for row in 0..self.height {
            if let Some(r) = self.row(row) {
                out.extend_from_slice(r);
            }
        }
        Cow::Owned(out)
    }

    fn row_range(&self, row: u32) -> Option<std::ops::Range<usize>> {
        if row >= self.height {
            return None;
        }
        let start = self.stride * row as usize;
        Some(start..start + self.width as usize * BYTES_PER_PIXEL)
    }
}
