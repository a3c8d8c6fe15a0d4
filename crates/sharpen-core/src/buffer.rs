//! Packed-ARGB pixel buffer.
//!
//! [`PixelBuffer`] is the unit of data exchanged with decoding/encoding
//! collaborators: a row-major vector of packed pixels plus its dimensions.
//!
//! # Memory Layout
//!
//! ```text
//! index = y * width + x
//!
//! [p(0,0) p(1,0) ... p(w-1,0)]  <- row 0
//! [p(0,1) p(1,1) ... p(w-1,1)]  <- row 1
//! ...
//! ```
//!
//! # Usage
//!
//! ```rust
//! use sharpen_core::PixelBuffer;
//!
//! let mut buf = PixelBuffer::filled(4, 2, 0xFF80_8080).unwrap();
//! buf.set_pixel(1, 1, 0xFF00_0000).unwrap();
//! assert_eq!(buf.pixel(1, 1), Some(0xFF00_0000));
//! assert_eq!(buf.len(), 8);
//! ```

use crate::pixel;
use crate::{Error, Result};

/// Owned row-major buffer of packed ARGB pixels.
///
/// Invariant: `pixels.len() == width * height`. Every constructor checks it
/// and no method can break it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    pixels: Vec<u32>,
}

/// Number of pixels for `width x height`, checking for overflow.
pub fn pixel_count(width: u32, height: u32) -> Result<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .ok_or_else(|| Error::invalid_dimensions(width, height, "pixel count overflows usize"))
}

impl PixelBuffer {
    /// Creates a zeroed (transparent black) buffer.
    pub fn new(width: u32, height: u32) -> Result<Self> {
        Self::filled(width, height, 0)
    }

    /// Creates a buffer with every pixel set to `argb`.
    pub fn filled(width: u32, height: u32, argb: u32) -> Result<Self> {
        let len = pixel_count(width, height)?;
        Ok(Self {
            width,
            height,
            pixels: vec![argb; len],
        })
    }

    /// Wraps an existing pixel vector.
    ///
    /// # Errors
    ///
    /// [`Error::BufferLength`] if `pixels.len() != width * height`.
    pub fn from_pixels(width: u32, height: u32, pixels: Vec<u32>) -> Result<Self> {
        let expected = pixel_count(width, height)?;
        if pixels.len() != expected {
            return Err(Error::buffer_length(expected, pixels.len()));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Builds a buffer by evaluating `f(x, y)` for every pixel.
    ///
    /// ```rust
    /// use sharpen_core::PixelBuffer;
    ///
    /// let ramp = PixelBuffer::from_fn(3, 1, |x, _| 0xFF00_0000 | x).unwrap();
    /// assert_eq!(ramp.pixels(), &[0xFF00_0000, 0xFF00_0001, 0xFF00_0002]);
    /// ```
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> u32) -> Result<Self> {
        let len = pixel_count(width, height)?;
        let mut pixels = Vec::with_capacity(len);
        for y in 0..height {
            for x in 0..width {
                pixels.push(f(x, y));
            }
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Builds a buffer from interleaved RGBA8 bytes.
    ///
    /// # Errors
    ///
    /// [`Error::BufferLength`] if `bytes.len() != width * height * 4`.
    pub fn from_rgba8(width: u32, height: u32, bytes: &[u8]) -> Result<Self> {
        let len = pixel_count(width, height)?;
        let expected = len
            .checked_mul(4)
            .ok_or_else(|| Error::invalid_dimensions(width, height, "byte size overflows usize"))?;
        if bytes.len() != expected {
            return Err(Error::buffer_length(expected, bytes.len()));
        }
        let pixels = bytes
            .chunks_exact(4)
            .map(|px| pixel::from_rgba([px[0], px[1], px[2], px[3]]))
            .collect();
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Returns the pixels as interleaved RGBA8 bytes.
    pub fn to_rgba8(&self) -> Vec<u8> {
        self.pixels.iter().flat_map(|&p| pixel::to_rgba(p)).collect()
    }

    /// Creates a zeroed buffer with the same dimensions as `self`.
    ///
    /// Used when the caller does not supply a destination.
    pub fn compatible(&self) -> Self {
        Self {
            width: self.width,
            height: self.height,
            pixels: vec![0; self.pixels.len()],
        }
    }

    /// Buffer width in pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Buffer height in pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// `(width, height)`.
    #[inline]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Total number of pixels.
    #[inline]
    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    /// `true` when width or height is zero.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// `true` if `other` has the same width and height.
    #[inline]
    pub fn same_size(&self, other: &Self) -> bool {
        self.dimensions() == other.dimensions()
    }

    /// Checks that `other` has the same width and height.
    pub fn ensure_same_size(&self, other: &Self) -> Result<()> {
        if self.same_size(other) {
            Ok(())
        } else {
            Err(Error::dimension_mismatch(self.dimensions(), other.dimensions()))
        }
    }

    /// Pixel at `(x, y)`, or `None` when out of bounds.
    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> Option<u32> {
        if x < self.width && y < self.height {
            Some(self.pixels[y as usize * self.width as usize + x as usize])
        } else {
            None
        }
    }

    /// Overwrites the pixel at `(x, y)`.
    pub fn set_pixel(&mut self, x: u32, y: u32, argb: u32) -> Result<()> {
        if x >= self.width || y >= self.height {
            return Err(Error::out_of_bounds(x, y, self.width, self.height));
        }
        self.pixels[y as usize * self.width as usize + x as usize] = argb;
        Ok(())
    }

    /// Row-major pixel slice.
    #[inline]
    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    /// Mutable row-major pixel slice. The length cannot change.
    #[inline]
    pub fn pixels_mut(&mut self) -> &mut [u32] {
        &mut self.pixels
    }

    /// Consumes the buffer, returning the pixel vector.
    #[inline]
    pub fn into_pixels(self) -> Vec<u32> {
        self.pixels
    }

    /// Row `y` as a slice.
    pub fn row(&self, y: u32) -> Option<&[u32]> {
        if y >= self.height {
            return None;
        }
        let w = self.width as usize;
        let start = y as usize * w;
        Some(&self.pixels[start..start + w])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_pixels_checks_length() {
        assert!(PixelBuffer::from_pixels(2, 2, vec![0; 4]).is_ok());
        let err = PixelBuffer::from_pixels(2, 2, vec![0; 3]).unwrap_err();
        assert_eq!(err, Error::buffer_length(4, 3));
    }

    #[test]
    fn test_zero_sized_is_empty() {
        let buf = PixelBuffer::new(0, 7).unwrap();
        assert!(buf.is_empty());
        assert_eq!(buf.dimensions(), (0, 7));
        assert_eq!(buf.row(0), Some(&[][..]));
    }

    #[test]
    fn test_pixel_access() {
        let mut buf = PixelBuffer::new(3, 2).unwrap();
        buf.set_pixel(2, 1, 0xFFFF_FFFF).unwrap();
        assert_eq!(buf.pixel(2, 1), Some(0xFFFF_FFFF));
        assert_eq!(buf.pixels()[5], 0xFFFF_FFFF);
        assert_eq!(buf.pixel(3, 0), None);
        assert!(buf.set_pixel(0, 2, 0).unwrap_err().is_bounds_error());
    }

    #[test]
    fn test_compatible_keeps_size() {
        let buf = PixelBuffer::filled(5, 3, 0xFF12_3456).unwrap();
        let dst = buf.compatible();
        assert!(buf.same_size(&dst));
        assert!(dst.pixels().iter().all(|&p| p == 0));
    }

    #[test]
    fn test_ensure_same_size() {
        let a = PixelBuffer::new(4, 4).unwrap();
        let b = PixelBuffer::new(4, 5).unwrap();
        assert!(a.ensure_same_size(&a.compatible()).is_ok());
        assert_eq!(
            a.ensure_same_size(&b).unwrap_err(),
            Error::dimension_mismatch((4, 4), (4, 5))
        );
    }

    #[test]
    fn test_rgba8_conversion() {
        let bytes = [1u8, 2, 3, 4, 5, 6, 7, 8];
        let buf = PixelBuffer::from_rgba8(2, 1, &bytes).unwrap();
        assert_eq!(buf.pixels(), &[0x0401_0203, 0x0805_0607]);
        assert_eq!(buf.to_rgba8(), bytes.to_vec());
        assert!(PixelBuffer::from_rgba8(2, 1, &bytes[..7]).is_err());
    }

    #[test]
    fn test_rows() {
        let buf = PixelBuffer::from_fn(2, 3, |x, y| y * 10 + x).unwrap();
        assert_eq!(buf.row(1), Some(&[10, 11][..]));
        assert_eq!(buf.row(3), None);
    }
}
