//! Error types for sharpen-core operations.
//!
//! Covers the failure modes of pixel buffer construction and access:
//! - Dimensions whose pixel count does not fit in memory
//! - Pixel vectors whose length disagrees with `width * height`
//! - Buffers of different sizes passed where equal sizes are required
//! - Pixel coordinates outside the buffer
//!
//! # Usage
//!
//! ```rust
//! use sharpen_core::{Error, Result};
//!
//! fn check(x: u32, y: u32, width: u32, height: u32) -> Result<()> {
//!     if x >= width || y >= height {
//!         return Err(Error::out_of_bounds(x, y, width, height));
//!     }
//!     Ok(())
//! }
//! assert!(check(4, 0, 4, 4).is_err());
//! ```

use thiserror::Error;

/// Result type alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building or accessing pixel buffers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// Pixel coordinates are outside buffer bounds.
    #[error("pixel ({x}, {y}) out of bounds for buffer {width}x{height}")]
    OutOfBounds {
        /// X coordinate that was out of bounds
        x: u32,
        /// Y coordinate that was out of bounds
        y: u32,
        /// Buffer width
        width: u32,
        /// Buffer height
        height: u32,
    },

    /// Invalid buffer dimensions.
    ///
    /// Returned when `width * height` (or the byte size derived from it)
    /// overflows `usize`.
    #[error("invalid dimensions: {width}x{height} ({reason})")]
    InvalidDimensions {
        /// Requested width
        width: u32,
        /// Requested height
        height: u32,
        /// Reason why dimensions are invalid
        reason: String,
    },

    /// Pixel data length does not match the declared dimensions.
    #[error("buffer length mismatch: expected {expected} elements, got {got}")]
    BufferLength {
        /// Element count implied by the dimensions
        expected: usize,
        /// Element count actually supplied
        got: usize,
    },

    /// Two buffers that must share dimensions do not.
    #[error("dimension mismatch: {a_width}x{a_height} vs {b_width}x{b_height}")]
    DimensionMismatch {
        /// First buffer width
        a_width: u32,
        /// First buffer height
        a_height: u32,
        /// Second buffer width
        b_width: u32,
        /// Second buffer height
        b_height: u32,
    },
}

impl Error {
    /// Creates an [`Error::OutOfBounds`] error.
    #[inline]
    pub fn out_of_bounds(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self::OutOfBounds {
            x,
            y,
            width,
            height,
        }
    }

    /// Creates an [`Error::InvalidDimensions`] error.
    #[inline]
    pub fn invalid_dimensions(width: u32, height: u32, reason: impl Into<String>) -> Self {
        Self::InvalidDimensions {
            width,
            height,
            reason: reason.into(),
        }
    }

    /// Creates an [`Error::BufferLength`] error.
    #[inline]
    pub fn buffer_length(expected: usize, got: usize) -> Self {
        Self::BufferLength { expected, got }
    }

    /// Creates an [`Error::DimensionMismatch`] error.
    #[inline]
    pub fn dimension_mismatch(a: (u32, u32), b: (u32, u32)) -> Self {
        Self::DimensionMismatch {
            a_width: a.0,
            a_height: a.1,
            b_width: b.0,
            b_height: b.1,
        }
    }

    /// Returns `true` if this is a bounds-related error.
    #[inline]
    pub fn is_bounds_error(&self) -> bool {
        matches!(self, Self::OutOfBounds { .. })
    }

    /// Returns `true` if this error reports a size disagreement.
    #[inline]
    pub fn is_size_error(&self) -> bool {
        matches!(
            self,
            Self::BufferLength { .. }
                | Self::DimensionMismatch { .. }
                | Self::InvalidDimensions { .. }
        )
    }
}
