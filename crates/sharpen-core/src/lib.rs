//! # sharpen-core
//!
//! Core types shared by the sharpen-rs crates.
//!
//! - [`PixelBuffer`] - Row-major buffer of packed ARGB pixels
//! - [`pixel`] - Packing, unpacking and clamping of 8-bit channels
//! - [`Error`], [`Result`] - Buffer construction and access errors
//!
//! ## Crate Structure
//!
//! ```text
//! sharpen-core (this crate)
//!    ^
//!    |
//!    +-- sharpen-ops (convolution, unsharp masking)
//!    +-- sharpen-cli, sharpen-bench
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod buffer;
pub mod error;
pub mod pixel;

pub use buffer::{PixelBuffer, pixel_count};
pub use error::{Error, Result};

/// Prelude module for convenient imports.
///
/// ```
/// use sharpen_core::prelude::*;
///
/// let buf = PixelBuffer::filled(2, 2, pack_argb(255, 1, 2, 3)).unwrap();
/// assert_eq!(buf.len(), 4);
/// ```
pub mod prelude {
    pub use crate::buffer::PixelBuffer;
    pub use crate::error::{Error, Result};
    pub use crate::pixel::{alpha, blue, clamp_channel, green, pack_argb, red, unpack_argb};
}
