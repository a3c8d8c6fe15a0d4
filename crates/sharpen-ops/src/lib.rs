//! # sharpen-ops
//!
//! Parallel unsharp-mask sharpening for packed-ARGB pixel buffers.
//!
//! The filter blurs the source with two 1-D convolution passes (each pass
//! writes its output transposed, so the second pass runs along the other
//! axis), then blends blur and original with a per-channel threshold.
//! Every phase is split into row stripes that run on a caller-supplied
//! [`rayon::ThreadPool`].
//!
//! # Modules
//!
//! - [`kernel`] - 1-D kernels, Gaussian generation
//! - [`convolve`] - Convolve-and-transpose passes, edge policies
//! - [`partition`] - Stripes, fork-join barrier, merging stripe output
//! - [`unsharp`] - Threshold-gated blend
//! - [`config`] - Filter parameters
//! - [`filter`] - The [`UnsharpFilter`] entry point
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use sharpen_core::PixelBuffer;
//! use sharpen_ops::{SharpenConfig, UnsharpFilter};
//!
//! let pool = Arc::new(rayon::ThreadPoolBuilder::new().num_threads(4).build().unwrap());
//! let config = SharpenConfig::default()
//!     .with_radius(3.0)
//!     .with_amount(0.6)
//!     .with_num_threads(4);
//! let filter = UnsharpFilter::new(pool, config).unwrap();
//!
//! let src = PixelBuffer::from_fn(32, 32, |x, y| {
//!     if (x / 8 + y / 8) % 2 == 0 { 0xFF20_2020 } else { 0xFFE0_E0E0 }
//! })
//! .unwrap();
//! let out = filter.filter(&src, None).unwrap();
//! assert_eq!(out.dimensions(), src.dimensions());
//! ```
//!
//! # Feature Flags
//!
//! - `serde` - Serialize/deserialize [`SharpenConfig`] and [`EdgePolicy`]

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod error;
pub mod config;
pub mod convolve;
pub mod filter;
pub mod kernel;
pub mod partition;
pub mod unsharp;

pub use config::SharpenConfig;
pub use convolve::EdgePolicy;
pub use error::{OpsError, OpsResult};
pub use filter::{UnsharpFilter, sharpen};
pub use kernel::Kernel;
pub use partition::Phase;
