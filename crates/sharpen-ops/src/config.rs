//! Sharpening configuration.
//!
//! [`SharpenConfig`] is set once when an [`UnsharpFilter`](crate::UnsharpFilter)
//! is built and never changes afterwards. With the `serde` feature it can be
//! loaded from and saved to any serde format; missing fields take their
//! defaults.
//!
//! # Example
//!
//! ```rust
//! use sharpen_ops::{EdgePolicy, SharpenConfig};
//!
//! let config = SharpenConfig::default()
//!     .with_radius(3.0)
//!     .with_amount(0.8)
//!     .with_edge_policy(EdgePolicy::Wrap)
//!     .with_num_threads(4);
//! assert!(config.validate().is_ok());
//! assert_eq!(config.amount4x(), 3.2);
//! ```

use crate::convolve::EdgePolicy;
use crate::{OpsError, OpsResult};

/// Default blur radius in pixels.
pub const DEFAULT_RADIUS: f32 = 2.0;
/// Default sharpening amount (fraction).
pub const DEFAULT_AMOUNT: f32 = 0.5;
/// Default per-channel edge threshold.
pub const DEFAULT_THRESHOLD: i32 = 1;
/// Largest accepted blur radius in pixels. The kernel has
/// `2 * ceil(radius) + 1` taps.
pub const MAX_RADIUS: f32 = 1024.0;

/// Parameters of one unsharp-mask filter.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SharpenConfig {
    /// Blur radius in pixels, at most [`MAX_RADIUS`]. Zero or negative
    /// skips the blur.
    pub radius: f32,
    /// Sharpening strength as a fraction (0.5 = 50%).
    pub amount: f32,
    /// Channel difference (0-255) below which pixels are left untouched.
    pub threshold: i32,
    /// Whether the alpha channel is blurred. When `false` the blurred alpha
    /// is fully opaque.
    ///
    /// Output alpha is always copied from the source pixel, so this flag
    /// only affects the intermediate blur and never the filtered result.
    pub alpha: bool,
    /// Edge handling for both blur passes.
    pub edge_policy: EdgePolicy,
    /// Number of stripes (tasks) per phase.
    pub num_threads: usize,
}

impl Default for SharpenConfig {
    fn default() -> Self {
        Self {
            radius: DEFAULT_RADIUS,
            amount: DEFAULT_AMOUNT,
            threshold: DEFAULT_THRESHOLD,
            alpha: true,
            edge_policy: EdgePolicy::Clamp,
            num_threads: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
        }
    }
}

impl SharpenConfig {
    /// Sets the blur radius.
    pub fn with_radius(mut self, radius: f32) -> Self {
        self.radius = radius;
        self
    }

    /// Sets the sharpening amount.
    pub fn with_amount(mut self, amount: f32) -> Self {
        self.amount = amount;
        self
    }

    /// Sets the edge threshold.
    pub fn with_threshold(mut self, threshold: i32) -> Self {
        self.threshold = threshold;
        self
    }

    /// Sets whether alpha is blurred.
    pub fn with_alpha(mut self, alpha: bool) -> Self {
        self.alpha = alpha;
        self
    }

    /// Sets the edge policy.
    pub fn with_edge_policy(mut self, edge_policy: EdgePolicy) -> Self {
        self.edge_policy = edge_policy;
        self
    }

    /// Sets the number of stripes per phase.
    pub fn with_num_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = num_threads;
        self
    }

    /// Blend factor used by the combiner: `4 * amount`.
    #[inline]
    pub fn amount4x(&self) -> f32 {
        4.0 * self.amount
    }

    /// Checks every field.
    ///
    /// # Errors
    ///
    /// [`OpsError::InvalidParameter`] naming the first bad field.
    pub fn validate(&self) -> OpsResult<()> {
        if !self.radius.is_finite() || self.radius > MAX_RADIUS {
            return Err(OpsError::InvalidParameter(format!(
                "radius must be finite and at most {MAX_RADIUS}, got {}",
                self.radius
            )));
        }
        if !self.amount.is_finite() || self.amount < 0.0 {
            return Err(OpsError::InvalidParameter(format!(
                "amount must be a finite value >= 0, got {}",
                self.amount
            )));
        }
        if !(0..=255).contains(&self.threshold) {
            return Err(OpsError::InvalidParameter(format!(
                "threshold must be in 0..=255, got {}",
                self.threshold
            )));
        }
        if self.num_threads == 0 {
            return Err(OpsError::InvalidParameter(
                "num_threads must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
