//! Threshold-gated unsharp blend.
//!
//! For every R, G, B channel with original value `o` and blurred value `b`:
//!
//! ```text
//! |o - b| >= threshold  ->  clamp((a + 1) * (o - b) + b)
//! otherwise             ->  o
//! ```
//!
//! with `a = 4 * amount`. Channels where blur and original barely differ are
//! treated as flat and left alone; the rest are pushed away from the blurred
//! value, past the original. Alpha is taken from the original pixel.

use crate::OpsResult;
use crate::config::SharpenConfig;
use crate::error::check_len;
use crate::partition::{Phase, Stripe, StripeRows, fork_join, scatter_rows};
use rayon::ThreadPool;
use sharpen_core::pixel::{ALPHA_MASK, clamp_channel};
use tracing::{debug, trace};

/// Blend a single pixel pair.
///
/// ```rust
/// use sharpen_ops::unsharp::combine_pixel;
///
/// // Red differs by 20 >= threshold: 3 * 20 + 100 = 160
/// // Green differs by 1 < threshold: original kept
/// let out = combine_pixel(0xFF78_6400, 0xFF64_6500, 2.0, 2);
/// assert_eq!(out, 0xFFA0_6400);
/// ```
#[inline]
pub fn combine_pixel(original: u32, blurred: u32, amount4x: f32, threshold: i32) -> u32 {
    let mut out = original & ALPHA_MASK;
    for shift in [16u32, 8, 0] {
        let o = ((original >> shift) & 0xff) as i32;
        let b = ((blurred >> shift) & 0xff) as i32;
        let c = if (o - b).abs() >= threshold {
            clamp_channel(((amount4x + 1.0) * (o - b) as f32 + b as f32) as i32)
        } else {
            o as u8
        };
        out |= (c as u32) << shift;
    }
    out
}

/// Blend parameters for one filter call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnsharpBlend {
    /// `4 * amount`.
    pub amount4x: f32,
    /// Minimum per-channel difference treated as an edge.
    pub threshold: i32,
}

impl UnsharpBlend {
    /// Creates blend parameters from an already scaled amount.
    pub fn new(amount4x: f32, threshold: i32) -> Self {
        Self {
            amount4x,
            threshold,
        }
    }

    /// Blend parameters for `config`.
    pub fn from_config(config: &SharpenConfig) -> Self {
        Self::new(config.amount4x(), config.threshold)
    }

    /// Blends one pixel pair.
    #[inline]
    pub fn apply(&self, original: u32, blurred: u32) -> u32 {
        combine_pixel(original, blurred, self.amount4x, self.threshold)
    }

    /// Blends the rows owned by `stripe` directly into `dst` (row-major).
    pub fn combine_into(
        &self,
        stripe: Stripe,
        original: &[u32],
        blurred: &[u32],
        dst: &mut [u32],
        width: usize,
        height: usize,
    ) -> OpsResult<()> {
        check_len(original.len(), width, height)?;
        check_len(blurred.len(), width, height)?;
        check_len(dst.len(), width, height)?;
        for y in stripe.rows(height) {
            let span = y * width..(y + 1) * width;
            for ((out, &o), &b) in dst[span.clone()]
                .iter_mut()
                .zip(&original[span.clone()])
                .zip(&blurred[span])
            {
                *out = self.apply(o, b);
            }
        }
        Ok(())
    }

    /// Blends the rows owned by `stripe` into stripe-local storage.
    pub fn combine_stripe(
        &self,
        stripe: Stripe,
        original: &[u32],
        blurred: &[u32],
        width: usize,
        height: usize,
    ) -> OpsResult<StripeRows> {
        check_len(original.len(), width, height)?;
        check_len(blurred.len(), width, height)?;
        let mut out = StripeRows::zeroed(stripe, width, height);
        if width == 0 {
            return Ok(out);
        }
        for (y, row) in out.rows_mut() {
            let start = y * width;
            for (x, px) in row.iter_mut().enumerate() {
                *px = self.apply(original[start + x], blurred[start + x]);
            }
        }
        trace!(stripe = stripe.index(), "stripe combined");
        Ok(out)
    }

    /// Blends all rows with `stripes` tasks on `pool`, writing into `dst`.
    ///
    /// `dst` is only written after every stripe has succeeded.
    #[allow(clippy::too_many_arguments)]
    pub fn run(
        &self,
        pool: &ThreadPool,
        stripes: usize,
        original: &[u32],
        blurred: &[u32],
        dst: &mut [u32],
        width: usize,
        height: usize,
    ) -> OpsResult<()> {
        check_len(dst.len(), width, height)?;
        debug!(
            width,
            height,
            stripes,
            amount4x = self.amount4x,
            threshold = self.threshold,
            "combine"
        );

        let rows = fork_join(pool, stripes, Phase::Combine, |stripe| {
            self.combine_stripe(stripe, original, blurred, width, height)
        })?;
        scatter_rows(pool, &rows, dst, width, height)
    }
}
