//! Separable convolution with an implicit transpose.
//!
//! One pass convolves every row of a `width x height` image with a 1-D
//! [`Kernel`] and writes pixel `(x, y)` to index `x * height + y` of the
//! destination, i.e. the result is transposed. Running the same pass again on
//! that intermediate, with width and height swapped, convolves along the
//! other axis and transposes back, giving the full 2-D separable blur in the
//! original orientation.
//!
//! ```text
//! src (w x h) --pass--> tmp (h x w) --pass--> blurred (w x h)
//! ```
//!
//! # Example
//!
//! ```rust
//! use sharpen_ops::convolve::{blur, EdgePolicy};
//! use sharpen_ops::kernel::Kernel;
//!
//! let src = vec![0xFF80_8080u32; 6 * 4];
//! let out = blur(&Kernel::gaussian(1.0), &src, 6, 4, true, EdgePolicy::Clamp).unwrap();
//! assert_eq!(out, src);
//! ```

use crate::error::check_len;
use crate::kernel::Kernel;
use crate::partition::{Phase, Stripe, StripeRows, fork_join, scatter_transposed};
use crate::{OpsError, OpsResult};
use rayon::ThreadPool;
use sharpen_core::pixel::{CHANNEL_SHIFTS, clamp_channel, pack_argb};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, trace};

/// How kernel taps outside the row are resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum EdgePolicy {
    /// Use the nearest boundary pixel.
    #[default]
    Clamp,
    /// Wrap around: column `-1` reads column `width - 1`.
    Wrap,
}

impl EdgePolicy {
    /// Maps a possibly out-of-range column onto `[0, width)`.
    ///
    /// `width` must be non-zero.
    ///
    /// ```rust
    /// use sharpen_ops::convolve::EdgePolicy;
    ///
    /// assert_eq!(EdgePolicy::Clamp.resolve(-2, 5), 0);
    /// assert_eq!(EdgePolicy::Clamp.resolve(7, 5), 4);
    /// assert_eq!(EdgePolicy::Wrap.resolve(-1, 5), 4);
    /// assert_eq!(EdgePolicy::Wrap.resolve(6, 5), 1);
    /// ```
    #[inline]
    pub fn resolve(self, ix: isize, width: usize) -> usize {
        let w = width as isize;
        if (0..w).contains(&ix) {
            return ix as usize;
        }
        match self {
            Self::Clamp => ix.clamp(0, w - 1) as usize,
            Self::Wrap => ix.rem_euclid(w) as usize,
        }
    }
}

impl fmt::Display for EdgePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Clamp => "clamp",
            Self::Wrap => "wrap",
        })
    }
}

impl FromStr for EdgePolicy {
    type Err = OpsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "clamp" => Ok(Self::Clamp),
            "wrap" => Ok(Self::Wrap),
            other => Err(OpsError::InvalidParameter(format!(
                "unknown edge policy '{other}' (expected clamp or wrap)"
            ))),
        }
    }
}

/// One axis of the separable blur: kernel plus per-pass options.
#[derive(Debug, Clone, Copy)]
pub struct AxisConvolution<'k> {
    /// Kernel applied along each row.
    pub kernel: &'k Kernel,
    /// When `false`, output alpha is forced to 255.
    pub alpha: bool,
    /// Resolution of taps past the row ends.
    pub edge_policy: EdgePolicy,
}

impl<'k> AxisConvolution<'k> {
    /// Creates a pass description.
    pub fn new(kernel: &'k Kernel, alpha: bool, edge_policy: EdgePolicy) -> Self {
        Self {
            kernel,
            alpha,
            edge_policy,
        }
    }

    /// Convolves the rows owned by `stripe`, writing transposed into `dst`.
    ///
    /// `src` is `width x height`; pixel `(x, y)` is stored at
    /// `dst[x * height + y]`. Only indices of owned rows are touched.
    pub fn transpose_into(
        &self,
        stripe: Stripe,
        src: &[u32],
        dst: &mut [u32],
        width: usize,
        height: usize,
    ) -> OpsResult<()> {
        check_len(src.len(), width, height)?;
        check_len(dst.len(), width, height)?;
        for y in stripe.rows(height) {
            let row = &src[y * width..(y + 1) * width];
            self.convolve_row(row, |x, px| dst[x * height + y] = px);
        }
        Ok(())
    }

    /// Convolves the rows owned by `stripe` into stripe-local storage.
    ///
    /// Produces the same pixels as [`transpose_into`](Self::transpose_into),
    /// kept row-major until [`scatter_transposed`] merges them.
    pub fn stripe_rows(
        &self,
        stripe: Stripe,
        src: &[u32],
        width: usize,
        height: usize,
    ) -> OpsResult<StripeRows> {
        check_len(src.len(), width, height)?;
        let mut out = StripeRows::zeroed(stripe, width, height);
        if width == 0 {
            return Ok(out);
        }
        for (y, dst_row) in out.rows_mut() {
            let row = &src[y * width..(y + 1) * width];
            self.convolve_row(row, |x, px| dst_row[x] = px);
        }
        trace!(stripe = stripe.index(), rows = stripe.row_count(height), "stripe convolved");
        Ok(out)
    }

    /// Runs the pass over all rows with `stripes` tasks on `pool`.
    ///
    /// Returns the transposed `height x width` result once every stripe has
    /// finished.
    pub fn run(
        &self,
        pool: &ThreadPool,
        stripes: usize,
        phase: Phase,
        src: &[u32],
        width: usize,
        height: usize,
    ) -> OpsResult<Vec<u32>> {
        check_len(src.len(), width, height)?;
        debug!(%phase, width, height, stripes, taps = self.kernel.len(), "convolve pass");

        let rows = fork_join(pool, stripes, phase, |stripe| {
            self.stripe_rows(stripe, src, width, height)
        })?;

        let mut dst = vec![0u32; src.len()];
        scatter_transposed(pool, &rows, &mut dst, width, height)?;
        Ok(dst)
    }

    /// Convolves one row, handing `(x, pixel)` to `emit` for each column.
    #[inline]
    fn convolve_row(&self, row: &[u32], mut emit: impl FnMut(usize, u32)) {
        let width = row.len();
        let half = self.kernel.half_width() as isize;
        let weights = self.kernel.weights();

        for x in 0..width {
            let mut sums = [0.0f32; 4];
            for (k, &f) in weights.iter().enumerate() {
                // Zero taps contribute nothing
                if f == 0.0 {
                    continue;
                }
                let ix = self
                    .edge_policy
                    .resolve(x as isize + k as isize - half, width);
                let rgb = row[ix];
                for (sum, shift) in sums.iter_mut().zip(CHANNEL_SHIFTS) {
                    *sum += f * ((rgb >> shift) & 0xff) as f32;
                }
            }

            let a = if self.alpha { round_channel(sums[0]) } else { 0xff };
            emit(
                x,
                pack_argb(
                    a,
                    round_channel(sums[1]),
                    round_channel(sums[2]),
                    round_channel(sums[3]),
                ),
            );
        }
    }
}

/// Rounds half up (truncating toward zero) and clamps to `[0, 255]`.
#[inline]
fn round_channel(sum: f32) -> u8 {
    clamp_channel((sum + 0.5) as i32)
}

/// Single-threaded separable blur of a `width x height` image.
///
/// Two [`AxisConvolution::transpose_into`] passes over the whole image. The
/// parallel path in [`crate::filter`] produces identical pixels.
pub fn blur(
    kernel: &Kernel,
    src: &[u32],
    width: usize,
    height: usize,
    alpha: bool,
    edge_policy: EdgePolicy,
) -> OpsResult<Vec<u32>> {
    check_len(src.len(), width, height)?;
    let pass = AxisConvolution::new(kernel, alpha, edge_policy);
    let mut transposed = vec![0u32; src.len()];
    let mut out = vec![0u32; src.len()];
    pass.transpose_into(Stripe::whole(), src, &mut transposed, width, height)?;
    pass.transpose_into(Stripe::whole(), &transposed, &mut out, height, width)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sharpen_core::pixel::{alpha, red};

    fn pool(n: usize) -> ThreadPool {
        rayon::ThreadPoolBuilder::new().num_threads(n).build().unwrap()
    }

    fn gray(v: u8) -> u32 {
        pack_argb(255, v, v, v)
    }

    #[test]
    fn test_transpose_layout() {
        // 3x2 image, identity kernel: one pass is a pure transpose
        let src: Vec<u32> = (0..6).map(|i| gray(i as u8 * 10)).collect();
        let mut dst = vec![0; 6];
        let k = Kernel::identity();
        AxisConvolution::new(&k, true, EdgePolicy::Clamp)
            .transpose_into(Stripe::whole(), &src, &mut dst, 3, 2)
            .unwrap();
        for y in 0..2 {
            for x in 0..3 {
                assert_eq!(dst[x * 2 + y], src[y * 3 + x]);
            }
        }
    }

    #[test]
    fn test_stripe_touches_only_owned_rows() {
        let src = vec![gray(100); 4 * 4];
        let mut dst = vec![0; 16];
        let k = Kernel::identity();
        let stripe = Stripe::new(1, 2).unwrap();
        AxisConvolution::new(&k, true, EdgePolicy::Clamp)
            .transpose_into(stripe, &src, &mut dst, 4, 4)
            .unwrap();
        for (i, &px) in dst.iter().enumerate() {
            let y = i % 4;
            assert_eq!(px != 0, stripe.owns(y), "index {i}");
        }
    }

    #[test]
    fn test_shift_kernel_edges() {
        // Only the tap at offset -1 is non-zero: out[x] = in[x - 1]
        let k = Kernel::new(vec![1.0, 0.0, 0.0]).unwrap();
        let src: Vec<u32> = (0..4).map(|i| gray(10 + i as u8)).collect();

        let mut clamped = vec![0; 4];
        AxisConvolution::new(&k, true, EdgePolicy::Clamp)
            .transpose_into(Stripe::whole(), &src, &mut clamped, 4, 1)
            .unwrap();
        assert_eq!(clamped, vec![src[0], src[0], src[1], src[2]]);

        let mut wrapped = vec![0; 4];
        AxisConvolution::new(&k, true, EdgePolicy::Wrap)
            .transpose_into(Stripe::whole(), &src, &mut wrapped, 4, 1)
            .unwrap();
        assert_eq!(wrapped, vec![src[3], src[0], src[1], src[2]]);
    }

    #[test]
    fn test_single_column_clamp() {
        let k = Kernel::gaussian(3.0);
        let src = vec![pack_argb(200, 50, 100, 150); 5];
        for edge in [EdgePolicy::Clamp, EdgePolicy::Wrap] {
            let out = blur(&k, &src, 1, 5, true, edge).unwrap();
            assert_eq!(out, src);
        }
    }

    #[test]
    fn test_saturating_weights() {
        let src = vec![pack_argb(255, 200, 10, 0)];

        let hot = Kernel::new(vec![3.0]).unwrap();
        let out = blur(&hot, &src, 1, 1, true, EdgePolicy::Clamp).unwrap();
        assert_eq!(out[0], pack_argb(255, 255, 90, 0));

        let negative = Kernel::new(vec![-1.0]).unwrap();
        let out = blur(&negative, &src, 1, 1, true, EdgePolicy::Clamp).unwrap();
        assert_eq!(out[0], 0);
    }

    #[test]
    fn test_alpha_forced_opaque() {
        let src = vec![pack_argb(40, 10, 20, 30); 4];
        let out = blur(&Kernel::gaussian(1.0), &src, 2, 2, false, EdgePolicy::Clamp).unwrap();
        assert!(out.iter().all(|&p| alpha(p) == 255));
        assert!(out.iter().all(|&p| red(p) == 10));
    }

    #[test]
    fn test_parallel_pass_matches_serial() {
        let (w, h) = (7, 5);
        let src: Vec<u32> = (0..w * h)
            .map(|i| pack_argb(255, (i * 37 % 256) as u8, (i * 11 % 256) as u8, (i * 5) as u8))
            .collect();
        let k = Kernel::gaussian(2.0);
        let pass = AxisConvolution::new(&k, true, EdgePolicy::Wrap);

        let mut serial = vec![0; w * h];
        pass.transpose_into(Stripe::whole(), &src, &mut serial, w, h).unwrap();

        let p = pool(2);
        for stripes in [1, 3, 8] {
            let parallel = pass.run(&p, stripes, Phase::HorizontalBlur, &src, w, h).unwrap();
            assert_eq!(parallel, serial, "stripes = {stripes}");
        }
    }

    #[test]
    fn test_length_checked() {
        let k = Kernel::identity();
        let mut dst = vec![0; 4];
        let err = AxisConvolution::new(&k, true, EdgePolicy::Clamp)
            .transpose_into(Stripe::whole(), &[0; 3], &mut dst, 2, 2)
            .unwrap_err();
        assert_eq!(err, OpsError::BufferLength { expected: 4, got: 3 });
    }

    #[test]
    fn test_edge_policy_parse() {
        assert_eq!("clamp".parse::<EdgePolicy>().unwrap(), EdgePolicy::Clamp);
        assert_eq!("WRAP".parse::<EdgePolicy>().unwrap(), EdgePolicy::Wrap);
        assert!("mirror".parse::<EdgePolicy>().is_err());
        assert_eq!(EdgePolicy::Wrap.to_string(), "wrap");
    }
}
