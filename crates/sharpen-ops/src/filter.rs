//! Parallel unsharp-mask filter.
//!
//! [`UnsharpFilter`] runs three phases on a caller-owned thread pool, each
//! closed by a barrier:
//!
//! ```text
//! src --horizontal pass--> transposed --vertical pass--> blurred
//!     (src, blurred) --combine--> dst
//! ```
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use sharpen_core::PixelBuffer;
//! use sharpen_ops::{SharpenConfig, UnsharpFilter};
//!
//! let pool = Arc::new(rayon::ThreadPoolBuilder::new().num_threads(2).build().unwrap());
//! let filter = UnsharpFilter::new(pool, SharpenConfig::default().with_num_threads(4)).unwrap();
//!
//! let src = PixelBuffer::filled(16, 8, 0xFF40_8020).unwrap();
//! let out = filter.filter(&src, None).unwrap();
//! assert_eq!(out, src); // no edges, nothing to sharpen
//! ```

use crate::config::SharpenConfig;
use crate::convolve::AxisConvolution;
use crate::kernel::Kernel;
use crate::partition::Phase;
use crate::unsharp::UnsharpBlend;
use crate::{OpsError, OpsResult};
use rayon::ThreadPool;
use sharpen_core::PixelBuffer;
use std::borrow::Cow;
use std::sync::Arc;
use tracing::debug;

/// Unsharp-mask sharpening over a shared worker pool.
///
/// Holds only immutable configuration; a single filter can serve any number
/// of sequential or concurrent `filter` calls.
#[derive(Debug, Clone)]
pub struct UnsharpFilter {
    pool: Arc<ThreadPool>,
    config: SharpenConfig,
    kernel: Kernel,
}

impl UnsharpFilter {
    /// Creates a filter with a Gaussian kernel built from `config.radius`.
    ///
    /// # Errors
    ///
    /// [`OpsError::InvalidParameter`] if `config` fails validation.
    pub fn new(pool: Arc<ThreadPool>, config: SharpenConfig) -> OpsResult<Self> {
        config.validate()?;
        let kernel = Kernel::gaussian(config.radius);
        Self::with_kernel(pool, config, kernel)
    }

    /// Creates a filter that blurs with a caller-supplied kernel.
    ///
    /// `config.radius` still decides whether the blur runs at all.
    pub fn with_kernel(
        pool: Arc<ThreadPool>,
        config: SharpenConfig,
        kernel: Kernel,
    ) -> OpsResult<Self> {
        config.validate()?;
        debug!(
            radius = config.radius,
            taps = kernel.len(),
            stripes = config.num_threads,
            pool_threads = pool.current_num_threads(),
            "unsharp filter configured"
        );
        Ok(Self {
            pool,
            config,
            kernel,
        })
    }

    /// Filter configuration.
    #[inline]
    pub fn config(&self) -> &SharpenConfig {
        &self.config
    }

    /// Blur kernel.
    #[inline]
    pub fn kernel(&self) -> &Kernel {
        &self.kernel
    }

    /// Worker pool.
    #[inline]
    pub fn pool(&self) -> &Arc<ThreadPool> {
        &self.pool
    }

    /// Sharpens `src` into `dst`, or into a new buffer when `dst` is `None`.
    ///
    /// Returns the written buffer. On error nothing is returned: the
    /// destination is dropped rather than handed back half written.
    ///
    /// # Errors
    ///
    /// - [`OpsError::DimensionMismatch`] if `dst` differs in size from `src`
    /// - [`OpsError::WorkerFailure`] if any task of any phase fails
    pub fn filter(&self, src: &PixelBuffer, dst: Option<PixelBuffer>) -> OpsResult<PixelBuffer> {
        let mut dst = match dst {
            Some(d) if !d.same_size(src) => {
                return Err(OpsError::DimensionMismatch {
                    expected: src.dimensions(),
                    got: d.dimensions(),
                });
            }
            Some(d) => d,
            None => src.compatible(),
        };
        if src.is_empty() {
            return Ok(dst);
        }

        let width = src.width() as usize;
        let height = src.height() as usize;
        let stripes = self.config.num_threads;
        debug!(width, height, stripes, radius = self.config.radius, "sharpening");

        let blurred = self.blurred(src.pixels(), width, height)?;

        UnsharpBlend::from_config(&self.config).run(
            &self.pool,
            stripes,
            src.pixels(),
            &blurred,
            dst.pixels_mut(),
            width,
            height,
        )?;
        Ok(dst)
    }

    /// Blurred copy of `src`, or `src` itself when the radius disables blur.
    fn blurred<'a>(
        &self,
        src: &'a [u32],
        width: usize,
        height: usize,
    ) -> OpsResult<Cow<'a, [u32]>> {
        if self.config.radius <= 0.0 {
            debug!(radius = self.config.radius, "blur skipped");
            return Ok(Cow::Borrowed(src));
        }
        let pass = AxisConvolution::new(&self.kernel, self.config.alpha, self.config.edge_policy);
        let stripes = self.config.num_threads;
        let transposed =
            pass.run(&self.pool, stripes, Phase::HorizontalBlur, src, width, height)?;
        let blurred =
            pass.run(&self.pool, stripes, Phase::VerticalBlur, &transposed, height, width)?;
        Ok(Cow::Owned(blurred))
    }
}

/// Sharpens `src` once with a throwaway [`UnsharpFilter`].
pub fn sharpen(
    pool: Arc<ThreadPool>,
    config: SharpenConfig,
    src: &PixelBuffer,
) -> OpsResult<PixelBuffer> {
    UnsharpFilter::new(pool, config)?.filter(src, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convolve::EdgePolicy;
    use crate::partition::fork_join;
    use sharpen_core::pixel::{alpha, pack_argb, red};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn pool(n: usize) -> Arc<ThreadPool> {
        Arc::new(rayon::ThreadPoolBuilder::new().num_threads(n).build().unwrap())
    }

    fn step_edge() -> PixelBuffer {
        // Left half dark, right half bright
        PixelBuffer::from_fn(8, 4, |x, _| {
            if x < 4 {
                pack_argb(255, 50, 50, 50)
            } else {
                pack_argb(255, 200, 200, 200)
            }
        })
        .unwrap()
    }

    #[test]
    fn test_sharpens_step_edge() {
        let config = SharpenConfig::default().with_num_threads(2);
        let out = sharpen(pool(2), config, &step_edge()).unwrap();
        // Blurred is 80 at x = 3 and 170 at x = 4; amount 0.5 gives a = 2
        assert_eq!(red(out.pixel(3, 0).unwrap()), 0);
        assert_eq!(red(out.pixel(4, 0).unwrap()), 255);
        // Far from the edge nothing changes
        assert_eq!(out.pixel(0, 2), Some(pack_argb(255, 50, 50, 50)));
        assert_eq!(out.pixel(7, 3), Some(pack_argb(255, 200, 200, 200)));
    }

    #[test]
    fn test_dimension_mismatch() {
        let filter = UnsharpFilter::new(pool(1), SharpenConfig::default()).unwrap();
        let src = PixelBuffer::new(4, 4).unwrap();
        let dst = PixelBuffer::new(4, 3).unwrap();
        let err = filter.filter(&src, Some(dst)).unwrap_err();
        assert_eq!(
            err,
            OpsError::DimensionMismatch {
                expected: (4, 4),
                got: (4, 3)
            }
        );
    }

    #[test]
    fn test_writes_into_supplied_dst() {
        let config = SharpenConfig::default().with_num_threads(3);
        let filter = UnsharpFilter::new(pool(2), config).unwrap();
        let src = step_edge();
        let fresh = filter.filter(&src, None).unwrap();
        let reused = filter
            .filter(&src, Some(PixelBuffer::filled(8, 4, 0xDEAD_BEEF).unwrap()))
            .unwrap();
        assert_eq!(fresh, reused);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = SharpenConfig::default().with_num_threads(0);
        assert!(matches!(
            UnsharpFilter::new(pool(1), config),
            Err(OpsError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_oversized_radius_rejected_before_kernel() {
        let config = SharpenConfig::default().with_radius(50_000.0);
        assert!(matches!(
            UnsharpFilter::new(pool(1), config.clone()),
            Err(OpsError::InvalidParameter(_))
        ));
        assert!(sharpen(pool(1), config, &step_edge()).is_err());
    }

    #[test]
    fn test_failed_phase_stops_later_phases() {
        let p = pool(2);
        let src = step_edge();
        let (w, h) = (8, 4);
        let kernel = Kernel::gaussian(2.0);
        let pass = AxisConvolution::new(&kernel, true, EdgePolicy::Clamp);
        let later = AtomicUsize::new(0);

        // Same sequence as `filter`: each phase runs only if the one before succeeded
        let result = fork_join(&p, 3, Phase::HorizontalBlur, |stripe| {
            if stripe.index() == 1 {
                panic!("lost stripe");
            }
            pass.stripe_rows(stripe, src.pixels(), w, h)
        })
        .and_then(|_| {
            fork_join(&p, 3, Phase::VerticalBlur, |_| {
                later.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
        })
        .and_then(|_| {
            fork_join(&p, 3, Phase::Combine, |_| {
                later.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
        });

        let err = result.unwrap_err();
        assert!(err.is_worker_failure());
        assert!(err.to_string().contains("horizontal blur"));
        assert_eq!(later.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_alpha_flag_does_not_change_output() {
        let src = PixelBuffer::from_fn(8, 4, |x, y| {
            let a = (40 + 50 * y) as u8;
            if x < 4 {
                pack_argb(a, 50, 50, 50)
            } else {
                pack_argb(a, 200, 200, 200)
            }
        })
        .unwrap();
        let base = SharpenConfig::default().with_num_threads(2);
        let blurred_alpha = sharpen(pool(2), base.clone(), &src).unwrap();
        let opaque_blur = sharpen(pool(2), base.with_alpha(false), &src).unwrap();

        assert_eq!(blurred_alpha, opaque_blur);
        for (out, orig) in opaque_blur.pixels().iter().zip(src.pixels()) {
            assert_eq!(alpha(*out), alpha(*orig));
        }
    }

    #[test]
    fn test_empty_source() {
        let filter = UnsharpFilter::new(pool(1), SharpenConfig::default()).unwrap();
        let src = PixelBuffer::new(0, 3).unwrap();
        let out = filter.filter(&src, None).unwrap();
        assert_eq!(out.dimensions(), (0, 3));
    }

    #[test]
    fn test_non_positive_radius_is_identity() {
        let src = step_edge();
        for radius in [0.0, -2.0] {
            let config = SharpenConfig::default()
                .with_radius(radius)
                .with_amount(1.0)
                .with_threshold(0);
            let out = sharpen(pool(2), config, &src).unwrap();
            assert_eq!(out, src);
        }
    }
}
