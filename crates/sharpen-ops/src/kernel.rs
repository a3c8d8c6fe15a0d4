//! One-dimensional convolution kernels.
//!
//! A [`Kernel`] is an odd-length row of `f32` weights applied symmetrically
//! around its center tap. The same kernel is used for both blur passes.
//!
//! # Example
//!
//! ```rust
//! use sharpen_ops::kernel::Kernel;
//!
//! let k = Kernel::gaussian(2.0);
//! assert_eq!(k.len(), 5);
//! assert_eq!(k.center(), 2);
//!
//! assert!(Kernel::new(vec![0.5, 0.5]).is_err());
//! ```

use crate::{OpsError, OpsResult};

/// Symmetric 1-D convolution kernel with a center tap.
#[derive(Debug, Clone, PartialEq)]
pub struct Kernel {
    weights: Vec<f32>,
}

impl Kernel {
    /// Creates a kernel from explicit weights.
    ///
    /// # Errors
    ///
    /// [`OpsError::InvalidKernel`] when `weights` is empty, has even length
    /// or contains NaN/infinite values.
    pub fn new(weights: Vec<f32>) -> OpsResult<Self> {
        if weights.is_empty() {
            return Err(OpsError::InvalidKernel("kernel has no weights".into()));
        }
        if weights.len() % 2 == 0 {
            return Err(OpsError::InvalidKernel(format!(
                "kernel length {} is even, no center tap",
                weights.len()
            )));
        }
        if let Some(i) = weights.iter().position(|w| !w.is_finite()) {
            return Err(OpsError::InvalidKernel(format!(
                "weight {} at tap {} is not finite",
                weights[i], i
            )));
        }
        Ok(Self { weights })
    }

    /// Single-tap kernel `[1.0]`; convolution with it copies the input.
    pub fn identity() -> Self {
        Self { weights: vec![1.0] }
    }

    /// Gaussian blur kernel for `radius` pixels.
    ///
    /// `ceil(radius)` taps on each side, `sigma = radius / 3`, taps farther
    /// than `radius` are zero, weights normalised to sum to one. A radius of
    /// zero or less gives [`Kernel::identity`]. The kernel allocates
    /// `2 * ceil(radius) + 1` taps; [`SharpenConfig::validate`] caps the
    /// radius at [`MAX_RADIUS`].
    ///
    /// [`SharpenConfig::validate`]: crate::SharpenConfig::validate
    /// [`MAX_RADIUS`]: crate::config::MAX_RADIUS
    ///
    /// ```rust
    /// use sharpen_ops::kernel::Kernel;
    ///
    /// let k = Kernel::gaussian(1.5);
    /// assert_eq!(k.len(), 5);
    /// let sum: f32 = k.weights().iter().sum();
    /// assert!((sum - 1.0).abs() < 1e-5);
    /// ```
    pub fn gaussian(radius: f32) -> Self {
        if radius <= 0.0 || !radius.is_finite() {
            return Self::identity();
        }
        let r = radius.ceil() as i32;
        let sigma = radius / 3.0;
        let sigma22 = 2.0 * sigma * sigma;
        let sqrt_sigma_pi2 = (2.0 * std::f32::consts::PI * sigma).sqrt();
        let radius2 = radius * radius;

        let mut weights: Vec<f32> = (-r..=r)
            .map(|row| {
                let d = row as f32;
                let distance = d * d;
                if distance > radius2 {
                    0.0
                } else {
                    (-distance / sigma22).exp() / sqrt_sigma_pi2
                }
            })
            .collect();

        let total: f32 = weights.iter().sum();
        for w in &mut weights {
            *w /= total;
        }
        Self { weights }
    }

    /// Kernel weights, outermost left tap first.
    #[inline]
    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    /// Number of taps (always odd).
    #[inline]
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    /// `true` if the kernel has no taps. Constructed kernels always have at
    /// least one.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Index of the center tap.
    #[inline]
    pub fn center(&self) -> usize {
        self.weights.len() / 2
    }

    /// Taps on each side of the center.
    #[inline]
    pub fn half_width(&self) -> i32 {
        self.center() as i32
    }

    /// Weight at `offset` from the center, `-half_width..=half_width`.
    #[inline]
    pub fn tap(&self, offset: i32) -> f32 {
        self.weights[(self.center() as i32 + offset) as usize]
    }
}

impl Default for Kernel {
    fn default() -> Self {
        Self::identity()
    }
}
