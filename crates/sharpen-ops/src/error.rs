//! Error types for sharpening operations.

use crate::partition::Phase;
use thiserror::Error;

/// Error type for sharpening operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OpsError {
    /// Kernel weights are empty, even-length or non-finite.
    #[error("invalid kernel: {0}")]
    InvalidKernel(String),

    /// Invalid parameter value.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Buffers have incompatible sizes.
    #[error("dimension mismatch: expected {}x{}, got {}x{}", expected.0, expected.1, got.0, got.1)]
    DimensionMismatch {
        /// Dimensions required by the operation
        expected: (u32, u32),
        /// Dimensions actually supplied
        got: (u32, u32),
    },

    /// Slice length disagrees with the dimensions passed alongside it.
    #[error("buffer length mismatch: expected {expected}, got {got}")]
    BufferLength {
        /// Length implied by the dimensions
        expected: usize,
        /// Actual length
        got: usize,
    },

    /// One or more worker tasks failed during a phase.
    ///
    /// The whole filter call is aborted; no output buffer is returned.
    #[error("{failed} of {stripes} worker(s) failed during {phase}: {message}")]
    WorkerFailure {
        /// Phase in which the failure happened
        phase: Phase,
        /// Number of failed stripes
        failed: usize,
        /// Stripes submitted for the phase
        stripes: usize,
        /// Message of the lowest-indexed failure
        message: String,
    },

    /// Error from pixel buffer handling.
    #[error(transparent)]
    Core(#[from] sharpen_core::Error),
}

impl OpsError {
    /// Returns `true` for [`OpsError::WorkerFailure`].
    #[inline]
    pub fn is_worker_failure(&self) -> bool {
        matches!(self, Self::WorkerFailure { .. })
    }
}

/// Result type for sharpening operations.
pub type OpsResult<T> = Result<T, OpsError>;

/// Checks that `len == width * height`.
pub(crate) fn check_len(len: usize, width: usize, height: usize) -> OpsResult<()> {
    let expected = width.checked_mul(height).ok_or_else(|| {
        OpsError::InvalidParameter(format!("{width}x{height} overflows usize"))
    })?;
    if len != expected {
        return Err(OpsError::BufferLength { expected, got: len });
    }
    Ok(())
}
