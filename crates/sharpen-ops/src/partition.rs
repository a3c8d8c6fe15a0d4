//! Row striping and fork-join execution on a caller-supplied pool.
//!
//! Work is split into `count` interleaved stripes: stripe `i` owns rows
//! `i, i + count, i + 2 * count, ...`. Each stripe becomes one task on the
//! caller's [`rayon::ThreadPool`], and [`fork_join`] blocks until every task
//! of the phase has finished. Tasks never share a mutable buffer: each one
//! returns its rows as [`StripeRows`], and the orchestrator merges them into
//! the destination with [`scatter_rows`] or [`scatter_transposed`] once the
//! barrier has been passed.
//!
//! # Example
//!
//! ```rust
//! use sharpen_ops::partition::{fork_join, Phase, Stripe};
//!
//! let pool = rayon::ThreadPoolBuilder::new().num_threads(2).build().unwrap();
//! let rows = fork_join(&pool, 3, Phase::Combine, |stripe: Stripe| {
//!     Ok(stripe.rows(7).collect::<Vec<_>>())
//! })
//! .unwrap();
//! assert_eq!(rows, vec![vec![0, 3, 6], vec![1, 4], vec![2, 5]]);
//! ```

use crate::{OpsError, OpsResult};
use rayon::ThreadPool;
use rayon::prelude::*;
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use tracing::{trace, warn};

/// Phase of a filter call, used in logs and [`OpsError::WorkerFailure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// First convolution pass over source rows.
    HorizontalBlur,
    /// Second convolution pass over the transposed intermediate.
    VerticalBlur,
    /// Threshold-gated unsharp blend.
    Combine,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::HorizontalBlur => "horizontal blur",
            Self::VerticalBlur => "vertical blur",
            Self::Combine => "combine",
        })
    }
}

/// One interleaved share of the rows of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stripe {
    index: usize,
    count: usize,
}

impl Stripe {
    /// Creates stripe `index` of `count`.
    ///
    /// # Errors
    ///
    /// [`OpsError::InvalidParameter`] when `count == 0` or `index >= count`.
    pub fn new(index: usize, count: usize) -> OpsResult<Self> {
        if count == 0 || index >= count {
            return Err(OpsError::InvalidParameter(format!(
                "stripe index {index} out of range for {count} stripe(s)"
            )));
        }
        Ok(Self { index, count })
    }

    /// The single stripe covering every row.
    pub const fn whole() -> Self {
        Self { index: 0, count: 1 }
    }

    /// All stripes `0..count`, in order.
    pub fn all(count: usize) -> impl Iterator<Item = Stripe> {
        (0..count).map(move |index| Self { index, count })
    }

    /// Stripe index.
    #[inline]
    pub fn index(self) -> usize {
        self.index
    }

    /// Total number of stripes.
    #[inline]
    pub fn count(self) -> usize {
        self.count
    }

    /// Rows below `height` owned by this stripe, ascending.
    #[inline]
    pub fn rows(self, height: usize) -> impl Iterator<Item = usize> {
        (self.index..height).step_by(self.count)
    }

    /// `true` if `row` belongs to this stripe.
    #[inline]
    pub fn owns(self, row: usize) -> bool {
        row % self.count == self.index
    }

    /// Number of rows below `height` owned by this stripe.
    #[inline]
    pub fn row_count(self, height: usize) -> usize {
        if height > self.index {
            (height - self.index - 1) / self.count + 1
        } else {
            0
        }
    }
}

/// Rows computed by one stripe, stored contiguously in ascending row order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StripeRows {
    stripe: Stripe,
    width: usize,
    data: Vec<u32>,
}

impl StripeRows {
    /// Zeroed storage for every row `stripe` owns in a `width x height` image.
    pub fn zeroed(stripe: Stripe, width: usize, height: usize) -> Self {
        Self {
            stripe,
            width,
            data: vec![0; stripe.row_count(height) * width],
        }
    }

    /// The stripe these rows belong to.
    #[inline]
    pub fn stripe(&self) -> Stripe {
        self.stripe
    }

    /// Mutable `(row index, row)` pairs in ascending order.
    pub fn rows_mut(&mut self) -> impl Iterator<Item = (usize, &mut [u32])> {
        let stripe = self.stripe;
        let width = self.width.max(1);
        stripe.rows(usize::MAX).zip(self.data.chunks_mut(width))
    }

    /// Row `y` of the image. `y` must be owned by this stripe.
    #[inline]
    pub fn row(&self, y: usize) -> &[u32] {
        debug_assert!(self.stripe.owns(y));
        let start = (y / self.stripe.count) * self.width;
        &self.data[start..start + self.width]
    }
}

/// Runs `work` once per stripe on `pool` and waits for all of them.
///
/// Results come back in stripe order. A task that returns an error or
/// panics does not stop its siblings, but once the barrier is reached every
/// failure is folded into a single [`OpsError::WorkerFailure`] carrying the
/// phase, the number of failed stripes and the lowest-indexed message.
pub fn fork_join<T, F>(
    pool: &ThreadPool,
    count: usize,
    phase: Phase,
    work: F,
) -> OpsResult<Vec<T>>
where
    T: Send,
    F: Fn(Stripe) -> OpsResult<T> + Sync,
{
    if count == 0 {
        return Err(OpsError::InvalidParameter(
            "stripe count must be at least 1".into(),
        ));
    }

    let mut slots: Vec<Option<Result<T, String>>> = Vec::with_capacity(count);
    slots.resize_with(count, || None);

    let work = &work;
    pool.scope(|scope| {
        for (index, slot) in slots.iter_mut().enumerate() {
            scope.spawn(move |_| {
                trace!(%phase, stripe = index, "stripe started");
                let stripe = Stripe { index, count };
                *slot = Some(match panic::catch_unwind(AssertUnwindSafe(|| work(stripe))) {
                    Ok(Ok(value)) => Ok(value),
                    Ok(Err(err)) => Err(err.to_string()),
                    Err(payload) => Err(format!("worker panicked: {}", panic_message(&*payload))),
                });
            });
        }
    });

    let mut results = Vec::with_capacity(count);
    let mut failed = 0;
    let mut first: Option<(usize, String)> = None;
    for (index, slot) in slots.into_iter().enumerate() {
        match slot {
            Some(Ok(value)) => results.push(value),
            Some(Err(message)) => {
                failed += 1;
                if first.is_none() {
                    first = Some((index, message));
                }
            }
            None => {
                failed += 1;
                if first.is_none() {
                    first = Some((index, "worker did not complete".into()));
                }
            }
        }
    }

    if let Some((stripe, message)) = first {
        warn!(%phase, failed, stripes = count, stripe, "phase aborted");
        return Err(OpsError::WorkerFailure {
            phase,
            failed,
            stripes: count,
            message: format!("stripe {stripe}: {message}"),
        });
    }
    Ok(results)
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        *s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic payload"
    }
}

/// Checks that `stripes` is a complete, ordered partition.
fn check_partition(stripes: &[StripeRows], width: usize) -> OpsResult<()> {
    let count = stripes.len();
    if count == 0 {
        return Err(OpsError::InvalidParameter("no stripes to merge".into()));
    }
    for (i, s) in stripes.iter().enumerate() {
        if s.stripe.index != i || s.stripe.count != count || s.width != width {
            return Err(OpsError::InvalidParameter(format!(
                "stripe {} of {} (width {}) does not fit slot {} of {} (width {})",
                s.stripe.index, s.stripe.count, s.width, i, count, width
            )));
        }
    }
    Ok(())
}

/// Copies stripe rows into a row-major `width x height` destination.
pub fn scatter_rows(
    pool: &ThreadPool,
    stripes: &[StripeRows],
    dst: &mut [u32],
    width: usize,
    height: usize,
) -> OpsResult<()> {
    crate::error::check_len(dst.len(), width, height)?;
    check_partition(stripes, width)?;
    if dst.is_empty() {
        return Ok(());
    }
    let count = stripes.len();
    pool.install(|| {
        dst.par_chunks_mut(width).enumerate().for_each(|(y, row)| {
            row.copy_from_slice(stripes[y % count].row(y));
        });
    });
    Ok(())
}

/// Writes stripe rows of a `width x height` image transposed into `dst`.
///
/// Pixel `(x, y)` lands at `dst[x * height + y]`, so `dst` is the
/// `height x width` image whose rows are the source columns.
pub fn scatter_transposed(
    pool: &ThreadPool,
    stripes: &[StripeRows],
    dst: &mut [u32],
    width: usize,
    height: usize,
) -> OpsResult<()> {
    crate::error::check_len(dst.len(), width, height)?;
    check_partition(stripes, width)?;
    if dst.is_empty() {
        return Ok(());
    }
    let count = stripes.len();
    pool.install(|| {
        dst.par_chunks_mut(height).enumerate().for_each(|(x, column)| {
            for (y, out) in column.iter_mut().enumerate() {
                *out = stripes[y % count].row(y)[x];
            }
        });
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(n: usize) -> ThreadPool {
        rayon::ThreadPoolBuilder::new().num_threads(n).build().unwrap()
    }

    #[test]
    fn test_stripe_rows_interleave() {
        let s = Stripe::new(1, 3).unwrap();
        assert_eq!(s.rows(8).collect::<Vec<_>>(), vec![1, 4, 7]);
        assert_eq!(s.row_count(8), 3);
        assert!(s.owns(4));
        assert!(!s.owns(5));
    }

    #[test]
    fn test_stripes_cover_every_row_once() {
        let height = 11;
        let mut seen = vec![0; height];
        for s in Stripe::all(4) {
            for y in s.rows(height) {
                seen[y] += 1;
            }
        }
        assert!(seen.iter().all(|&n| n == 1));
    }

    #[test]
    fn test_rows_outlive_stripe_binding() {
        let rows = {
            let s = Stripe::new(2, 3).unwrap();
            s.rows(9)
        };
        assert_eq!(rows.collect::<Vec<_>>(), vec![2, 5, 8]);

        let mut local = StripeRows::zeroed(Stripe::new(1, 2).unwrap(), 2, 5);
        let ys: Vec<usize> = local.rows_mut().map(|(y, _)| y).collect();
        assert_eq!(ys, vec![1, 3]);
    }

    #[test]
    fn test_more_stripes_than_rows() {
        let s = Stripe::new(5, 8).unwrap();
        assert_eq!(s.row_count(3), 0);
        assert_eq!(s.rows(3).count(), 0);
    }

    #[test]
    fn test_stripe_new_validates() {
        assert!(Stripe::new(0, 0).is_err());
        assert!(Stripe::new(3, 3).is_err());
        assert_eq!(Stripe::whole(), Stripe::new(0, 1).unwrap());
    }

    #[test]
    fn test_fork_join_orders_results() {
        let p = pool(2);
        let out = fork_join(&p, 5, Phase::HorizontalBlur, |s| Ok(s.index() * 10)).unwrap();
        assert_eq!(out, vec![0, 10, 20, 30, 40]);
    }

    #[test]
    fn test_fork_join_aggregates_failures() {
        let p = pool(2);
        let err = fork_join(&p, 4, Phase::VerticalBlur, |s| {
            match s.index() {
                1 => panic!("boom"),
                2 => Err(OpsError::InvalidParameter("bad stripe".into())),
                i => Ok(i),
            }
        })
        .unwrap_err();

        match err {
            OpsError::WorkerFailure {
                phase,
                failed,
                stripes,
                message,
            } => {
                assert_eq!(phase, Phase::VerticalBlur);
                assert_eq!(failed, 2);
                assert_eq!(stripes, 4);
                assert!(message.contains("stripe 1"));
                assert!(message.contains("boom"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_fork_join_rejects_zero_stripes() {
        let p = pool(1);
        assert!(fork_join(&p, 0, Phase::Combine, |_| Ok(())).is_err());
    }

    fn striped(width: usize, height: usize, count: usize) -> Vec<StripeRows> {
        Stripe::all(count)
            .map(|s| {
                let mut rows = StripeRows::zeroed(s, width, height);
                for (y, row) in rows.rows_mut() {
                    for (x, px) in row.iter_mut().enumerate() {
                        *px = (y * 100 + x) as u32;
                    }
                }
                rows
            })
            .collect()
    }

    #[test]
    fn test_scatter_rows() {
        let p = pool(2);
        let (w, h) = (3, 5);
        let mut dst = vec![0; w * h];
        scatter_rows(&p, &striped(w, h, 2), &mut dst, w, h).unwrap();
        let expected: Vec<u32> = (0..h)
            .flat_map(|y| (0..w).map(move |x| (y * 100 + x) as u32))
            .collect();
        assert_eq!(dst, expected);
    }

    #[test]
    fn test_scatter_transposed() {
        let p = pool(3);
        let (w, h) = (3, 2);
        let mut dst = vec![0; w * h];
        scatter_transposed(&p, &striped(w, h, 3), &mut dst, w, h).unwrap();
        // dst[x * h + y] = (y, x)
        assert_eq!(dst, vec![0, 100, 1, 101, 2, 102]);
    }

    #[test]
    fn test_scatter_rejects_partial_partition() {
        let p = pool(1);
        let mut stripes = striped(2, 2, 2);
        stripes.pop();
        let mut dst = vec![0; 4];
        assert!(scatter_rows(&p, &stripes, &mut dst, 2, 2).is_err());
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(Phase::HorizontalBlur.to_string(), "horizontal blur");
        assert_eq!(Phase::Combine.to_string(), "combine");
    }
}
