//! Distance metrics
//!
//! Each metric is implemented as a standalone function for composability,
//! plus a trait-based interface so the BK-tree can be generic over it.

pub mod hamming;
pub mod levenshtein;
pub mod manhattan;

pub use hamming::*;
pub use levenshtein::*;
pub use manhattan::*;

use std::convert::Infallible;

/// Errors raised by metrics that are not defined for every pair of inputs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MetricError {
    #[error("length mismatch: {left} vs {right} characters")]
    LengthMismatch { left: usize, right: usize },
}

/// An integer distance between two items.
///
/// Implementations must be deterministic and symmetric. Range queries on a
/// [`BkTree`](crate::indexing::BkTree) are only complete when the metric also
/// satisfies the triangle inequality.
///
/// Metrics that are defined for every pair of inputs use
/// `Error = Infallible`; the others report inputs they cannot compare.
pub trait Metric<T: ?Sized> {
    type Error;

    fn distance(&self, a: &T, b: &T) -> Result<usize, Self::Error>;

    /// Name of the metric for debugging
    fn name(&self) -> &'static str {
        "custom"
    }
}

/// Plain functions and closures returning `usize` are infallible metrics.
impl<T, F> Metric<T> for F
where
    T: ?Sized,
    F: Fn(&T, &T) -> usize,
{
    type Error = Infallible;

    fn distance(&self, a: &T, b: &T) -> Result<usize, Infallible> {
        Ok(self(a, b))
    }
}

/// Adapts a closure returning `Result<usize, E>` into a fallible [`Metric`].
#[derive(Debug, Clone, Copy)]
pub struct TryFn<F>(pub F);

impl<T, F, E> Metric<T> for TryFn<F>
where
    T: ?Sized,
    F: Fn(&T, &T) -> Result<usize, E>,
{
    type Error = E;

    fn distance(&self, a: &T, b: &T) -> Result<usize, E> {
        (self.0)(a, b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closure_is_metric() {
        let abs = |a: &i32, b: &i32| a.abs_diff(*b) as usize;
        assert_eq!(abs.distance(&3, &-2), Ok(5));
        assert_eq!(Metric::<i32>::name(&abs), "custom");
    }

    #[test]
    fn test_try_fn_propagates_error() {
        let metric = TryFn(|a: &str, b: &str| hamming_distance(a, b));
        assert_eq!(metric.distance("abc", "abd"), Ok(1));
        assert_eq!(
            metric.distance("abc", "ab"),
            Err(MetricError::LengthMismatch { left: 3, right: 2 })
        );
    }
}
