//! Manhattan (L1) distance on the integer grid

use super::Metric;
use std::convert::Infallible;

/// Grid point as `[x, y]`
pub type Point = [i64; 2];

/// Sum of absolute coordinate differences
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Manhattan;

impl Metric<Point> for Manhattan {
    type Error = Infallible;

    fn distance(&self, a: &Point, b: &Point) -> Result<usize, Infallible> {
        Ok(manhattan_distance(*a, *b))
    }

    fn name(&self) -> &'static str {
        "manhattan"
    }
}

/// L1 distance between two grid points.
///
/// Saturates at `usize::MAX` for coordinates far enough apart to overflow.
#[must_use]
pub fn manhattan_distance(a: Point, b: Point) -> usize {
    let dx = a[0].abs_diff(b[0]);
    let dy = a[1].abs_diff(b[1]);
    usize::try_from(dx.saturating_add(dy)).unwrap_or(usize::MAX)
}
