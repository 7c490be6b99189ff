//! Hamming distance
//!
//! Counts positions where characters differ.
//!
//! # Length Mismatch Behavior
//!
//! Strict Hamming distance is undefined for strings of different lengths:
//!
//! - **[`Hamming`]** fails on unequal lengths with
//!   [`MetricError::LengthMismatch`].
//! - **[`PaddedHamming`]** never fails: positions past the end of
//!   the shorter string all count as mismatches, so the result is the number
//!   of differing positions in the common prefix plus the length difference.

use super::{Metric, MetricError};
use smallvec::SmallVec;
use std::convert::Infallible;

/// Strict Hamming distance calculator
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Hamming;

impl Hamming {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl<T: AsRef<str> + ?Sized> Metric<T> for Hamming {
    type Error = MetricError;

    fn distance(&self, a: &T, b: &T) -> Result<usize, MetricError> {
        hamming_distance(a.as_ref(), b.as_ref())
    }

    fn name(&self) -> &'static str {
        "hamming"
    }
}

/// Hamming distance that treats every position past the shorter string as a
/// mismatch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PaddedHamming;

impl PaddedHamming {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl<T: AsRef<str> + ?Sized> Metric<T> for PaddedHamming {
    type Error = Infallible;

    fn distance(&self, a: &T, b: &T) -> Result<usize, Infallible> {
        Ok(hamming_distance_padded(a.as_ref(), b.as_ref()))
    }

    fn name(&self) -> &'static str {
        "padded_hamming"
    }
}

/// Hamming distance between two strings of equal length.
pub fn hamming_distance(a: &str, b: &str) -> Result<usize, MetricError> {
    let a: SmallVec<[char; 64]> = a.chars().collect();
    let b: SmallVec<[char; 64]> = b.chars().collect();

    if a.len() != b.len() {
        return Err(MetricError::LengthMismatch {
            left: a.len(),
            right: b.len(),
        });
    }

    Ok(a.iter().zip(b.iter()).filter(|(ac, bc)| ac != bc).count())
}

/// Mismatches over the common prefix plus the length difference.
#[must_use]
pub fn hamming_distance_padded(a: &str, b: &str) -> usize {
    let mut a = a.chars();
    let mut b = b.chars();
    let mut distance = 0;

    loop {
        match (a.next(), b.next()) {
            (None, None) => return distance,
            (Some(ac), Some(bc)) => distance += usize::from(ac != bc),
            _ => distance += 1,
        }
    }
}
