//! Levenshtein (edit) distance
//!
//! - Myers bit-parallel algorithm when the shorter string fits in one 64-bit word
//! - Single-row DP fallback for longer strings
//! - Optional early termination once a distance cap is exceeded
//! - Unicode-aware: distances count `char`s, not bytes

use super::Metric;
use ahash::AHashMap;
use smallvec::SmallVec;
use std::convert::Infallible;

/// Longest pattern the single-word Myers algorithm can handle
const MYERS_BLOCK_SIZE: usize = 64;

type Chars = SmallVec<[char; 64]>;

/// Per-character match masks for the pattern: bit `i` of `peq[c]` is set when
/// `pattern[i] == c`.
fn pattern_masks(pattern: &[char]) -> AHashMap<char, u64> {
    let mut peq = AHashMap::with_capacity(pattern.len().min(26));
    for (i, &c) in pattern.iter().enumerate() {
        *peq.entry(c).or_insert(0) |= 1u64 << i;
    }
    peq
}

/// Myers bit-parallel distance. `pattern` must not be longer than 64 chars.
///
/// Myers, G. (1999). "A fast bit-vector algorithm for approximate string matching"
///
/// With `cap` set, returns `None` as soon as the distance can no longer end
/// up within it.
fn myers(pattern: &[char], text: &[char], cap: Option<usize>) -> Option<usize> {
    let m = pattern.len();
    let n = text.len();
    debug_assert!(m > 0 && m <= MYERS_BLOCK_SIZE);

    let peq = pattern_masks(pattern);
    let mut vp: u64 = !0u64;
    let mut vn: u64 = 0u64;
    let mut score = m;
    let last = 1u64 << (m - 1);

    for (j, &tc) in text.iter().enumerate() {
        let eq = peq.get(&tc).copied().unwrap_or(0);

        let xv = eq | vn;
        let xh = (((eq & vp).wrapping_add(vp)) ^ vp) | eq;

        let hp = vn | !(xh | vp);
        let hn = vp & xh;

        if hp & last != 0 {
            score += 1;
        } else if hn & last != 0 {
            score -= 1;
        }

        // Each remaining text char can lower the score by at most one.
        if let Some(cap) = cap {
            if score > cap.saturating_add(n - j - 1) {
                return None;
            }
        }

        // The first DP row is 0, 1, 2, ... so the shifted-in bit of hp is 1.
        let hp = (hp << 1) | 1;
        let hn = hn << 1;

        vp = hn | !(xv | hp);
        vn = hp & xv;
    }

    match cap {
        Some(cap) if score > cap => None,
        _ => Some(score),
    }
}

/// Single-row DP distance, `O(min(m, n))` space.
fn dp(a: &[char], b: &[char], cap: Option<usize>) -> Option<usize> {
    let (target, source) = if a.len() < b.len() { (a, b) } else { (b, a) };
    let width = target.len();

    let mut row: SmallVec<[usize; 64]> = (0..=width).collect();

    for (i, &sc) in source.iter().enumerate() {
        let mut prev = row[0];
        row[0] = i + 1;
        let mut row_min = row[0];

        for j in 0..width {
            let substitution = prev + usize::from(sc != target[j]);
            let deletion = row[j + 1] + 1;
            let insertion = row[j] + 1;

            prev = row[j + 1];
            let cell = substitution.min(deletion).min(insertion);
            row[j + 1] = cell;
            row_min = row_min.min(cell);
        }

        if matches!(cap, Some(cap) if row_min > cap) {
            return None;
        }
    }

    match cap {
        Some(cap) if row[width] > cap => None,
        _ => Some(row[width]),
    }
}

/// Levenshtein distance with an optional cap.
///
/// Returns `None` when the distance exceeds `max_distance`, `Some(distance)`
/// otherwise (always `Some` without a cap).
///
/// # Example
/// ```
/// use bkindex::algorithms::levenshtein_bounded;
///
/// assert_eq!(levenshtein_bounded("kitten", "sitting", None), Some(3));
/// assert_eq!(levenshtein_bounded("abc", "abd", Some(2)), Some(1));
/// assert_eq!(levenshtein_bounded("abcdef", "ghijkl", Some(3)), None);
/// ```
#[must_use]
pub fn levenshtein_bounded(a: &str, b: &str, max_distance: Option<usize>) -> Option<usize> {
    if a == b {
        return Some(0);
    }

    let a: Chars = a.chars().collect();
    let b: Chars = b.chars().collect();
    let (pattern, text) = if a.len() <= b.len() {
        (&a[..], &b[..])
    } else {
        (&b[..], &a[..])
    };

    if let Some(cap) = max_distance {
        if text.len() - pattern.len() > cap {
            return None;
        }
    }

    if pattern.is_empty() {
        return Some(text.len());
    }
    if pattern.len() > MYERS_BLOCK_SIZE {
        return dp(pattern, text, max_distance);
    }
    myers(pattern, text, max_distance)
}

/// Levenshtein distance between two strings
#[inline]
#[must_use]
pub fn levenshtein(a: &str, b: &str) -> usize {
    // Without a cap the result is always `Some`.
    levenshtein_bounded(a, b, None).unwrap_or_default()
}

/// Levenshtein metric with optional early termination.
///
/// With a cap, every distance above it is reported as `cap + 1`. That keeps
/// the metric usable as a BK-tree key for queries whose radius stays below
/// the cap, but it is no longer a true metric past that point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Levenshtein {
    pub max_distance: Option<usize>,
}

impl Levenshtein {
    #[must_use]
    pub fn new() -> Self {
        Self { max_distance: None }
    }

    #[must_use]
    pub fn with_max_distance(max_distance: usize) -> Self {
        Self {
            max_distance: Some(max_distance),
        }
    }

    /// Distance, or `None` if it exceeds `max_distance`.
    #[must_use]
    pub fn compute(&self, a: &str, b: &str) -> Option<usize> {
        levenshtein_bounded(a, b, self.max_distance)
    }
}

impl<T: AsRef<str> + ?Sized> Metric<T> for Levenshtein {
    type Error = Infallible;

    fn distance(&self, a: &T, b: &T) -> Result<usize, Infallible> {
        let (a, b) = (a.as_ref(), b.as_ref());
        Ok(match self.max_distance {
            Some(cap) => levenshtein_bounded(a, b, Some(cap)).unwrap_or(cap.saturating_add(1)),
            None => levenshtein(a, b),
        })
    }

    fn name(&self) -> &'static str {
        "levenshtein"
    }
}
