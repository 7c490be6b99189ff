//! Near-duplicate detection
//!
//! Groups strings differing in only a few positions, using a BK-tree so that
//! each value is only compared against the branches that can possibly hold a
//! match.
//!
//! Distances are positional ([`PaddedHamming`]), the same notion of
//! difference [`common_chars`] uses, so a group's common characters are
//! always what is left after removing the differing positions.

use crate::algorithms::PaddedHamming;
use crate::indexing::BkTree;
use std::collections::BTreeSet;

/// A value and the other values found within the distance of it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateGroup {
    pub value: String,
    /// Sorted, never contains `value` itself
    pub matches: Vec<String>,
}

impl DuplicateGroup {
    /// Characters `value` shares positionally with each match.
    pub fn common(&self) -> Vec<String> {
        self.matches
            .iter()
            .map(|other| common_chars(&self.value, other))
            .collect()
    }
}

/// Find groups of near-duplicate strings.
///
/// Values are deduplicated, then visited in lexicographic order. Each visited
/// value is grouped with every other value differing from it in at most
/// `max_distance` positions (each position past the end of the shorter string
/// counts as one), and those matches are not visited again. Values with no
/// match produce no group.
///
/// # Example
/// ```
/// use bkindex::dedup::find_near_duplicates;
///
/// let groups = find_near_duplicates(["abcde", "fghij", "fguij", "axcye"], 1);
/// assert_eq!(groups.len(), 1);
/// assert_eq!(groups[0].value, "fghij");
/// assert_eq!(groups[0].common(), vec!["fgij".to_string()]);
/// ```
pub fn find_near_duplicates<I, S>(values: I, max_distance: usize) -> Vec<DuplicateGroup>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let distinct: BTreeSet<String> = values
        .into_iter()
        .map(|value| value.as_ref().to_owned())
        .collect();
    let tree = BkTree::with_items(PaddedHamming, distinct.iter().map(String::as_str));

    let mut pending: BTreeSet<&str> = distinct.iter().map(String::as_str).collect();
    let mut groups = Vec::new();

    while let Some(value) = pending.pop_first() {
        let matches: BTreeSet<&str> = tree
            .search(&value, max_distance)
            .into_iter()
            .map(|result| *result.item)
            .filter(|&item| item != value)
            .collect();

        if matches.is_empty() {
            continue;
        }

        for item in &matches {
            pending.remove(item);
        }

        groups.push(DuplicateGroup {
            value: value.to_owned(),
            matches: matches.into_iter().map(str::to_owned).collect(),
        });
    }

    groups
}

/// The characters of `a` that equal the character of `b` at the same position.
#[must_use]
pub fn common_chars(a: &str, b: &str) -> String {
    a.chars()
        .zip(b.chars())
        .filter(|(ac, bc)| ac == bc)
        .map(|(ac, _)| ac)
        .collect()
}
