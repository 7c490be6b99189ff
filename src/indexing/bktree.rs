//! BK-tree (Burkhard-Keller tree) implementation
//!
//! A metric tree that indexes items under an integer distance and answers
//! range queries ("everything within `d` of `q`") by pruning subtrees with
//! the triangle inequality.
//!
//! The tree is append-only: items are inserted, never removed or rebalanced.
//! Duplicates are kept as separate nodes, chained under key `0`.

use crate::algorithms::Metric;
use ahash::AHashMap;
use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, VecDeque};
use std::convert::Infallible;
use std::fmt;
use std::hash::Hash;

/// Maximum search radius for nearest neighbor queries.
///
/// Limits the radius expansion in `find_nearest` when no close matches exist.
const MAX_NEAREST_SEARCH_DISTANCE: usize = 20;

/// Result from a BK-tree search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchResult<'a, T> {
    pub distance: usize,
    pub item: &'a T,
}

/// A child of the root: its distance key and every item in its subtree
pub type Branch<'a, T> = (usize, Vec<&'a T>);

/// A node in the BK-tree
#[derive(Debug, Clone)]
pub struct BkNode<T> {
    item: T,
    /// Children indexed by their distance to `item`. Every item below the
    /// child at key `k` is at distance exactly `k` from `item`.
    children: AHashMap<usize, BkNode<T>>,
}

impl<T> BkNode<T> {
    fn new(item: T) -> Self {
        Self {
            item,
            children: AHashMap::new(),
        }
    }

    /// The item stored at this node
    pub fn item(&self) -> &T {
        &self.item
    }

    /// The child at `distance`, if any
    pub fn child(&self, distance: usize) -> Option<&BkNode<T>> {
        self.children.get(&distance)
    }

    /// Direct children with their distance keys, in arbitrary order
    pub fn children(&self) -> impl Iterator<Item = (usize, &BkNode<T>)> {
        self.children.iter().map(|(&distance, child)| (distance, child))
    }

    /// True if this node has no children
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Collect this node's item and every item below it, in arbitrary order.
    pub fn extract(&self) -> Vec<&T> {
        let mut items = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            items.push(&node.item);
            stack.extend(node.children.values());
        }
        items
    }
}

/// BK-tree over items of type `T` under metric `M`
///
/// # Metrics
///
/// `M` is anything implementing [`Metric`], including plain closures
/// `Fn(&T, &T) -> usize`. Infallible metrics get `insert`/`search`; metrics
/// that can reject a pair of items go through `try_insert`/`try_search`,
/// which hand the metric's error back unchanged.
/// The metric must be deterministic and symmetric; range queries are only
/// complete if it also satisfies the triangle inequality.
///
/// # Example
/// ```
/// use bkindex::algorithms::Levenshtein;
/// use bkindex::indexing::BkTree;
///
/// let tree = BkTree::with_items(Levenshtein::new(), ["fun", "run", "sun"]);
/// let matches = tree.search(&"bun", 1);
/// assert_eq!(matches.len(), 3);
/// assert!(matches.iter().all(|m| m.distance == 1));
/// ```
#[derive(Clone)]
pub struct BkTree<T, M> {
    root: Option<BkNode<T>>,
    metric: M,
    size: usize,
}

fn into_ok<R>(result: Result<R, Infallible>) -> R {
    match result {
        Ok(value) => value,
        Err(never) => match never {},
    }
}

impl<T, M> BkTree<T, M> {
    /// Create an empty tree bound to `metric`
    pub fn new(metric: M) -> Self {
        Self {
            root: None,
            metric,
            size: 0,
        }
    }

    /// Create a tree and insert `items` in order
    pub fn with_items<I>(metric: M, items: I) -> Self
    where
        M: Metric<T, Error = Infallible>,
        I: IntoIterator<Item = T>,
    {
        let mut tree = Self::new(metric);
        tree.extend(items);
        tree
    }

    /// Create a tree with a fallible metric, stopping at the first item the
    /// metric rejects.
    pub fn try_with_items<I>(metric: M, items: I) -> Result<Self, M::Error>
    where
        M: Metric<T>,
        I: IntoIterator<Item = T>,
    {
        let mut tree = Self::new(metric);
        for item in items {
            tree.try_insert(item)?;
        }
        Ok(tree)
    }

    pub fn metric(&self) -> &M {
        &self.metric
    }

    /// The root node, `None` for an empty tree
    pub fn root(&self) -> Option<&BkNode<T>> {
        self.root.as_ref()
    }

    /// Number of stored items, duplicates included
    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn clear(&mut self) {
        self.root = None;
        self.size = 0;
    }

    /// Add an item to the tree.
    pub fn insert(&mut self, item: T)
    where
        M: Metric<T, Error = Infallible>,
    {
        into_ok(self.try_insert(item));
    }

    /// Add an item using a fallible metric.
    ///
    /// If the metric fails during descent the error is returned and the tree
    /// is left unchanged.
    pub fn try_insert(&mut self, item: T) -> Result<(), M::Error>
    where
        M: Metric<T>,
    {
        let Some(mut node) = self.root.as_mut() else {
            self.root = Some(BkNode::new(item));
            self.size = 1;
            return Ok(());
        };

        loop {
            let dist = self.metric.distance(&item, &node.item)?;

            match node.children.entry(dist) {
                Entry::Occupied(entry) => {
                    node = entry.into_mut();
                }
                Entry::Vacant(entry) => {
                    entry.insert(BkNode::new(item));
                    self.size += 1;
                    return Ok(());
                }
            }
        }
    }

    /// Find every item within `max_distance` of `query`, sorted by distance.
    pub fn search(&self, query: &T, max_distance: usize) -> Vec<SearchResult<'_, T>>
    where
        M: Metric<T, Error = Infallible>,
    {
        into_ok(self.try_search(query, max_distance))
    }

    /// Range query using a fallible metric.
    pub fn try_search(
        &self,
        query: &T,
        max_distance: usize,
    ) -> Result<Vec<SearchResult<'_, T>>, M::Error>
    where
        M: Metric<T>,
    {
        let mut results = Vec::new();
        let Some(root) = &self.root else {
            return Ok(results);
        };

        let mut candidates = VecDeque::from([root]);
        while let Some(node) = candidates.pop_front() {
            let dist = self.metric.distance(&node.item, query)?;
            if dist <= max_distance {
                results.push(SearchResult {
                    distance: dist,
                    item: &node.item,
                });
            }

            // Triangle inequality: a child at key k holds only items at
            // distance k from this node, so |dist - k| bounds their distance
            // to the query.
            let lower = dist.saturating_sub(max_distance);
            let upper = dist.saturating_add(max_distance);
            candidates.extend(
                node.children
                    .iter()
                    .filter(|(&k, _)| (lower..=upper).contains(&k))
                    .map(|(_, child)| child),
            );
        }

        results.sort_by_key(|r| r.distance);
        Ok(results)
    }

    /// Find the `k` nearest items to `query`.
    ///
    /// The search radius starts at 1 and doubles up to
    /// `MAX_NEAREST_SEARCH_DISTANCE`, so items further away than that are
    /// never returned.
    pub fn find_nearest(&self, query: &T, k: usize) -> Vec<SearchResult<'_, T>>
    where
        M: Metric<T, Error = Infallible>,
    {
        if self.root.is_none() || k == 0 {
            return Vec::new();
        }

        let mut max_dist = 1;
        let mut results;

        loop {
            results = self.search(query, max_dist);

            if results.len() >= k || max_dist >= MAX_NEAREST_SEARCH_DISTANCE {
                break;
            }

            max_dist = max_dist.saturating_mul(2).min(MAX_NEAREST_SEARCH_DISTANCE);
        }

        results.truncate(k);
        results
    }

    /// Check if the tree holds an item at distance 0 from `query`
    pub fn contains(&self, query: &T) -> bool
    where
        M: Metric<T, Error = Infallible>,
    {
        let mut node = self.root.as_ref();
        while let Some(current) = node {
            let dist = into_ok(self.metric.distance(query, &current.item));
            if dist == 0 {
                return true;
            }
            node = current.children.get(&dist);
        }
        false
    }

    /// Iterate over every stored item, breadth first.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            queue: self.root.iter().collect(),
        }
    }

    /// Map every distinct item to its distance from the root.
    ///
    /// Duplicates collapse into a single entry. All copies of a value live
    /// under the same root branch, so the distance is the same for each.
    pub fn flatten(&self) -> AHashMap<&T, usize>
    where
        T: Hash + Eq,
    {
        let mut flat = AHashMap::with_capacity(self.size);
        if let Some(root) = &self.root {
            flat.insert(&root.item, 0);
            for (&dist, child) in &root.children {
                for item in child.extract() {
                    flat.entry(item).or_insert(dist);
                }
            }
        }
        flat
    }

    /// Sorted distance keys of the root's direct children
    pub fn distances(&self) -> Vec<usize> {
        let mut keys: Vec<usize> = self.root_keys().collect();
        keys.sort_unstable();
        keys
    }

    /// The root branch with the largest distance key, `(0, [])` if none.
    pub fn max(&self) -> Branch<'_, T> {
        self.branch_entry(self.root_keys().max())
    }

    /// The root branch with the smallest distance key, `(0, [])` if none.
    pub fn min(&self) -> Branch<'_, T> {
        self.branch_entry(self.root_keys().min())
    }

    /// Items at exactly `distance` from the root.
    ///
    /// For `distance == 0` this is the root item itself plus any duplicates
    /// of it. Returns `None` on an empty tree or when no such branch exists.
    pub fn branch(&self, distance: usize) -> Option<Vec<&T>> {
        let root = self.root.as_ref()?;
        if distance == 0 {
            let mut items = vec![&root.item];
            if let Some(dups) = root.children.get(&0) {
                items.extend(dups.extract());
            }
            return Some(items);
        }
        root.children.get(&distance).map(BkNode::extract)
    }

    /// Every root branch with a key in `1..=max_distance`
    pub fn branches_within(&self, max_distance: usize) -> BTreeMap<usize, Vec<&T>> {
        let Some(root) = &self.root else {
            return BTreeMap::new();
        };
        root.children
            .iter()
            .filter(|(&k, _)| (1..=max_distance).contains(&k))
            .map(|(&k, child)| (k, child.extract()))
            .collect()
    }

    /// Locate `item` relative to the root and return the matching branches.
    ///
    /// With `inclusive`, every branch between 1 and the item's distance from
    /// the root; otherwise only the branch holding the item. `None` if the
    /// item is not stored.
    pub fn find_branches(&self, item: &T, inclusive: bool) -> Option<BTreeMap<usize, Vec<&T>>>
    where
        T: Hash + Eq,
    {
        let dist = *self.flatten().get(item)?;
        if inclusive {
            Some(self.branches_within(dist))
        } else {
            self.branch(dist).map(|items| BTreeMap::from([(dist, items)]))
        }
    }

    fn root_keys(&self) -> impl Iterator<Item = usize> + '_ {
        self.root
            .iter()
            .flat_map(|root| root.children.keys().copied())
    }

    fn branch_entry(&self, key: Option<usize>) -> Branch<'_, T> {
        key.and_then(|k| {
            let child = self.root.as_ref()?.children.get(&k)?;
            Some((k, child.extract()))
        })
        .unwrap_or((0, Vec::new()))
    }
}

impl<T, M: Default> Default for BkTree<T, M> {
    fn default() -> Self {
        Self::new(M::default())
    }
}

impl<T, M: Metric<T, Error = Infallible>> Extend<T> for BkTree<T, M> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for item in iter {
            self.insert(item);
        }
    }
}

impl<T, M: Metric<T>> fmt::Debug for BkTree<T, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BkTree")
            .field("metric", &self.metric.name())
            .field("len", &self.size)
            .field("top_level", &self.root_keys().count())
            .finish()
    }
}

/// Breadth-first iterator over the items of a [`BkTree`]
pub struct Iter<'a, T> {
    queue: VecDeque<&'a BkNode<T>>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.queue.pop_front()?;
        self.queue.extend(node.children.values());
        Some(&node.item)
    }
}

impl<'a, T, M> IntoIterator for &'a BkTree<T, M> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::{Hamming, Levenshtein, MetricError};
    use std::collections::HashSet;

    fn books() -> BkTree<&'static str, Levenshtein> {
        BkTree::with_items(Levenshtein::new(), ["book", "books", "boo", "cook", "cake"])
    }

    fn texts(results: &[SearchResult<'_, &'static str>]) -> HashSet<&'static str> {
        results.iter().map(|r| *r.item).collect()
    }

    #[test]
    fn test_bktree_basic() {
        let tree = books();
        assert_eq!(tree.len(), 5);
        assert!(tree.contains(&"cook"));
        assert!(!tree.contains(&"coo"));
        assert_eq!(tree.root().map(BkNode::item), Some(&"book"));
    }

    #[test]
    fn test_bktree_search() {
        let tree = books();
        let results = tree.search(&"book", 1);
        assert_eq!(results[0], SearchResult { distance: 0, item: &"book" });
        assert_eq!(texts(&results), HashSet::from(["book", "books", "boo", "cook"]));
        assert!(results.windows(2).all(|w| w[0].distance <= w[1].distance));
    }

    #[test]
    fn test_search_bun() {
        let tree = BkTree::with_items(Levenshtein::new(), ["fun", "run", "sun"]);
        let results = tree.search(&"bun", 1);
        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|r| r.distance == 1));
        assert_eq!(texts(&results), HashSet::from(["fun", "run", "sun"]));
        assert!(tree.search(&"bun", 0).is_empty());
    }

    #[test]
    fn test_empty_tree() {
        let tree: BkTree<&str, Levenshtein> = BkTree::default();
        assert!(tree.is_empty());
        assert!(tree.search(&"anything", 5).is_empty());
        assert!(tree.find_nearest(&"anything", 3).is_empty());
        assert!(tree.flatten().is_empty());
        assert_eq!(tree.max(), (0, vec![]));
        assert_eq!(tree.min(), (0, vec![]));
        assert!(tree.distances().is_empty());
        assert_eq!(tree.branch(0), None);
        assert!(tree.branches_within(10).is_empty());
        assert_eq!(tree.iter().count(), 0);
    }

    #[test]
    fn test_duplicates_are_kept() {
        let tree = BkTree::with_items(Levenshtein::new(), ["a", "a", "a"]);
        assert_eq!(tree.len(), 3);
        assert_eq!(tree.search(&"a", 0).len(), 3);
        assert_eq!(tree.distances(), vec![0]);
        assert_eq!(tree.branch(0), Some(vec![&"a", &"a", &"a"]));
        assert_eq!(tree.flatten().len(), 1);
        assert_eq!(tree.iter().count(), 3);
    }

    #[test]
    fn test_children_keys_are_exact_distances() {
        let tree = books();
        let mut stack = vec![tree.root().unwrap()];
        while let Some(node) = stack.pop() {
            for (key, child) in node.children() {
                for item in child.extract() {
                    assert_eq!(levenshtein_of(node.item(), item), key);
                }
                stack.push(child);
            }
        }
    }

    fn levenshtein_of(a: &str, b: &str) -> usize {
        crate::algorithms::levenshtein(a, b)
    }

    #[test]
    fn test_min_max() {
        let tree = books();
        assert_eq!(tree.distances(), vec![1, 4]);
        assert_eq!(tree.max(), (4, vec![&"cake"]));

        let (key, items) = tree.min();
        assert_eq!(key, 1);
        let items: HashSet<_> = items.into_iter().copied().collect();
        assert_eq!(items, HashSet::from(["books", "boo", "cook"]));
    }

    #[test]
    fn test_extract_covers_subtree() {
        let tree = books();
        let root = tree.root().unwrap();
        assert_eq!(root.extract().len(), 5);
        let cake = root.child(4).unwrap();
        assert!(cake.is_leaf());
        assert_eq!(cake.extract(), vec![&"cake"]);
    }

    #[test]
    fn test_flatten() {
        let tree = books();
        let flat = tree.flatten();
        assert_eq!(flat.len(), 5);
        assert_eq!(flat.get(&"book"), Some(&0));
        assert_eq!(flat.get(&"boo"), Some(&1));
        assert_eq!(flat.get(&"cook"), Some(&1));
        assert_eq!(flat.get(&"cake"), Some(&4));
        assert_eq!(*flat, *tree.flatten());
    }

    #[test]
    fn test_branches() {
        let tree = books();
        assert_eq!(tree.branch(4), Some(vec![&"cake"]));
        assert_eq!(tree.branch(2), None);
        assert_eq!(tree.branch(0), Some(vec![&"book"]));

        let within = tree.branches_within(3);
        assert_eq!(within.keys().copied().collect::<Vec<_>>(), vec![1]);
        assert_eq!(within[&1].len(), 3);
        assert_eq!(tree.branches_within(4).len(), 2);
    }

    #[test]
    fn test_find_branches() {
        let tree = books();
        let inclusive = tree.find_branches(&"cake", true).unwrap();
        assert_eq!(inclusive.keys().copied().collect::<Vec<_>>(), vec![1, 4]);

        let exclusive = tree.find_branches(&"cake", false).unwrap();
        assert_eq!(exclusive, BTreeMap::from([(4, vec![&"cake"])]));

        assert_eq!(tree.find_branches(&"zzz", true), None);
    }

    #[test]
    fn test_find_nearest() {
        let tree = books();
        let results = tree.find_nearest(&"boot", 2);
        assert_eq!(results.len(), 2);
        assert_eq!(texts(&results), HashSet::from(["book", "boo"]));
        assert!(tree.find_nearest(&"boot", 0).is_empty());
    }

    #[test]
    fn test_closure_metric() {
        let mut tree = BkTree::new(|a: &i32, b: &i32| a.abs_diff(*b) as usize);
        tree.extend([10, 3, 7, 15, 11, 2]);
        let found: HashSet<i32> = tree.search(&9, 2).iter().map(|r| *r.item).collect();
        assert_eq!(found, HashSet::from([10, 7, 11]));
    }

    #[test]
    fn test_fallible_metric_propagates_error() {
        let mut tree = BkTree::try_with_items(Hamming, ["abc", "abd"]).unwrap();
        assert_eq!(
            tree.try_insert("ab"),
            Err(MetricError::LengthMismatch { left: 2, right: 3 })
        );
        assert_eq!(tree.len(), 2);

        let results = tree.try_search(&"abx", 1).unwrap();
        assert_eq!(results.len(), 2);
        assert!(tree.try_search(&"toolong", 1).is_err());
        assert!(BkTree::try_with_items(Hamming, ["abc", "a"]).is_err());
    }

    #[test]
    fn test_clear() {
        let mut tree = books();
        tree.clear();
        assert!(tree.is_empty());
        assert!(tree.root().is_none());
        tree.insert("new");
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_debug() {
        assert_eq!(
            format!("{:?}", books()),
            r#"BkTree { metric: "levenshtein", len: 5, top_level: 2 }"#
        );
    }

    #[test]
    fn test_into_iter() {
        let tree = books();
        let mut seen: Vec<&str> = (&tree).into_iter().copied().collect();
        seen.sort_unstable();
        assert_eq!(seen, vec!["boo", "book", "books", "cake", "cook"]);
    }
}
