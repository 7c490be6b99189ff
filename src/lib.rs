//! bkindex - BK-tree range search under arbitrary integer metrics
//!
//! # Features
//! - Generic BK-tree over any item type and any integer distance
//! - Closures, built-in string metrics, and fallible metrics
//! - Levenshtein (Myers bit-parallel), Hamming, and Manhattan distances
//! - Near-duplicate grouping for collections of strings

pub mod algorithms;
pub mod dedup;
pub mod indexing;

pub use algorithms::{Metric, MetricError, TryFn};
pub use indexing::bktree::{BkNode, BkTree, Branch, SearchResult};
