//! Indexing structures for fuzzy search
//!
//! - BK-tree: range queries pruned by the triangle inequality

pub mod bktree;

pub use bktree::*;
