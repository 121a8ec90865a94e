//! Substring search for dataset items
//!
//! This crate provides:
//! - CompressedSuffixTree: case-insensitive substring index over arbitrary item handles
//! - SuffixTreeIndex: keyed view that ignores blank keys
//! - rebuild_index: index a dataset's non-archived items by their name field
//!
//! Indexes are not internally synchronized; the engine only touches them while
//! holding its concurrency guard.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod index;
pub mod suffix_tree;

pub use index::{rebuild_index, ItemIndex, SuffixTreeIndex};
pub use suffix_tree::CompressedSuffixTree;
