//! Item index over a dataset's display names
//!
//! [`SuffixTreeIndex`] is the keyed view the engine works with: blank keys are
//! ignored on write and match nothing on read. [`rebuild_index`] builds one
//! from a dataset's non-archived items.

use crate::suffix_tree::CompressedSuffixTree;
use listserv_core::Dataset;

/// Index of dataset items by item id
pub type ItemIndex = SuffixTreeIndex<String>;

/// Substring index keyed by text
#[derive(Debug, Clone)]
pub struct SuffixTreeIndex<T> {
    tree: CompressedSuffixTree<T>,
}

impl<T: Ord + Clone> Default for SuffixTreeIndex<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Ord + Clone> SuffixTreeIndex<T> {
    /// Create an empty index
    pub fn new() -> Self {
        SuffixTreeIndex {
            tree: CompressedSuffixTree::new(),
        }
    }

    /// Index `item` under `key`; blank keys are ignored
    pub fn add(&mut self, key: &str, item: &T) {
        if key.trim().is_empty() {
            return;
        }
        self.tree.insert(key, item);
    }

    /// Remove `item` from under `key`; returns false for blank keys
    pub fn remove(&mut self, key: &str, item: &T) -> bool {
        if key.trim().is_empty() {
            return false;
        }
        self.tree.remove(key, item);
        true
    }

    /// Items whose key contains `key` (case-insensitive); blank keys match nothing
    pub fn find(&self, key: &str) -> Vec<T> {
        if key.trim().is_empty() {
            return Vec::new();
        }
        self.tree.search(key)
    }

    /// Drop everything
    pub fn clear(&mut self) {
        self.tree.clear();
    }

    /// Number of distinct indexed items
    pub fn len(&self) -> usize {
        self.tree.item_count()
    }

    /// Whether nothing is indexed
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Underlying tree
    pub fn tree(&self) -> &CompressedSuffixTree<T> {
        &self.tree
    }
}

/// Build an index from the dataset's non-archived items, keyed by `name_field`
///
/// Items without text at `name_field` are left out.
pub fn rebuild_index(dataset: &Dataset) -> ItemIndex {
    let mut index = ItemIndex::new();
    for item in dataset.items.values() {
        if let Some(text) = item.index_text(&dataset.name_field) {
            index.add(&text, &item.id);
        }
    }
    index
}
