//! Compressed suffix tree for case-insensitive substring search
//!
//! Every suffix of every indexed text is inserted along a path from the root.
//! Edges carry string labels (runs of single-child nodes are compressed into one
//! edge) and children are keyed by the first character of their label.
//!
//! ## Item sets
//!
//! Each node holds the set of items whose lower-cased text contains the
//! substring spelled by the path from the root to that node. Every node visited
//! while inserting a suffix accumulates the item, including intermediate nodes
//! created by edge splitting. A query therefore only has to walk the tree once
//! and return the item set of the node it ends on.
//!
//! A consequence relied on by [`CompressedSuffixTree::remove`]: a child's item
//! set is always a subset of its parent's.
//!
//! ## Costs
//!
//! Insert is O(|text|²) per text (all suffixes), fine for display names.
//! Search is O(|query|) edge comparisons.

use rustc_hash::FxHashMap;
use std::collections::BTreeSet;

// ============================================================================
// SuffixNode
// ============================================================================

#[derive(Debug, Clone)]
struct SuffixNode<T> {
    /// Substring from the parent to this node (empty only at the root)
    label: String,
    /// Items whose text contains the root-to-here substring
    items: BTreeSet<T>,
    /// Keyed by the first char of the child's label
    children: FxHashMap<char, SuffixNode<T>>,
}

impl<T: Ord + Clone> SuffixNode<T> {
    fn root() -> Self {
        SuffixNode {
            label: String::new(),
            items: BTreeSet::new(),
            children: FxHashMap::default(),
        }
    }

    fn leaf(label: &str, item: &T) -> Self {
        let mut items = BTreeSet::new();
        items.insert(item.clone());
        SuffixNode {
            label: label.to_string(),
            items,
            children: FxHashMap::default(),
        }
    }

    fn count(&self) -> usize {
        1 + self.children.values().map(SuffixNode::count).sum::<usize>()
    }
}

/// Byte length of the longest common prefix, always on a char boundary of both
fn common_prefix_len(a: &str, b: &str) -> usize {
    a.chars()
        .zip(b.chars())
        .take_while(|(x, y)| x == y)
        .map(|(x, _)| x.len_utf8())
        .sum()
}

fn insert_suffix<T: Ord + Clone>(node: &mut SuffixNode<T>, suffix: &str, item: &T) {
    node.items.insert(item.clone());

    let Some(first) = suffix.chars().next() else {
        return;
    };

    let Some(child) = node.children.get_mut(&first) else {
        node.children.insert(first, SuffixNode::leaf(suffix, item));
        return;
    };

    let common = common_prefix_len(suffix, &child.label);
    if common == child.label.len() {
        insert_suffix(child, &suffix[common..], item);
        return;
    }

    // Split: `child` keeps the shared prefix and becomes the intermediate node,
    // its old contents move one level down under the remainder of the label.
    let lower_label = child.label.split_off(common);
    let lower = SuffixNode {
        label: lower_label,
        items: child.items.clone(),
        children: std::mem::take(&mut child.children),
    };
    if let Some(lower_first) = lower.label.chars().next() {
        child.children.insert(lower_first, lower);
    }
    child.items.insert(item.clone());

    let rest = &suffix[common..];
    if let Some(rest_first) = rest.chars().next() {
        child.children.insert(rest_first, SuffixNode::leaf(rest, item));
    }
}

fn remove_suffix<T: Ord + Clone>(node: &mut SuffixNode<T>, suffix: &str, item: &T) {
    node.items.remove(item);

    let Some(first) = suffix.chars().next() else {
        return;
    };
    let Some(child) = node.children.get_mut(&first) else {
        return;
    };

    let common = common_prefix_len(suffix, &child.label);
    if common == child.label.len() || common == suffix.len() {
        remove_suffix(child, &suffix[common..], item);
    }

    // Descendants are subsets of `child`, so an empty child heads an empty subtree.
    if child.items.is_empty() {
        node.children.remove(&first);
    }
}

// ============================================================================
// CompressedSuffixTree
// ============================================================================

/// Compressed suffix tree mapping lower-cased substrings to item sets
///
/// `T` is the item handle stored in node sets; sets deduplicate by `Ord`, so
/// two handles comparing equal are the same item.
#[derive(Debug, Clone)]
pub struct CompressedSuffixTree<T> {
    root: SuffixNode<T>,
}

impl<T: Ord + Clone> Default for CompressedSuffixTree<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Ord + Clone> CompressedSuffixTree<T> {
    /// Create an empty tree
    pub fn new() -> Self {
        CompressedSuffixTree {
            root: SuffixNode::root(),
        }
    }

    /// Index every suffix of the lower-cased `text` under `item`
    ///
    /// When a suffix shares only part of an existing edge label, the edge is
    /// split into an intermediate node carrying the shared prefix and the union
    /// of old and new items.
    pub fn insert(&mut self, text: &str, item: &T) {
        let text = text.to_lowercase();
        for (offset, _) in text.char_indices() {
            insert_suffix(&mut self.root, &text[offset..], item);
        }
    }

    /// Remove `item` from every node along the paths of every suffix of `text`
    ///
    /// Subtrees whose item set becomes empty are pruned. Non-empty edges are
    /// never merged back together.
    pub fn remove(&mut self, text: &str, item: &T) {
        let text = text.to_lowercase();
        for (offset, _) in text.char_indices() {
            remove_suffix(&mut self.root, &text[offset..], item);
        }
    }

    /// Items whose indexed text contains `query` (case-insensitive), in `Ord` order
    ///
    /// An empty query matches at the root and returns every indexed item.
    pub fn search(&self, query: &str) -> Vec<T> {
        let query = query.to_lowercase();
        let mut node = &self.root;
        let mut rest = query.as_str();

        while let Some(first) = rest.chars().next() {
            let Some(child) = node.children.get(&first) else {
                return Vec::new();
            };
            let common = common_prefix_len(rest, &child.label);
            if common < rest.len() && common < child.label.len() {
                return Vec::new();
            }
            rest = &rest[common..];
            node = child;
        }

        node.items.iter().cloned().collect()
    }

    /// Drop every node
    pub fn clear(&mut self) {
        self.root = SuffixNode::root();
    }

    /// Whether nothing is indexed
    pub fn is_empty(&self) -> bool {
        self.root.items.is_empty()
    }

    /// Number of distinct indexed items
    pub fn item_count(&self) -> usize {
        self.root.items.len()
    }

    /// Number of nodes including the root
    pub fn node_count(&self) -> usize {
        self.root.count()
    }
}
