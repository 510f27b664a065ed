//! Unlimited-branching tree index.
//!
//! An alternative backend that skips fingerprint ordering entirely: each
//! entry's element set, sorted into canonical index order, is a path from
//! the root, and the node at the end of the path owns the entry's bucket.
//! A set is therefore present exactly when its sorted element sequence is
//! a root path ending at a non-empty bucket.
//!
//! Subset queries descend only along elements of the query, consuming
//! them in order; superset queries may descend through any element
//! smaller than the next one still required, consume it on a match, and
//! never skip past it. Both are breadth-first with an explicit queue, so
//! no recursion depth is tied to the universe size; removal recurses
//! along the entry's path to prune emptied nodes, which is why entry size
//! stays bounded.

use std::collections::VecDeque;

use fxhash::{FxHashMap, FxHashSet};

use crate::error::{IndexError, Result};
use crate::index::{check_width, ContainmentIndex, Entries, IndexEntry};
use crate::nest::nest;

/// Maximum element count per entry accepted by the trie backend.
///
/// Removal walks the entry's path with one stack frame per element; the
/// bound keeps that walk comfortably inside the default stack.
pub const MAX_TRIE_ELEMENTS: usize = 2500;

struct UbtNode<C> {
    /// Entries whose set is exactly the root path to this node.
    entries: FxHashSet<C>,
    /// Child per next path element.
    children: FxHashMap<u32, UbtNode<C>>,
}

impl<C> UbtNode<C> {
    fn new() -> Self {
        UbtNode {
            entries: FxHashSet::default(),
            children: FxHashMap::default(),
        }
    }

    fn is_prunable(&self) -> bool {
        self.entries.is_empty() && self.children.is_empty()
    }
}

/// Prefix-tree containment index.
///
/// # Example
/// ```rust
/// use containment_index::{CacheEntry, ContainmentIndex, UbtIndex, Universe};
///
/// let universe = Universe::new(0u32..8).unwrap();
/// let mut index = UbtIndex::new(universe.len());
/// index.add(CacheEntry::new(&universe, [1u32, 5], "e").unwrap()).unwrap();
///
/// let query = CacheEntry::new(&universe, [1u32, 3, 5], "q").unwrap();
/// assert_eq!(index.num_subsets(&query).unwrap(), 1);
/// ```
pub struct UbtIndex<C> {
    width: u32,
    root: UbtNode<C>,
    len: usize,
}

impl<C: IndexEntry> UbtIndex<C> {
    /// Create an empty trie over a universe of the given size.
    pub fn new(universe_len: u32) -> Self {
        UbtIndex {
            width: universe_len,
            root: UbtNode::new(),
            len: 0,
        }
    }

    /// Sorted canonical path of an operand, bounds checked.
    fn path(&self, entry: &C) -> Result<Vec<u32>> {
        check_width(self.width, entry)?;
        let path: Vec<u32> = entry.fingerprint().iter_ones().collect();
        if path.len() > MAX_TRIE_ELEMENTS {
            return Err(IndexError::EntryTooLarge {
                got: path.len(),
                max: MAX_TRIE_ELEMENTS,
            });
        }
        Ok(path)
    }

    /// Nodes holding subsets of the query path, breadth-first.
    fn subset_nodes(&self, path: Vec<u32>) -> SubsetNodes<'_, C> {
        let mut queue = VecDeque::new();
        queue.push_back((&self.root, 0));
        SubsetNodes { queue, path }
    }

    /// Nodes holding supersets of the query path, breadth-first.
    fn superset_nodes(&self, path: Vec<u32>) -> SupersetNodes<'_, C> {
        let mut queue = VecDeque::new();
        queue.push_back((&self.root, 0));
        SupersetNodes { queue, path }
    }

    fn all_nodes(&self) -> AllNodes<'_, C> {
        let mut queue = VecDeque::new();
        queue.push_back(&self.root);
        AllNodes { queue }
    }
}

impl<C: IndexEntry> ContainmentIndex<C> for UbtIndex<C> {
    fn universe_len(&self) -> u32 {
        self.width
    }

    fn add(&mut self, entry: C) -> Result<()> {
        let path = self.path(&entry)?;
        let mut node = &mut self.root;
        for element in path {
            node = node.children.entry(element).or_insert_with(UbtNode::new);
        }
        if node.entries.insert(entry) {
            self.len += 1;
        }
        Ok(())
    }

    fn remove(&mut self, entry: &C) -> Result<()> {
        let path = self.path(entry)?;
        let mut removed = false;
        remove_rec(&mut self.root, &path, entry, &mut removed);
        if removed {
            self.len -= 1;
        }
        Ok(())
    }

    fn contains(&self, entry: &C) -> bool {
        if entry.fingerprint().width() != self.width {
            return false;
        }
        let mut node = &self.root;
        for element in entry.fingerprint().iter_ones() {
            match node.children.get(&element) {
                Some(child) => node = child,
                None => return false,
            }
        }
        node.entries.contains(entry)
    }

    fn subsets<'a>(&'a self, query: &C) -> Result<Entries<'a, C>> {
        let path = self.path(query)?;
        Ok(Box::new(nest(self.subset_nodes(path), |node| {
            Some(node.entries.iter())
        })))
    }

    fn num_subsets(&self, query: &C) -> Result<usize> {
        let path = self.path(query)?;
        Ok(self.subset_nodes(path).map(|node| node.entries.len()).sum())
    }

    fn supersets<'a>(&'a self, query: &C) -> Result<Entries<'a, C>> {
        let path = self.path(query)?;
        Ok(Box::new(nest(self.superset_nodes(path), |node| {
            Some(node.entries.iter())
        })))
    }

    fn num_supersets(&self, query: &C) -> Result<usize> {
        let path = self.path(query)?;
        Ok(self
            .superset_nodes(path)
            .map(|node| node.entries.len())
            .sum())
    }

    fn iter_all(&self) -> Entries<'_, C> {
        Box::new(nest(self.all_nodes(), |node| Some(node.entries.iter())))
    }

    fn len(&self) -> usize {
        self.len
    }
}

/// Remove `entry` at the end of `path` under `node`.
///
/// # Returns
/// `true` if `node` ended up with no entries and no children, telling the
/// caller to prune it.
fn remove_rec<C: IndexEntry>(
    node: &mut UbtNode<C>,
    path: &[u32],
    entry: &C,
    removed: &mut bool,
) -> bool {
    match path.split_first() {
        None => {
            *removed = node.entries.remove(entry);
        }
        Some((&element, rest)) => {
            if let Some(child) = node.children.get_mut(&element) {
                if remove_rec(child, rest, entry, removed) {
                    node.children.remove(&element);
                }
            }
        }
    }
    node.is_prunable()
}

/// Breadth-first traversal yielding nodes whose path is a subset of the
/// query.
///
/// Queue entries pair a node with the index into the sorted query path
/// from which its remaining elements may be drawn. Every dequeued node is
/// a subset terminus, so every node is yielded; children are enqueued for
/// each query element still available, consuming it.
struct SubsetNodes<'a, C> {
    queue: VecDeque<(&'a UbtNode<C>, usize)>,
    path: Vec<u32>,
}

impl<'a, C> Iterator for SubsetNodes<'a, C> {
    type Item = &'a UbtNode<C>;

    fn next(&mut self) -> Option<&'a UbtNode<C>> {
        let (node, index) = self.queue.pop_front()?;
        for i in index..self.path.len() {
            if let Some(child) = node.children.get(&self.path[i]) {
                self.queue.push_back((child, i + 1));
            }
        }
        Some(node)
    }
}

/// Breadth-first traversal yielding nodes whose path is a superset of the
/// query.
///
/// A child labelled below the next required element is legal filler; a
/// child matching it consumes it; a child above it would skip a required
/// element, so that branch is dead. Nodes are yielded only once the whole
/// query has been consumed.
struct SupersetNodes<'a, C> {
    queue: VecDeque<(&'a UbtNode<C>, usize)>,
    path: Vec<u32>,
}

impl<'a, C> Iterator for SupersetNodes<'a, C> {
    type Item = &'a UbtNode<C>;

    fn next(&mut self) -> Option<&'a UbtNode<C>> {
        loop {
            let (node, index) = self.queue.pop_front()?;
            if index == self.path.len() {
                for child in node.children.values() {
                    self.queue.push_back((child, index));
                }
                return Some(node);
            }
            let required = self.path[index];
            for (&label, child) in &node.children {
                if label < required {
                    self.queue.push_back((child, index));
                } else if label == required {
                    self.queue.push_back((child, index + 1));
                }
            }
        }
    }
}

struct AllNodes<'a, C> {
    queue: VecDeque<&'a UbtNode<C>>,
}

impl<'a, C> Iterator for AllNodes<'a, C> {
    type Item = &'a UbtNode<C>;

    fn next(&mut self) -> Option<&'a UbtNode<C>> {
        let node = self.queue.pop_front()?;
        for child in node.children.values() {
            self.queue.push_back(child);
        }
        Some(node)
    }
}
