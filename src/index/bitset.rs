//! Single-permutation bitset index.
//!
//! Fingerprints are kept in one rank tree ordered by their integer value
//! under a permutation, and in a bucket map from fingerprint to the
//! entries sharing it. Queries use *range narrowing*: growing a set can
//! only raise its integer value, so every superset of a query lies in the
//! tree range at or above the query's fingerprint, and every subset at or
//! below it. The range is a sound candidate set, not an exact one; the
//! word-wise subset test filters it down.

use std::sync::Arc;

use fxhash::{FxHashMap, FxHashSet};

use crate::bitvec::BitVec;
use crate::error::Result;
use crate::index::{check_width, ContainmentIndex, Entries, IndexEntry};
use crate::nest::nest;
use crate::ranktree::RankTree;
use crate::universe::{Permutation, PermutedOrder};

/// Containment index over a single fingerprint ordering.
///
/// # Example
/// ```rust
/// use containment_index::{CacheEntry, ContainmentIndex, SimpleBitSetIndex, Universe};
///
/// let universe = Universe::new(0u32..16).unwrap();
/// let mut index = SimpleBitSetIndex::new(universe.len());
/// index.add(CacheEntry::new(&universe, [1u32, 2], "pair").unwrap()).unwrap();
///
/// let query = CacheEntry::new(&universe, [1u32, 2, 3], "query").unwrap();
/// assert_eq!(index.num_subsets(&query).unwrap(), 1);
/// ```
pub struct SimpleBitSetIndex<C> {
    width: u32,
    /// Distinct fingerprints, ordered by the permutation.
    tree: RankTree<Arc<BitVec>, PermutedOrder>,
    /// Fingerprint to the entries sharing it. Bucket keys and tree keys
    /// are the same `Arc`s; a key exists in one exactly when it exists in
    /// the other.
    buckets: FxHashMap<Arc<BitVec>, FxHashSet<C>>,
    /// Entry count across all buckets.
    len: usize,
}

impl<C: IndexEntry> SimpleBitSetIndex<C> {
    /// Create an index ordered by the canonical permutation.
    pub fn new(universe_len: u32) -> Self {
        Self::with_permutation(&Permutation::identity(universe_len))
    }

    /// Create an index ordered by an explicit permutation.
    pub fn with_permutation(permutation: &Permutation) -> Self {
        SimpleBitSetIndex {
            width: permutation.len(),
            tree: RankTree::new(permutation.order()),
            buckets: FxHashMap::default(),
            len: 0,
        }
    }

    fn probe(&self, query: &C) -> Arc<BitVec> {
        Arc::new(query.fingerprint().clone())
    }
}

impl<C: IndexEntry> ContainmentIndex<C> for SimpleBitSetIndex<C> {
    fn universe_len(&self) -> u32 {
        self.width
    }

    fn add(&mut self, entry: C) -> Result<()> {
        check_width(self.width, &entry)?;
        if let Some(bucket) = self.buckets.get_mut(entry.fingerprint()) {
            if bucket.insert(entry) {
                self.len += 1;
            }
        } else {
            let key = Arc::new(entry.fingerprint().clone());
            self.tree.add(key.clone());
            let mut bucket = FxHashSet::default();
            bucket.insert(entry);
            self.buckets.insert(key, bucket);
            self.len += 1;
        }
        Ok(())
    }

    fn remove(&mut self, entry: &C) -> Result<()> {
        check_width(self.width, entry)?;
        let emptied = match self.buckets.get_mut(entry.fingerprint()) {
            Some(bucket) => {
                if bucket.remove(entry) {
                    self.len -= 1;
                }
                bucket.is_empty()
            }
            None => false,
        };
        if emptied {
            // The last entry of the bucket is gone; drop the fingerprint.
            if let Some((key, _)) = self.buckets.remove_entry(entry.fingerprint()) {
                self.tree.remove(&key);
            }
        }
        Ok(())
    }

    fn contains(&self, entry: &C) -> bool {
        self.buckets
            .get(entry.fingerprint())
            .is_some_and(|bucket| bucket.contains(entry))
    }

    fn subsets<'a>(&'a self, query: &C) -> Result<Entries<'a, C>> {
        check_width(self.width, query)?;
        let probe = self.probe(query);
        let bound = probe.clone();
        let candidates = self
            .tree
            .iter_le(&probe)
            .filter(move |fp| fp.is_subset_of(&bound));
        Ok(Box::new(nest(candidates, move |fp| {
            self.buckets.get(fp.as_ref()).map(|bucket| bucket.iter())
        })))
    }

    fn num_subsets(&self, query: &C) -> Result<usize> {
        check_width(self.width, query)?;
        let probe = self.probe(query);
        Ok(self
            .tree
            .iter_le(&probe)
            .filter(|fp| fp.is_subset_of(&probe))
            .map(|fp| self.buckets.get(fp.as_ref()).map_or(0, |b| b.len()))
            .sum())
    }

    fn supersets<'a>(&'a self, query: &C) -> Result<Entries<'a, C>> {
        check_width(self.width, query)?;
        let probe = self.probe(query);
        let bound = probe.clone();
        let candidates = self
            .tree
            .iter_ge(&probe)
            .filter(move |fp| bound.is_subset_of(fp));
        Ok(Box::new(nest(candidates, move |fp| {
            self.buckets.get(fp.as_ref()).map(|bucket| bucket.iter())
        })))
    }

    fn num_supersets(&self, query: &C) -> Result<usize> {
        check_width(self.width, query)?;
        let probe = self.probe(query);
        Ok(self
            .tree
            .iter_ge(&probe)
            .filter(|fp| probe.is_subset_of(fp))
            .map(|fp| self.buckets.get(fp.as_ref()).map_or(0, |b| b.len()))
            .sum())
    }

    fn iter_all(&self) -> Entries<'_, C> {
        Box::new(nest(self.tree.iter(), move |fp| {
            self.buckets.get(fp.as_ref()).map(|bucket| bucket.iter())
        }))
    }

    fn len(&self) -> usize {
        self.len
    }
}
