//! Multi-permutation bitset index with a per-query planner.
//!
//! One bucket map keyed by canonical fingerprints is shared by k rank
//! trees, each ordering the same fingerprints under a different
//! permutation of the universe. A query's candidate range has a different
//! size in every tree; the planner probes each tree's rank counts in
//! O(log n) and iterates only the tightest range. The subset filter runs
//! on canonical fingerprints, so it is the same under every permutation.
//!
//! With k = 1 and the canonical permutation this degenerates to
//! [`crate::SimpleBitSetIndex`]; the value of the extra permutations is
//! that a range that is loose in one bit ordering is usually tight in
//! another.

use std::sync::Arc;

use fxhash::{FxHashMap, FxHashSet};

use crate::bitvec::BitVec;
use crate::error::{IndexError, Result};
use crate::index::{check_width, ContainmentIndex, Entries, IndexEntry};
use crate::nest::nest;
use crate::ranktree::RankTree;
use crate::universe::{Permutation, PermutedOrder};

/// Containment index over k fingerprint orderings.
///
/// # Example
/// ```rust
/// use containment_index::{CacheEntry, ContainmentIndex, MultiPermutationIndex, Universe};
///
/// let universe = Universe::new(0u32..32).unwrap();
/// let perms = universe.permutations(0xC0FFEE, 3);
/// let mut index = MultiPermutationIndex::new(universe.len(), &perms).unwrap();
///
/// index.add(CacheEntry::new(&universe, [2u32, 4, 6], 1).unwrap()).unwrap();
/// let query = CacheEntry::new(&universe, [4u32, 6], 2).unwrap();
/// assert_eq!(index.num_supersets(&query).unwrap(), 1);
/// ```
#[derive(Debug)]
pub struct MultiPermutationIndex<C> {
    width: u32,
    /// One fingerprint ordering per permutation. Every tree holds exactly
    /// the bucket map's key set.
    trees: Vec<RankTree<Arc<BitVec>, PermutedOrder>>,
    buckets: FxHashMap<Arc<BitVec>, FxHashSet<C>>,
    len: usize,
}

impl<C: IndexEntry> MultiPermutationIndex<C> {
    /// Create an index over the given permutations.
    ///
    /// # Errors
    /// `NoPermutations` when the slice is empty,
    /// `PermutationSizeMismatch` when a permutation does not cover the
    /// universe.
    pub fn new(universe_len: u32, permutations: &[Permutation]) -> Result<Self> {
        if permutations.is_empty() {
            return Err(IndexError::NoPermutations);
        }
        let mut trees = Vec::with_capacity(permutations.len());
        for permutation in permutations {
            if permutation.len() != universe_len {
                return Err(IndexError::PermutationSizeMismatch {
                    expected: universe_len,
                    got: permutation.len(),
                });
            }
            trees.push(RankTree::new(permutation.order()));
        }
        Ok(MultiPermutationIndex {
            width: universe_len,
            trees,
            buckets: FxHashMap::default(),
            len: 0,
        })
    }

    /// Number of permutations in play.
    pub fn permutation_count(&self) -> usize {
        self.trees.len()
    }

    fn probe(&self, query: &C) -> Arc<BitVec> {
        Arc::new(query.fingerprint().clone())
    }

    /// Tree with the fewest keys at or below the probe; ties go to the
    /// lowest permutation index.
    fn best_for_subsets(&self, probe: &Arc<BitVec>) -> &RankTree<Arc<BitVec>, PermutedOrder> {
        self.trees
            .iter()
            .min_by_key(|tree| tree.count_le(probe))
            .expect("index holds at least one permutation")
    }

    /// Tree with the fewest keys at or above the probe.
    fn best_for_supersets(&self, probe: &Arc<BitVec>) -> &RankTree<Arc<BitVec>, PermutedOrder> {
        self.trees
            .iter()
            .min_by_key(|tree| tree.count_ge(probe))
            .expect("index holds at least one permutation")
    }
}

impl<C: IndexEntry> ContainmentIndex<C> for MultiPermutationIndex<C> {
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
            for tree in &mut self.trees {
                tree.add(key.clone());
            }
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
            if let Some((key, _)) = self.buckets.remove_entry(entry.fingerprint()) {
                for tree in &mut self.trees {
                    tree.remove(&key);
                }
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
        let tree = self.best_for_subsets(&probe);
        let bound = probe.clone();
        let candidates = tree
            .iter_le(&probe)
            .filter(move |fp| fp.is_subset_of(&bound));
        Ok(Box::new(nest(candidates, move |fp| {
            self.buckets.get(fp.as_ref()).map(|bucket| bucket.iter())
        })))
    }

    fn num_subsets(&self, query: &C) -> Result<usize> {
        check_width(self.width, query)?;
        let probe = self.probe(query);
        let tree = self.best_for_subsets(&probe);
        Ok(tree
            .iter_le(&probe)
            .filter(|fp| fp.is_subset_of(&probe))
            .map(|fp| self.buckets.get(fp.as_ref()).map_or(0, |b| b.len()))
            .sum())
    }

    fn supersets<'a>(&'a self, query: &C) -> Result<Entries<'a, C>> {
        check_width(self.width, query)?;
        let probe = self.probe(query);
        let tree = self.best_for_supersets(&probe);
        let bound = probe.clone();
        let candidates = tree
            .iter_ge(&probe)
            .filter(move |fp| bound.is_subset_of(fp));
        Ok(Box::new(nest(candidates, move |fp| {
            self.buckets.get(fp.as_ref()).map(|bucket| bucket.iter())
        })))
    }

    fn num_supersets(&self, query: &C) -> Result<usize> {
        check_width(self.width, query)?;
        let probe = self.probe(query);
        let tree = self.best_for_supersets(&probe);
        Ok(tree
            .iter_ge(&probe)
            .filter(|fp| probe.is_subset_of(fp))
            .map(|fp| self.buckets.get(fp.as_ref()).map_or(0, |b| b.len()))
            .sum())
    }

    fn iter_all(&self) -> Entries<'_, C> {
        Box::new(
            self.buckets
                .values()
                .flat_map(|bucket| bucket.iter()),
        )
    }

    fn len(&self) -> usize {
        self.len
    }
}
