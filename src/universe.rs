//! Universe of elements, canonical indexing, and permutations.
//!
//! A [`Universe`] fixes the element domain: every element gets a canonical
//! index in `0..n` from the construction order, and fingerprints encode
//! sets as bits at those indices. A [`Permutation`] is an alternative
//! assignment of *significance ranks* to the canonical indices; the bitset
//! indices order fingerprints by their integer value under a permutation,
//! which is what makes multiple independent orderings useful for narrowing
//! candidate ranges.

use std::cmp::Ordering;
use std::hash::Hash;
use std::sync::Arc;

use fxhash::FxHashMap;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::bitvec::BitVec;
use crate::error::{IndexError, Result};
use crate::ranktree::Comparator;

/// Fixed, finite element domain.
///
/// Construction order defines the canonical index of each element. The
/// universe is immutable once built; indices built over it validate entry
/// fingerprints against its size.
#[derive(Debug, Clone)]
pub struct Universe<E> {
    elements: Vec<E>,
    positions: FxHashMap<E, u32>,
}

impl<E: Eq + Hash + Clone> Universe<E> {
    /// Build a universe from its elements.
    ///
    /// # Errors
    /// `EmptyUniverse` when no element is supplied, `DuplicateElement`
    /// when the same element appears twice.
    pub fn new<I>(elements: I) -> Result<Self>
    where
        I: IntoIterator<Item = E>,
    {
        let elements: Vec<E> = elements.into_iter().collect();
        if elements.is_empty() {
            return Err(IndexError::EmptyUniverse);
        }
        let mut positions =
            FxHashMap::with_capacity_and_hasher(elements.len(), Default::default());
        for (i, element) in elements.iter().enumerate() {
            if positions.insert(element.clone(), i as u32).is_some() {
                return Err(IndexError::DuplicateElement(i));
            }
        }
        Ok(Universe { elements, positions })
    }

    /// Number of elements.
    #[inline]
    pub fn len(&self) -> u32 {
        self.elements.len() as u32
    }

    /// Always false; a universe holds at least one element.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Canonical index of an element, if it belongs to the universe.
    #[inline]
    pub fn position(&self, element: &E) -> Option<u32> {
        self.positions.get(element).copied()
    }

    /// Element at a canonical index.
    #[inline]
    pub fn element(&self, position: u32) -> Option<&E> {
        self.elements.get(position as usize)
    }

    /// Iterate elements in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = &E> {
        self.elements.iter()
    }

    /// Encode an element set as a canonical fingerprint.
    ///
    /// # Errors
    /// `UnknownElement` when a supplied element is not in the universe.
    pub fn bit_vec<I>(&self, elements: I) -> Result<BitVec>
    where
        I: IntoIterator<Item = E>,
    {
        let mut bits = BitVec::new(self.len());
        for element in elements {
            let position = self
                .position(&element)
                .ok_or(IndexError::UnknownElement)?;
            bits.set(position);
        }
        Ok(bits)
    }

    /// Produce `count` permutations of this universe.
    ///
    /// The first permutation is always the canonical identity, determined
    /// by the universe's construction order. The remaining `count - 1` are
    /// independent pseudo-random shuffles driven by `seed`; the same seed
    /// reproduces the same permutations.
    pub fn permutations(&self, seed: u64, count: usize) -> Vec<Permutation> {
        let n = self.len();
        let mut perms = Vec::with_capacity(count);
        if count == 0 {
            return perms;
        }
        perms.push(Permutation::identity(n));

        let mut rng = StdRng::seed_from_u64(seed);
        let mut ranks: Vec<u32> = (0..n).collect();
        for _ in 1..count {
            ranks.shuffle(&mut rng);
            let perm = Permutation::from_ranks(ranks.clone())
                .expect("shuffled identity ranks form a bijection");
            perms.push(perm);
        }
        perms
    }
}

/// Bijection from canonical bit indices to significance ranks.
///
/// Rank 0 is the least significant position: under a permutation, a
/// fingerprint reads as the integer `sum(2^rank(i))` over its set bits
/// `i`. Permutations are cheap to clone; the tables are shared.
#[derive(Debug, Clone)]
pub struct Permutation {
    /// `rank_of[bit]` is the significance rank of a canonical bit.
    rank_of: Arc<[u32]>,
    /// `by_rank[rank]` is the canonical bit at a significance rank.
    by_rank: Arc<[u32]>,
    identity: bool,
}

impl Permutation {
    /// The canonical permutation: every bit keeps its own rank.
    pub fn identity(n: u32) -> Self {
        let table: Arc<[u32]> = (0..n).collect();
        Permutation {
            rank_of: table.clone(),
            by_rank: table,
            identity: true,
        }
    }

    /// Build a permutation from a rank table, `ranks[bit] = rank`.
    ///
    /// # Errors
    /// `InvalidPermutation` unless the table is a bijection onto
    /// `0..ranks.len()`.
    pub fn from_ranks(ranks: Vec<u32>) -> Result<Self> {
        let n = ranks.len() as u32;
        let mut by_rank = vec![u32::MAX; ranks.len()];
        for (bit, &rank) in ranks.iter().enumerate() {
            if rank >= n || by_rank[rank as usize] != u32::MAX {
                return Err(IndexError::InvalidPermutation { expected: n });
            }
            by_rank[rank as usize] = bit as u32;
        }
        let identity = ranks.iter().enumerate().all(|(i, &r)| r == i as u32);
        Ok(Permutation {
            rank_of: ranks.into(),
            by_rank: by_rank.into(),
            identity,
        })
    }

    /// Number of positions covered.
    #[inline]
    pub fn len(&self) -> u32 {
        self.rank_of.len() as u32
    }

    /// True when the permutation covers no positions.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rank_of.is_empty()
    }

    /// True for the canonical identity permutation.
    #[inline]
    pub fn is_identity(&self) -> bool {
        self.identity
    }

    /// Significance rank of a canonical bit index.
    ///
    /// # Panics
    /// Panics if `bit` is out of range.
    #[inline]
    pub fn rank(&self, bit: u32) -> u32 {
        self.rank_of[bit as usize]
    }

    /// Re-encode a canonical fingerprint with bits placed at their ranks.
    ///
    /// The result compares under `cmp_canonical` the way the input
    /// compares under this permutation's ordering.
    ///
    /// # Errors
    /// `PermutationSizeMismatch` when the fingerprint width differs from
    /// the permutation's size.
    pub fn encode(&self, canonical: &BitVec) -> Result<BitVec> {
        if canonical.width() != self.len() {
            return Err(IndexError::PermutationSizeMismatch {
                expected: self.len(),
                got: canonical.width(),
            });
        }
        let mut bits = BitVec::new(self.len());
        for bit in canonical.iter_ones() {
            bits.set(self.rank_of[bit as usize]);
        }
        Ok(bits)
    }

    /// Comparator ordering canonical fingerprints by this permutation.
    pub fn order(&self) -> PermutedOrder {
        PermutedOrder {
            by_rank: self.by_rank.clone(),
            identity: self.identity,
        }
    }
}

/// Lexicographic fingerprint ordering under a permutation.
///
/// Compares the integer values of two canonical fingerprints with bit
/// significance assigned by the permutation. The comparator belongs to the
/// ordered set that uses it; the fingerprints themselves stay
/// permutation-neutral. Identity permutations take the block-wise fast
/// path instead of probing bits one at a time.
#[derive(Debug, Clone)]
pub struct PermutedOrder {
    by_rank: Arc<[u32]>,
    identity: bool,
}

impl PermutedOrder {
    fn cmp_bits(&self, a: &BitVec, b: &BitVec) -> Ordering {
        if self.identity {
            return a.cmp_canonical(b);
        }
        for &bit in self.by_rank.iter().rev() {
            match (a.get(bit), b.get(bit)) {
                (true, false) => return Ordering::Greater,
                (false, true) => return Ordering::Less,
                _ => {}
            }
        }
        Ordering::Equal
    }
}

impl Comparator<BitVec> for PermutedOrder {
    #[inline]
    fn cmp(&self, a: &BitVec, b: &BitVec) -> Ordering {
        self.cmp_bits(a, b)
    }
}

impl Comparator<Arc<BitVec>> for PermutedOrder {
    #[inline]
    fn cmp(&self, a: &Arc<BitVec>, b: &Arc<BitVec>) -> Ordering {
        self.cmp_bits(a, b)
    }
}
