//! Subset testing, ordered comparison, and representation-independent
//! equality for bit vectors.
//!
//! All relations here are defined on the logical bit sequence, so a dense
//! vector and a sparse vector encoding the same set are equal, hash the
//! same, and compare equal.

use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

use super::{BitVec, Repr};

/// Iterator over the non-zero blocks of a [`Repr`], in either direction.
///
/// Yields `(block index, word)` pairs. Dense storage is scanned with zero
/// blocks skipped; sparse storage is walked directly.
pub(super) struct Blocks<'a> {
    repr: &'a Repr,
    /// Next position for ascending scans, one past the next position for
    /// descending scans.
    pos: usize,
    end: usize,
    rev: bool,
}

impl<'a> Blocks<'a> {
    pub(super) fn ascending(repr: &'a Repr) -> Self {
        Blocks {
            repr,
            pos: 0,
            end: block_count(repr),
            rev: false,
        }
    }

    pub(super) fn descending(repr: &'a Repr) -> Self {
        Blocks {
            repr,
            pos: block_count(repr),
            end: 0,
            rev: true,
        }
    }

    #[inline]
    fn read(&self, i: usize) -> (u32, u64) {
        match self.repr {
            Repr::Dense(words) => (i as u32, words[i]),
            Repr::Sparse(entries) => entries[i],
        }
    }
}

fn block_count(repr: &Repr) -> usize {
    match repr {
        Repr::Dense(words) => words.len(),
        Repr::Sparse(entries) => entries.len(),
    }
}

impl Iterator for Blocks<'_> {
    type Item = (u32, u64);

    fn next(&mut self) -> Option<(u32, u64)> {
        if !self.rev {
            while self.pos < self.end {
                let item = self.read(self.pos);
                self.pos += 1;
                if item.1 != 0 {
                    return Some(item);
                }
            }
        } else {
            while self.pos > self.end {
                self.pos -= 1;
                let item = self.read(self.pos);
                if item.1 != 0 {
                    return Some(item);
                }
            }
        }
        None
    }
}

impl BitVec {
    /// True if every bit set in `self` is also set in `other`.
    ///
    /// Block-wise: for each non-zero block of `self`, the AND with the
    /// matching block of `other` must reproduce the block. Both vectors
    /// must span the same universe.
    pub fn is_subset_of(&self, other: &BitVec) -> bool {
        debug_assert_eq!(self.width, other.width);
        self.nonzero_blocks()
            .all(|(block, word)| word & other.block(block) == word)
    }

    /// Lexicographic integer comparison in canonical bit order.
    ///
    /// The vector is read as the integer `sum(2^i)` over set bits `i`, so
    /// bit 0 is least significant. Walks the non-zero blocks of both
    /// vectors from the top: the first difference in block index or block
    /// value decides; a vector with blocks remaining once the other is
    /// exhausted is the larger one.
    pub fn cmp_canonical(&self, other: &BitVec) -> Ordering {
        debug_assert_eq!(self.width, other.width);
        let mut lhs = self.nonzero_blocks_desc();
        let mut rhs = other.nonzero_blocks_desc();
        loop {
            match (lhs.next(), rhs.next()) {
                (None, None) => return Ordering::Equal,
                (Some(_), None) => return Ordering::Greater,
                (None, Some(_)) => return Ordering::Less,
                (Some((lb, lw)), Some((rb, rw))) => {
                    if lb != rb {
                        // The higher non-zero block dominates.
                        return lb.cmp(&rb);
                    }
                    if lw != rw {
                        return lw.cmp(&rw);
                    }
                }
            }
        }
    }
}

impl PartialEq for BitVec {
    fn eq(&self, other: &Self) -> bool {
        self.width == other.width && self.nonzero_blocks().eq(other.nonzero_blocks())
    }
}

impl Eq for BitVec {}

impl Hash for BitVec {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.width.hash(state);
        for (block, word) in self.nonzero_blocks() {
            block.hash(state);
            word.hash(state);
        }
    }
}
