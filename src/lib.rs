//! # containment-index
//!
//! In-memory set containment index: store entries carrying element sets
//! over a fixed universe, then ask for all stored subsets or supersets of
//! a query set.
//!
//! ## Features
//! - Subset / superset queries with lazy result iteration
//! - Bucketing: distinct entries over the same element set coexist
//! - Multi-permutation bitset backend with a per-query range planner
//! - Unlimited-branching trie backend as an alternative engine
//! - O(log n) rank counting via a size-augmented red-black tree
//! - Buffered thread-safe wrapper with a background flush worker
//!
//! ## Picking a backend
//! [`SimpleBitSetIndex`] orders fingerprints one way and is the smallest;
//! [`MultiPermutationIndex`] maintains k orderings and picks the tightest
//! candidate range per query, which pays off as the index grows;
//! [`UbtIndex`] stores sorted element paths in a trie and shines on small,
//! shallow sets. All three answer every query identically.
//!
//! ## Example
//! ```rust
//! use containment_index::{CacheEntry, ContainmentIndex, MultiPermutationIndex, Universe};
//!
//! let universe = Universe::new(0u32..=10).unwrap();
//! let perms = universe.permutations(0xFEED, 3);
//! let mut index = MultiPermutationIndex::new(universe.len(), &perms).unwrap();
//!
//! index.add(CacheEntry::new(&universe, [0u32, 2, 4, 6, 8, 10], "evens").unwrap()).unwrap();
//! index.add(CacheEntry::new(&universe, [1u32, 3, 5, 7, 9], "odds").unwrap()).unwrap();
//! index.add(CacheEntry::new(&universe, [2u32, 4, 6], "mid").unwrap()).unwrap();
//!
//! let query = CacheEntry::new(&universe, [4u32, 6], "q").unwrap();
//! let mut found: Vec<&str> = index
//!     .supersets(&query)
//!     .unwrap()
//!     .map(|entry| *entry.tag())
//!     .collect();
//! found.sort();
//! assert_eq!(found, vec!["evens", "mid"]);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bitvec;
pub mod buffered;
pub mod error;
pub mod index;
pub mod nest;
pub mod ranktree;
pub mod universe;

pub use bitvec::BitVec;
pub use buffered::{BufferedIndex, OwnedEntries, ReadHandle};
pub use error::IndexError;
pub use index::{
    CacheEntry, ContainmentIndex, Entries, IndexEntry, MultiPermutationIndex,
    SimpleBitSetIndex, UbtIndex, MAX_TRIE_ELEMENTS,
};
pub use ranktree::{Comparator, NaturalOrder, RankTree};
pub use universe::{Permutation, PermutedOrder, Universe};
