//! Error types for containment index construction and operations.

use thiserror::Error;

/// Error variants for universe construction, permutation validation,
/// and index operations.
///
/// States that can only be reached through a bug in the index itself
/// (for example a divergence between the add-buffer and its pending
/// counter) are not represented here; they panic instead of returning,
/// so they can never silently corrupt the index.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndexError {
    /// A universe was constructed from an empty element sequence.
    #[error("universe must contain at least one element")]
    EmptyUniverse,

    /// The same element appeared twice while building a universe.
    #[error("duplicate universe element at position {0}")]
    DuplicateElement(usize),

    /// A permutation's image is not a bijection onto `0..n`.
    #[error("permutation image is not a bijection onto 0..{expected}")]
    InvalidPermutation {
        /// Universe size the permutation must cover.
        expected: u32,
    },

    /// A multi-permutation index was constructed without any permutation.
    #[error("at least one permutation is required")]
    NoPermutations,

    /// A permutation covers a different number of positions than the
    /// universe it is paired with.
    #[error("permutation covers {got} positions, universe has {expected}")]
    PermutationSizeMismatch {
        /// Universe size.
        expected: u32,
        /// Positions covered by the offending permutation.
        got: u32,
    },

    /// An entry was built from an element that is not in the universe.
    #[error("element does not belong to the universe")]
    UnknownElement,

    /// An operation received an entry fingerprinted against a universe
    /// of a different size.
    #[error("entry spans a universe of {got} elements, index expects {expected}")]
    UniverseMismatch {
        /// Fingerprint width the index accepts.
        expected: u32,
        /// Width of the offending entry.
        got: u32,
    },

    /// An entry's element set exceeds the trie backend's size bound.
    #[error("entry has {got} elements, the trie supports at most {max}")]
    EntryTooLarge {
        /// Element count of the offending entry.
        got: usize,
        /// Maximum supported element count.
        max: usize,
    },
}

/// A specialized Result type for containment index operations.
pub type Result<T> = std::result::Result<T, IndexError>;
