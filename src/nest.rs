//! Lazy two-level iteration.
//!
//! [`nest`] combines a primary sequence of keys with a lookup producing a
//! secondary sequence per key into one flat sequence: the concatenation of
//! the secondaries in primary order. Keys whose lookup returns `None` (or
//! an empty sequence) are skipped. Nothing is materialized: advancing the
//! combined sequence advances the primary and at most one secondary.
//!
//! The containment indices use this to flatten ordered fingerprint ranges
//! and trie node traversals through their entry buckets without building
//! intermediate lists.

/// Nest a secondary sequence lookup under a primary key sequence.
///
/// # Example
/// ```rust
/// use containment_index::nest::nest;
///
/// let groups = [vec!['a', 'A'], vec![], vec!['b', 'B']];
/// let flat: Vec<char> = nest(0..3usize, |i| Some(groups[i].iter().copied())).collect();
/// assert_eq!(flat, vec!['a', 'A', 'b', 'B']);
/// ```
pub fn nest<P, F, S>(primary: P, lookup: F) -> Nested<P, F, S>
where
    P: Iterator,
    F: FnMut(P::Item) -> Option<S>,
    S: Iterator,
{
    Nested {
        primary,
        lookup,
        current: None,
    }
}

/// Iterator returned by [`nest`].
pub struct Nested<P, F, S> {
    primary: P,
    lookup: F,
    /// Secondary sequence currently being drained.
    current: Option<S>,
}

impl<P, F, S> Iterator for Nested<P, F, S>
where
    P: Iterator,
    F: FnMut(P::Item) -> Option<S>,
    S: Iterator,
{
    type Item = S::Item;

    fn next(&mut self) -> Option<S::Item> {
        loop {
            if let Some(secondary) = &mut self.current {
                if let Some(item) = secondary.next() {
                    return Some(item);
                }
            }
            let key = self.primary.next()?;
            self.current = (self.lookup)(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_concatenates_in_primary_order() {
        let mut map = HashMap::new();
        map.insert(1, vec!["a", "A"]);
        map.insert(2, vec!["b", "B"]);
        map.insert(3, vec!["c", "C"]);

        let flat: Vec<&str> = nest([1, 2, 3].into_iter(), |k| {
            map.get(&k).map(|v| v.iter().copied())
        })
        .collect();
        assert_eq!(flat, vec!["a", "A", "b", "B", "c", "C"]);
    }

    #[test]
    fn test_skips_missing_and_empty_keys() {
        let mut map = HashMap::new();
        map.insert(1, vec![10]);
        map.insert(3, Vec::new());
        map.insert(4, vec![40, 41]);

        let flat: Vec<i32> = nest([0, 1, 2, 3, 4, 5].into_iter(), |k| {
            map.get(&k).map(|v| v.iter().copied())
        })
        .collect();
        assert_eq!(flat, vec![10, 40, 41]);
    }

    #[test]
    fn test_empty_primary() {
        let flat: Vec<i32> = nest(std::iter::empty::<i32>(), |_| {
            Some(std::iter::once(1))
        })
        .collect();
        assert!(flat.is_empty());
    }

    #[test]
    fn test_is_lazy() {
        use std::cell::Cell;

        let pulled = Cell::new(0usize);
        let mut it = nest((0..100).inspect(|_| pulled.set(pulled.get() + 1)), |k| {
            Some(std::iter::repeat(k).take(2))
        });
        assert_eq!(it.next(), Some(0));
        assert_eq!(it.next(), Some(0));
        assert_eq!(it.next(), Some(1));
        // Three items pulled only two primary keys.
        assert_eq!(pulled.get(), 2);
    }
}
