//! End-to-end scenarios run identically against every backend.
//!
//! Each scenario takes a fresh index from a factory, so the same
//! assertions exercise the single-permutation bitset index, the
//! multi-permutation index and the trie. The buffered wrapper gets its
//! own pass at the end through its read-handle surface.

use std::collections::BTreeSet;

use containment_index::{
    BufferedIndex, CacheEntry, ContainmentIndex, MultiPermutationIndex, SimpleBitSetIndex,
    UbtIndex, Universe,
};

type Entry = CacheEntry<u32>;

fn universe() -> Universe<u32> {
    Universe::new(0u32..=10).expect("non-empty universe")
}

fn entry(universe: &Universe<u32>, elements: &[u32], tag: u32) -> Entry {
    CacheEntry::new(universe, elements.iter().copied(), tag).expect("elements in universe")
}

fn tags<'a, I: Iterator<Item = &'a Entry>>(entries: I) -> Vec<u32> {
    let mut tags: Vec<u32> = entries.map(|e| *e.tag()).collect();
    tags.sort_unstable();
    tags
}

fn run_scenarios<I, F>(make: F)
where
    I: ContainmentIndex<Entry>,
    F: Fn(&Universe<u32>) -> I,
{
    empty_index(&make);
    empty_set_entry(&make);
    idempotent_add(&make);
    one_subset(&make);
    one_superset(&make);
    intersecting_subsets(&make);
    nested_subsets(&make);
    nested_supersets(&make);
    add_then_remove(&make);
    bucketed_entries(&make);
    deterministic_smoke(&make);
}

fn empty_index<I, F>(make: &F)
where
    I: ContainmentIndex<Entry>,
    F: Fn(&Universe<u32>) -> I,
{
    let u = universe();
    let index = make(&u);
    let q = entry(&u, &[1, 2, 3], 0);
    let empty = entry(&u, &[], 1);

    assert_eq!(index.len(), 0);
    assert!(!index.contains(&empty));
    assert_eq!(index.subsets(&q).unwrap().count(), 0);
    assert_eq!(index.supersets(&q).unwrap().count(), 0);
    assert_eq!(index.subsets(&empty).unwrap().count(), 0);
    assert_eq!(index.supersets(&empty).unwrap().count(), 0);
}

fn empty_set_entry<I, F>(make: &F)
where
    I: ContainmentIndex<Entry>,
    F: Fn(&Universe<u32>) -> I,
{
    let u = universe();
    let mut index = make(&u);
    let empty = entry(&u, &[], 0);
    index.add(empty.clone()).unwrap();

    assert_eq!(tags(index.subsets(&empty).unwrap()), vec![0]);
    assert_eq!(tags(index.supersets(&empty).unwrap()), vec![0]);

    let wide = entry(&u, &[1, 2, 3, 4], 1);
    index.add(wide.clone()).unwrap();

    assert_eq!(tags(index.subsets(&wide).unwrap()), vec![0, 1]);
    assert_eq!(index.num_subsets(&wide).unwrap(), 2);
    assert_eq!(tags(index.supersets(&empty).unwrap()), vec![0, 1]);
    assert_eq!(index.num_supersets(&empty).unwrap(), 2);
}

fn idempotent_add<I, F>(make: &F)
where
    I: ContainmentIndex<Entry>,
    F: Fn(&Universe<u32>) -> I,
{
    let u = universe();
    let mut index = make(&u);
    let e = entry(&u, &[1, 2, 3], 0);

    index.add(e.clone()).unwrap();
    assert_eq!(index.len(), 1);
    index.add(e.clone()).unwrap();
    assert_eq!(index.len(), 1);
    assert_eq!(index.num_subsets(&e).unwrap(), 1);
    assert_eq!(index.num_supersets(&e).unwrap(), 1);
}

fn one_subset<I, F>(make: &F)
where
    I: ContainmentIndex<Entry>,
    F: Fn(&Universe<u32>) -> I,
{
    let u = universe();
    let mut index = make(&u);
    index.add(entry(&u, &[1, 2], 0)).unwrap();

    let q = entry(&u, &[1, 2, 3], 1);
    assert_eq!(tags(index.subsets(&q).unwrap()), vec![0]);
    assert_eq!(index.num_subsets(&q).unwrap(), 1);

    let disjoint = entry(&u, &[4, 5], 2);
    assert_eq!(index.subsets(&disjoint).unwrap().count(), 0);
}

fn one_superset<I, F>(make: &F)
where
    I: ContainmentIndex<Entry>,
    F: Fn(&Universe<u32>) -> I,
{
    let u = universe();
    let mut index = make(&u);
    index.add(entry(&u, &[1, 2, 3], 0)).unwrap();

    let q = entry(&u, &[1, 2], 1);
    assert_eq!(tags(index.supersets(&q).unwrap()), vec![0]);
    assert_eq!(index.num_supersets(&q).unwrap(), 1);

    let outside = entry(&u, &[1, 4], 2);
    assert_eq!(index.supersets(&outside).unwrap().count(), 0);
}

fn intersecting_subsets<I, F>(make: &F)
where
    I: ContainmentIndex<Entry>,
    F: Fn(&Universe<u32>) -> I,
{
    let u = universe();
    let mut index = make(&u);
    index.add(entry(&u, &[1, 2], 0)).unwrap();
    index.add(entry(&u, &[2, 3], 1)).unwrap();

    let q = entry(&u, &[1, 2, 3, 4], 2);
    assert_eq!(tags(index.subsets(&q).unwrap()), vec![0, 1]);
    assert_eq!(index.num_subsets(&q).unwrap(), 2);
}

fn nested_subsets<I, F>(make: &F)
where
    I: ContainmentIndex<Entry>,
    F: Fn(&Universe<u32>) -> I,
{
    let u = universe();
    let mut index = make(&u);
    index.add(entry(&u, &[1], 0)).unwrap();
    index.add(entry(&u, &[1, 2], 1)).unwrap();

    let q = entry(&u, &[1, 2, 3, 4], 2);
    assert_eq!(tags(index.subsets(&q).unwrap()), vec![0, 1]);
    assert_eq!(index.num_subsets(&q).unwrap(), 2);
    assert_eq!(tags(index.supersets(&entry(&u, &[1], 3)).unwrap()), vec![0, 1]);
}

fn nested_supersets<I, F>(make: &F)
where
    I: ContainmentIndex<Entry>,
    F: Fn(&Universe<u32>) -> I,
{
    let u = universe();
    let mut index = make(&u);
    index.add(entry(&u, &[1, 2, 3], 0)).unwrap();
    index.add(entry(&u, &[1, 2, 3, 4, 5], 1)).unwrap();

    let q = entry(&u, &[1, 2], 2);
    assert_eq!(tags(index.supersets(&q).unwrap()), vec![0, 1]);
    assert_eq!(index.num_supersets(&q).unwrap(), 2);
    assert_eq!(tags(index.subsets(&entry(&u, &[1, 2, 3, 4, 5], 3)).unwrap()), vec![0, 1]);
}

fn add_then_remove<I, F>(make: &F)
where
    I: ContainmentIndex<Entry>,
    F: Fn(&Universe<u32>) -> I,
{
    let u = universe();
    let mut index = make(&u);
    let e = entry(&u, &[2, 4, 6], 0);

    index.add(e.clone()).unwrap();
    assert!(index.contains(&e));
    index.remove(&e).unwrap();
    assert!(!index.contains(&e));
    assert_eq!(index.len(), 0);
    assert_eq!(index.subsets(&e).unwrap().count(), 0);
    assert_eq!(index.supersets(&e).unwrap().count(), 0);
}

fn bucketed_entries<I, F>(make: &F)
where
    I: ContainmentIndex<Entry>,
    F: Fn(&Universe<u32>) -> I,
{
    let u = universe();
    let mut index = make(&u);
    index.add(entry(&u, &[5], 0)).unwrap();
    index.add(entry(&u, &[5], 1)).unwrap();

    assert_eq!(index.len(), 2);
    let q = entry(&u, &[5], 9);
    assert_eq!(tags(index.supersets(&q).unwrap()), vec![0, 1]);
    assert_eq!(tags(index.subsets(&entry(&u, &[5, 6], 9)).unwrap()), vec![0, 1]);
    assert_eq!(tags(index.iter_all()), vec![0, 1]);
}

/// A few hundred deterministic mixed operations, verified against a
/// naive model at checkpoints.
fn deterministic_smoke<I, F>(make: &F)
where
    I: ContainmentIndex<Entry>,
    F: Fn(&Universe<u32>) -> I,
{
    let u = universe();
    let mut index = make(&u);
    let mut model: Vec<(BTreeSet<u32>, u32)> = Vec::new();

    let mut state = 0x9e3779b97f4a7c15u64;
    let mut step = |state: &mut u64| {
        *state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        *state >> 33
    };

    for round in 0..300u64 {
        let bits = step(&mut state);
        let set: BTreeSet<u32> = (0..11).filter(|i| bits & (1 << i) != 0).collect();
        let tag = (step(&mut state) % 2) as u32;
        let elements: Vec<u32> = set.iter().copied().collect();
        let e = entry(&u, &elements, tag);

        if step(&mut state) % 3 == 0 {
            index.remove(&e).unwrap();
            model.retain(|(s, t)| *s != set || *t != tag);
        } else {
            index.add(e).unwrap();
            if !model.iter().any(|(s, t)| *s == set && *t == tag) {
                model.push((set, tag));
            }
        }

        if round % 50 == 0 {
            assert_eq!(index.len(), model.len());
            let probe: BTreeSet<u32> = (0..11).step_by(2).collect();
            let probe_elements: Vec<u32> = probe.iter().copied().collect();
            let q = entry(&u, &probe_elements, 9);
            let expected_subsets =
                model.iter().filter(|(s, _)| s.is_subset(&probe)).count();
            let expected_supersets =
                model.iter().filter(|(s, _)| probe.is_subset(s)).count();
            assert_eq!(index.num_subsets(&q).unwrap(), expected_subsets);
            assert_eq!(index.num_supersets(&q).unwrap(), expected_supersets);
        }
    }
}

#[test]
fn scenarios_simple_bitset() {
    run_scenarios(|u| SimpleBitSetIndex::<Entry>::new(u.len()));
}

#[test]
fn scenarios_simple_bitset_shuffled_permutation() {
    run_scenarios(|u| {
        let perms = u.permutations(99, 2);
        SimpleBitSetIndex::<Entry>::with_permutation(&perms[1])
    });
}

#[test]
fn scenarios_multi_permutation() {
    for k in [1usize, 3] {
        run_scenarios(|u| {
            let perms = u.permutations(7, k);
            MultiPermutationIndex::new(u.len(), &perms).expect("valid permutations")
        });
    }
}

#[test]
fn scenarios_ubt() {
    run_scenarios(|u| UbtIndex::<Entry>::new(u.len()));
}

#[test]
fn scenarios_buffered_wrapper() {
    let u = universe();
    let index = BufferedIndex::new(SimpleBitSetIndex::<Entry>::new(u.len()), 4);

    index.add(entry(&u, &[1], 0)).unwrap();
    index.add(entry(&u, &[1, 2], 1)).unwrap();
    index.add(entry(&u, &[5], 2)).unwrap();
    index.add(entry(&u, &[5], 3)).unwrap();

    let q = entry(&u, &[1, 2, 3, 4], 9);
    {
        let handle = index.read();
        assert_eq!(handle.num_subsets(&q).unwrap(), 2);
        let mut seen: Vec<u32> = handle.subsets(&q).unwrap().map(|e| *e.tag()).collect();
        seen.sort_unstable();
        assert_eq!(seen, vec![0, 1]);
        assert_eq!(handle.num_supersets(&entry(&u, &[5], 9)).unwrap(), 2);
        assert_eq!(handle.len(), 4);
    }

    index.remove(&entry(&u, &[5], 2)).unwrap();
    index.flush_now();

    let handle = index.read();
    assert_eq!(handle.len(), 3);
    assert_eq!(handle.num_supersets(&entry(&u, &[5], 9)).unwrap(), 1);
    assert!(handle.contains(&entry(&u, &[1, 2], 1)));
    assert!(!handle.contains(&entry(&u, &[5], 2)));
}
