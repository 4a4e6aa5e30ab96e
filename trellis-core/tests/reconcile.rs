//! Property and fixture tests for keyed-list reconciliation.

mod common;

use std::time::{Duration, Instant};

use common::init_test_logging;
use proptest::prelude::*;
use trellis_core::{longest_increasing_subsequence, reconcile, KeyedList, Patch, VecHost};

/// Lexicographically smallest longest increasing subsequence, by exhaustion.
fn brute_force_lis(positions: &[isize]) -> Vec<usize> {
    let n = positions.len();
    let mut best: Vec<usize> = Vec::new();
    for mask in 0u32..(1 << n) {
        let picked: Vec<usize> = (0..n).filter(|i| mask & (1 << i) != 0).collect();
        let valid = picked.iter().all(|&i| positions[i] >= 0)
            && picked.windows(2).all(|w| positions[w[0]] < positions[w[1]]);
        if !valid {
            continue;
        }
        if picked.len() > best.len() || (picked.len() == best.len() && picked < best) {
            best = picked;
        }
    }
    best
}

fn proptest_config(cases: u32) -> ProptestConfig {
    ProptestConfig {
        cases,
        ..ProptestConfig::default()
    }
}

proptest! {
    #![proptest_config(proptest_config(400))]

    /// The result is strictly increasing, skips `-1`, and is maximal.
    #[test]
    fn lis_matches_brute_force(positions in prop::collection::vec(-1isize..12, 0..11)) {
        init_test_logging();
        let result = longest_increasing_subsequence(&positions);

        prop_assert!(result.windows(2).all(|w| w[0] < w[1]));
        prop_assert!(result.iter().all(|&i| positions[i] >= 0));
        prop_assert!(result.windows(2).all(|w| positions[w[0]] < positions[w[1]]));
        prop_assert_eq!(result, brute_force_lis(&positions));
    }

    /// Applying an update to a host always yields the new key order and
    /// creates exactly the new keys.
    #[test]
    fn keyed_update_reaches_target(
        old in Just((0..12).collect::<Vec<u32>>()).prop_shuffle(),
        new in prop::collection::vec(0u32..20, 0..16),
    ) {
        init_test_logging();
        let mut new = new;
        let mut seen = std::collections::HashSet::new();
        new.retain(|k| seen.insert(*k));

        let mut host = VecHost::<u32>::new();
        let mut list = KeyedList::new();
        list.update(&mut host, &old).unwrap();

        let stats = list.update(&mut host, &new).unwrap();
        prop_assert_eq!(host.keys(), new.clone());

        let fresh = new.iter().filter(|k| !old.contains(k)).count();
        let gone = old.iter().filter(|k| !new.contains(k)).count();
        prop_assert_eq!(stats.created, fresh);
        prop_assert_eq!(stats.removed, gone);
        prop_assert_eq!(stats.kept + stats.moved + stats.created, new.len());
    }
}

#[test]
fn documented_fixtures() {
    init_test_logging();
    let cases: [(&[isize], &[usize]); 6] = [
        (&[], &[]),
        (&[5], &[0]),
        (&[-1, 0, 1, -1, 2], &[1, 2, 4]),
        (&[1, 2, 3, 0], &[0, 1, 2]),
        (&[0, -1, 1], &[0, 2]),
        (&[-1, -1, -1, -1], &[]),
    ];
    for (input, expected) in cases {
        assert_eq!(longest_increasing_subsequence(input), expected, "input {input:?}");
    }

    let mixed = [2, 0, 1, 4, 3];
    let result = longest_increasing_subsequence(&mixed);
    assert_eq!(result.len(), 3);
    assert!(result.windows(2).all(|w| mixed[w[0]] < mixed[w[1]]));
}

#[test]
fn reversed_sequence_retains_one() {
    init_test_logging();
    let reversed: Vec<isize> = (0..50).rev().collect();
    assert_eq!(longest_increasing_subsequence(&reversed), vec![0]);

    let old: Vec<u32> = (0..50).collect();
    let new: Vec<u32> = old.iter().rev().copied().collect();
    let plan = reconcile(&old, &new).unwrap();
    assert_eq!(plan.retained(), 1);
    assert_eq!(
        plan.patches(&old, &new)
            .iter()
            .filter(|p| matches!(p, Patch::Move { .. }))
            .count(),
        49
    );
}

#[test]
fn thousand_element_reconcile_is_fast() {
    init_test_logging();
    let old: Vec<u32> = (0..1000).collect();
    let mut new = old.clone();
    // Interleave a rotation with scattered swaps.
    new.rotate_left(137);
    for i in (0..1000).step_by(7) {
        new.swap(i, 999 - i);
    }

    let start = Instant::now();
    let plan = reconcile(&old, &new).unwrap();
    let elapsed = start.elapsed();

    assert_eq!(plan.positions.len(), 1000);
    assert!(plan.retained() > 0);
    assert!(
        elapsed < Duration::from_millis(50),
        "reconcile took {elapsed:?}"
    );
}
