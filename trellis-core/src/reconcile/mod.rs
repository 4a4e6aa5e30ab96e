//! Keyed List Reconciliation
//!
//! Given the keys of a rendered list before and after an update, work out
//! the smallest set of host operations that turns one into the other.
//!
//! # Algorithm
//!
//! 1. Map every new key to its old index, or `-1` if the key is new. This is
//!    the `positions` array.
//! 2. The longest increasing subsequence of `positions` is the largest group
//!    of items that are already in the right relative order. Those stay put.
//! 3. Old keys missing from the new list are removed first. Then the new
//!    list is walked back to front: every item outside the subsequence is
//!    created or moved in front of its successor, which is already in place.

mod lis;
mod list;
mod patch;

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

pub use lis::longest_increasing_subsequence;
pub use list::{keyed_list, KeyedList, ListHost, PatchStats, VecHost, VecNode};
pub use patch::{plan_patches, Patch};

use crate::error::{InvalidInput, Result};

/// How an old key sequence maps onto a new one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    /// Old index of each new item, `-1` for items that did not exist.
    pub positions: Vec<isize>,

    /// New indices of the items that keep their node without moving.
    pub retained_new_indices: Vec<usize>,

    /// Old indices of the items that are gone.
    pub removed_old_indices: Vec<usize>,
}

impl Reconciliation {
    /// Number of items that need neither a create nor a move.
    pub fn retained(&self) -> usize {
        self.retained_new_indices.len()
    }

    /// Turn this reconciliation into host operations.
    pub fn patches<K: Clone>(&self, old: &[K], new: &[K]) -> Vec<Patch<K>> {
        plan_patches(self, old, new)
    }
}

fn index_keys<K: Eq + Hash + Debug>(keys: &[K]) -> Result<HashMap<&K, usize>> {
    let mut index = HashMap::with_capacity(keys.len());
    for (i, key) in keys.iter().enumerate() {
        if index.insert(key, i).is_some() {
            return Err(InvalidInput::DuplicateKey {
                key: format!("{key:?}"),
                index: i,
            }
            .into());
        }
    }
    Ok(index)
}

/// Reconcile two key sequences.
///
/// Fails with [`InvalidInput::DuplicateKey`] if either sequence repeats a
/// key; the position reported is the second occurrence.
///
/// # Example
///
/// ```rust
/// use trellis_core::reconcile;
///
/// let plan = reconcile(&["a", "b", "c"], &["c", "a", "d"]).unwrap();
/// assert_eq!(plan.positions, vec![2, 0, -1]);
/// assert_eq!(plan.retained_new_indices, vec![0]);
/// assert_eq!(plan.removed_old_indices, vec![1]);
/// ```
pub fn reconcile<K: Eq + Hash + Debug>(old: &[K], new: &[K]) -> Result<Reconciliation> {
    let old_index = index_keys(old)?;
    let new_index = index_keys(new)?;

    let positions: Vec<isize> = new
        .iter()
        .map(|key| old_index.get(key).map_or(-1, |&i| i as isize))
        .collect();

    let removed_old_indices = old
        .iter()
        .enumerate()
        .filter(|(_, key)| !new_index.contains_key(key))
        .map(|(i, _)| i)
        .collect();

    let retained_new_indices = longest_increasing_subsequence(&positions);

    Ok(Reconciliation {
        positions,
        retained_new_indices,
        removed_old_indices,
    })
}
