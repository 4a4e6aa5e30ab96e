use super::Reconciliation;

/// One host operation produced by reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Patch<K> {
    /// Detach and drop the node for `key`.
    Remove { key: K },

    /// Build a node for `key` and insert it before `before`, or at the end.
    Create {
        key: K,
        index: usize,
        before: Option<K>,
    },

    /// Move the existing node for `key` before `before`, or to the end.
    Move {
        key: K,
        index: usize,
        before: Option<K>,
    },
}

impl<K> Patch<K> {
    pub fn key(&self) -> &K {
        match self {
            Patch::Remove { key } | Patch::Create { key, .. } | Patch::Move { key, .. } => key,
        }
    }
}

/// Expand a reconciliation into an ordered list of patches.
///
/// Removals come first, in old order. The rest are emitted walking the new
/// list from the back, so every anchor is already in its final place when
/// something is inserted before it.
pub fn plan_patches<K: Clone>(plan: &Reconciliation, old: &[K], new: &[K]) -> Vec<Patch<K>> {
    let mut patches: Vec<Patch<K>> = plan
        .removed_old_indices
        .iter()
        .filter_map(|&i| old.get(i))
        .map(|key| Patch::Remove { key: key.clone() })
        .collect();

    let mut retained = plan.retained_new_indices.iter().rev().peekable();

    for (index, key) in new.iter().enumerate().rev() {
        if retained.next_if(|&&r| r == index).is_some() {
            continue;
        }
        let before = new.get(index + 1).cloned();
        let key = key.clone();
        let patch = match plan.positions.get(index) {
            Some(&p) if p >= 0 => Patch::Move { key, index, before },
            _ => Patch::Create { key, index, before },
        };
        patches.push(patch);
    }

    patches
}
