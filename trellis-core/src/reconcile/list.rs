//! Applying reconciliation to a host that owns real nodes.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::rc::Rc;

use indexmap::IndexMap;

use super::{reconcile, Patch};
use crate::error::Result;
use crate::reactive::{render_effect, untrack, EffectHandle};

/// The node operations a keyed list needs from its host.
pub trait ListHost<K> {
    /// Handle to a node owned by the host.
    type Node: Clone;

    /// Build a detached node for `key`, which will end up at `index`.
    fn create(&mut self, key: &K, index: usize) -> Self::Node;

    /// Insert or move `node` so it sits right before `anchor`. `None`
    /// appends.
    fn insert_before(&mut self, node: &Self::Node, anchor: Option<&Self::Node>);

    /// Detach `node`.
    fn remove(&mut self, node: &Self::Node);
}

impl<K, H: ListHost<K>> ListHost<K> for Rc<RefCell<H>> {
    type Node = H::Node;

    fn create(&mut self, key: &K, index: usize) -> Self::Node {
        self.borrow_mut().create(key, index)
    }

    fn insert_before(&mut self, node: &Self::Node, anchor: Option<&Self::Node>) {
        self.borrow_mut().insert_before(node, anchor);
    }

    fn remove(&mut self, node: &Self::Node) {
        self.borrow_mut().remove(node);
    }
}

/// Operation counts for one [`KeyedList::update`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PatchStats {
    pub created: usize,
    pub moved: usize,
    pub removed: usize,
    pub kept: usize,
}

impl PatchStats {
    /// Host operations performed.
    pub fn operations(&self) -> usize {
        self.created + self.moved + self.removed
    }
}

/// The key-to-node map of one rendered list, in rendered order.
///
/// The map lives outside the host so the same host can render several
/// lists, and outside the reactive graph so updating it tracks nothing.
#[derive(Debug)]
pub struct KeyedList<K, N> {
    nodes: IndexMap<K, N>,
}

impl<K, N> KeyedList<K, N>
where
    K: Clone + Eq + Hash + Debug,
    N: Clone,
{
    pub fn new() -> Self {
        Self {
            nodes: IndexMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Keys in rendered order.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.nodes.keys()
    }

    pub fn node(&self, key: &K) -> Option<&N> {
        self.nodes.get(key)
    }

    /// Patch `host` so it shows `keys`, reusing nodes by key.
    ///
    /// On a duplicate key nothing is touched and the error is returned.
    pub fn update<H>(&mut self, host: &mut H, keys: &[K]) -> Result<PatchStats>
    where
        H: ListHost<K, Node = N>,
    {
        let old: Vec<K> = self.nodes.keys().cloned().collect();
        let plan = reconcile(&old, keys)?;
        let mut stats = PatchStats {
            kept: plan.retained(),
            ..PatchStats::default()
        };

        for patch in plan.patches(&old, keys) {
            match patch {
                Patch::Remove { key } => {
                    if let Some(node) = self.nodes.shift_remove(&key) {
                        host.remove(&node);
                        stats.removed += 1;
                    }
                }
                Patch::Create { key, index, before } => {
                    let node = host.create(&key, index);
                    let anchor = before.as_ref().and_then(|k| self.nodes.get(k));
                    host.insert_before(&node, anchor);
                    self.nodes.insert(key, node);
                    stats.created += 1;
                }
                Patch::Move { key, before, .. } => {
                    if let Some(node) = self.nodes.get(&key) {
                        let anchor = before.as_ref().and_then(|k| self.nodes.get(k));
                        host.insert_before(node, anchor);
                        stats.moved += 1;
                    }
                }
            }
        }

        let mut nodes = std::mem::take(&mut self.nodes);
        self.nodes = keys
            .iter()
            .filter_map(|key| nodes.swap_remove_entry(key))
            .collect();

        tracing::trace!(
            created = stats.created,
            moved = stats.moved,
            removed = stats.removed,
            kept = stats.kept,
            "keyed list patched"
        );
        Ok(stats)
    }

    /// Remove every node from `host`.
    pub fn clear<H>(&mut self, host: &mut H)
    where
        H: ListHost<K, Node = N>,
    {
        for (_, node) in self.nodes.drain(..) {
            host.remove(&node);
        }
    }
}

impl<K, N> Default for KeyedList<K, N>
where
    K: Clone + Eq + Hash + Debug,
    N: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Node handle of a [`VecHost`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VecNode(u64);

/// An in-memory host: an ordered vector of labelled nodes.
///
/// Counts every operation so callers can check how much work a patch did.
#[derive(Debug)]
pub struct VecHost<K> {
    children: Vec<VecNode>,
    labels: HashMap<VecNode, K>,
    next_id: u64,
    stats: PatchStats,
}

impl<K: Clone> VecHost<K> {
    pub fn new() -> Self {
        Self {
            children: Vec::new(),
            labels: HashMap::new(),
            next_id: 0,
            stats: PatchStats::default(),
        }
    }

    /// Keys of the attached nodes, in order.
    pub fn keys(&self) -> Vec<K> {
        self.children
            .iter()
            .filter_map(|node| self.labels.get(node).cloned())
            .collect()
    }

    pub fn nodes(&self) -> &[VecNode] {
        &self.children
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Operations applied so far. `kept` is always zero.
    pub fn stats(&self) -> PatchStats {
        self.stats
    }

    fn position(&self, node: &VecNode) -> Option<usize> {
        self.children.iter().position(|n| n == node)
    }
}

impl<K: Clone> Default for VecHost<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Clone> ListHost<K> for VecHost<K> {
    type Node = VecNode;

    fn create(&mut self, key: &K, _index: usize) -> VecNode {
        let node = VecNode(self.next_id);
        self.next_id += 1;
        self.labels.insert(node, key.clone());
        self.stats.created += 1;
        node
    }

    fn insert_before(&mut self, node: &VecNode, anchor: Option<&VecNode>) {
        if let Some(current) = self.position(node) {
            self.children.remove(current);
            self.stats.moved += 1;
        }
        let at = anchor
            .and_then(|anchor| self.position(anchor))
            .unwrap_or(self.children.len());
        self.children.insert(at, *node);
    }

    fn remove(&mut self, node: &VecNode) {
        if let Some(current) = self.position(node) {
            self.children.remove(current);
            self.labels.remove(node);
            self.stats.removed += 1;
        }
    }
}

/// Render binding that keeps `host` in sync with the keys `source` returns.
///
/// `source` runs tracked; the host is patched untracked. A duplicate key is
/// reported with the `render` tag and leaves the host as it was.
pub fn keyed_list<K, F, H>(mut source: F, mut host: H) -> EffectHandle
where
    K: Clone + Eq + Hash + Debug + 'static,
    F: FnMut() -> Vec<K> + 'static,
    H: ListHost<K> + 'static,
{
    let mut list: KeyedList<K, H::Node> = KeyedList::new();
    render_effect(move || -> Result<()> {
        let keys = source();
        untrack(|| list.update(&mut host, &keys))?;
        Ok(())
    })
}
