//! Dependency Relation
//!
//! The bidirectional edge set between cells and subscribers. This is a plain
//! relation: it stores identifiers only and never owns a subscriber, so a
//! disposed effect cannot be kept alive by the cells it once read.

use std::collections::HashMap;

use indexmap::IndexSet;
use smallvec::SmallVec;

use crate::reactive::{CellId, SubscriberId};

/// Edges between cells and the subscribers that read them.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    /// Cell -> subscribers that read it during their latest run.
    subscribers: HashMap<CellId, IndexSet<SubscriberId>>,

    /// Subscriber -> cells it read during its latest run.
    dependencies: HashMap<SubscriberId, SmallVec<[CellId; 8]>>,
}

impl DependencyGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an edge: `subscriber` read `cell`.
    ///
    /// Returns `false` if the edge already existed.
    pub fn add_edge(&mut self, cell: CellId, subscriber: SubscriberId) -> bool {
        let inserted = self.subscribers.entry(cell).or_default().insert(subscriber);
        if inserted {
            self.dependencies.entry(subscriber).or_default().push(cell);
        }
        inserted
    }

    /// Remove every edge leaving `subscriber`.
    ///
    /// Returns the cells it had been subscribed to.
    pub fn clear_subscriber(&mut self, subscriber: SubscriberId) -> SmallVec<[CellId; 8]> {
        let cells = self.dependencies.remove(&subscriber).unwrap_or_default();
        for cell in &cells {
            if let Some(subs) = self.subscribers.get_mut(cell) {
                subs.shift_remove(&subscriber);
                if subs.is_empty() {
                    self.subscribers.remove(cell);
                }
            }
        }
        cells
    }

    /// Remove a cell and every edge pointing at it.
    pub fn remove_cell(&mut self, cell: CellId) {
        if let Some(subs) = self.subscribers.remove(&cell) {
            for subscriber in subs {
                if let Some(cells) = self.dependencies.get_mut(&subscriber) {
                    cells.retain(|c| *c != cell);
                }
            }
        }
    }

    /// Subscribers of `cell`, in subscription order.
    pub fn subscribers_of(&self, cell: CellId) -> Vec<SubscriberId> {
        self.subscribers
            .get(&cell)
            .map(|subs| subs.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Cells `subscriber` currently depends on.
    pub fn dependencies_of(&self, subscriber: SubscriberId) -> Vec<CellId> {
        self.dependencies
            .get(&subscriber)
            .map(|cells| cells.to_vec())
            .unwrap_or_default()
    }

    pub fn subscriber_count(&self, cell: CellId) -> usize {
        self.subscribers.get(&cell).map_or(0, IndexSet::len)
    }

    pub fn dependency_count(&self, subscriber: SubscriberId) -> usize {
        self.dependencies.get(&subscriber).map_or(0, SmallVec::len)
    }

    /// Total number of edges.
    pub fn edge_count(&self) -> usize {
        self.subscribers.values().map(IndexSet::len).sum()
    }
}
