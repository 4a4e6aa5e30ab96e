//! Reactive Runtime
//!
//! The runtime is the central coordinator that connects cells, computeds and
//! effects. It owns the dependency relation and the registry used to turn a
//! subscriber ID back into something that can run.
//!
//! # How It Works
//!
//! 1. When an effect or computed is created, it registers a weak reference
//!    with the runtime. Ownership stays with whoever created it.
//!
//! 2. When a cell is read inside a reactive context, the runtime records the
//!    edge in both directions.
//!
//! 3. When a cell's value changes, the runtime:
//!    a. Finds all subscribers of the cell
//!    b. Lazy subscribers (computeds) mark themselves dirty
//!    c. Eager subscribers (effects) are handed to the scheduler
//!
//! # Threading
//!
//! Everything here is thread-local. The graph is only ever touched from the
//! thread driving reads, writes and flushes, so no locking is needed. Borrows
//! of the runtime state are never held while user code runs.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use super::context::ReactiveContext;
use super::subscriber::{CellId, SubscriberId, SubscriberKind};
use crate::graph::{scheduler, DependencyGraph};

/// The capability set shared by every kind of subscriber.
///
/// The scheduler and runtime treat effects, watchers, render bindings and
/// computeds uniformly through this trait.
pub trait Reactive {
    /// Get the subscriber ID for this reactive value.
    fn subscriber_id(&self) -> SubscriberId;

    /// What kind of subscriber this is.
    fn kind(&self) -> SubscriberKind;

    /// Eager subscribers are scheduled when a dependency changes; lazy ones
    /// are only marked dirty.
    fn is_eager(&self) -> bool {
        self.kind().is_eager()
    }

    /// A dependency changed. Called synchronously at write time.
    fn mark_dirty(&self);

    /// Execute the subscriber. Never unwinds.
    fn run(&self);

    /// Stop the subscriber for good.
    fn dispose(&self);

    /// Whether [`dispose`](Reactive::dispose) has been called.
    fn is_disposed(&self) -> bool;

    /// Cells read during the latest run.
    fn dependencies(&self) -> Vec<CellId> {
        Runtime::dependencies_of(self.subscriber_id())
    }
}

#[derive(Default)]
struct RuntimeState {
    /// Subscriber IDs to weak references. Non-owning by construction.
    registry: HashMap<SubscriberId, Weak<dyn Reactive>>,
    graph: DependencyGraph,
}

thread_local! {
    static STATE: RefCell<RuntimeState> = RefCell::new(RuntimeState::default());
}

/// The reactive runtime for the current thread.
pub struct Runtime;

impl Runtime {
    /// Register a reactive value with the runtime.
    pub fn register(reactive: Weak<dyn Reactive>, id: SubscriberId) {
        STATE.with(|state| {
            state.borrow_mut().registry.insert(id, reactive);
        });
    }

    /// Unregister a reactive value and drop all of its edges.
    ///
    /// Safe to call from destructors running during thread teardown.
    pub fn unregister(id: SubscriberId) {
        let _ = STATE.try_with(|state| {
            if let Ok(mut state) = state.try_borrow_mut() {
                state.registry.remove(&id);
                state.graph.clear_subscriber(id);
            }
        });
    }

    /// Whether `id` is registered and can still receive notifications.
    pub fn is_registered(id: SubscriberId) -> bool {
        STATE.with(|state| state.borrow().registry.contains_key(&id))
    }

    /// Record a read of `cell` by the currently running subscriber.
    ///
    /// Called by cells on every read.
    pub fn track(cell: CellId) {
        if let Some(subscriber) = ReactiveContext::track_dependency(cell) {
            Self::add_dependency(cell, subscriber);
        }
    }

    /// Record that a subscriber depends on a cell.
    ///
    /// Reads by subscribers that are no longer registered (disposed while
    /// running) are ignored.
    pub fn add_dependency(cell: CellId, subscriber: SubscriberId) {
        STATE.with(|state| {
            let mut state = state.borrow_mut();
            if state.registry.contains_key(&subscriber) {
                state.graph.add_edge(cell, subscriber);
                tracing::trace!(%cell, %subscriber, "dependency tracked");
            }
        });
    }

    /// Remove all dependencies for a subscriber.
    ///
    /// Called before re-running a computation to clear stale dependencies.
    pub fn clear_dependencies(subscriber: SubscriberId) {
        STATE.with(|state| {
            state.borrow_mut().graph.clear_subscriber(subscriber);
        });
    }

    pub fn dependencies_of(subscriber: SubscriberId) -> Vec<CellId> {
        STATE.with(|state| state.borrow().graph.dependencies_of(subscriber))
    }

    pub fn subscriber_count(cell: CellId) -> usize {
        STATE.with(|state| state.borrow().graph.subscriber_count(cell))
    }

    /// A cell's owner went away; forget it.
    pub fn drop_cell(cell: CellId) {
        // Cells can be dropped during thread teardown after the state is gone.
        let _ = STATE.try_with(|state| {
            if let Ok(mut state) = state.try_borrow_mut() {
                state.graph.remove_cell(cell);
            }
        });
    }

    /// Notify all subscribers that a cell changed.
    ///
    /// This is the core update propagation mechanism. It runs synchronously
    /// at write time; eager subscribers are only enqueued here and execute
    /// at the next flush.
    pub fn notify_cell(cell: CellId) {
        let subscribers: Vec<Rc<dyn Reactive>> = STATE.with(|state| {
            let state = state.borrow();
            state
                .graph
                .subscribers_of(cell)
                .into_iter()
                .filter_map(|id| state.registry.get(&id).and_then(Weak::upgrade))
                .collect()
        });

        if subscribers.is_empty() {
            return;
        }

        tracing::trace!(%cell, count = subscribers.len(), "notifying subscribers");

        for reactive in subscribers {
            if reactive.is_disposed() {
                continue;
            }
            if reactive.is_eager() {
                scheduler::enqueue(&reactive);
            } else {
                reactive.mark_dirty();
            }
        }
    }
}
