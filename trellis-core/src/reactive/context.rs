//! Reactive Context
//!
//! The reactive context tracks which subscriber is currently running.
//! This enables automatic dependency tracking: when a cell is read,
//! the current subscriber is recorded as one of its dependents.
//!
//! # Implementation
//!
//! We use a thread-local stack of frames. Running an effect or computed
//! pushes a frame; the returned guard pops it when dropped, including when
//! the run unwinds out of a panic, so a failing binding never leaves a stale
//! frame behind.
//!
//! Frames can also be non-tracking. [`untrack`] pushes one so that reads
//! inside it establish no dependencies, even while an effect is running.

use std::cell::RefCell;

use smallvec::SmallVec;

use super::subscriber::{CellId, SubscriberId};

thread_local! {
    static CONTEXT_STACK: RefCell<Vec<ContextEntry>> = const { RefCell::new(Vec::new()) };
}

/// One frame of the tracking stack.
#[derive(Debug, Clone)]
struct ContextEntry {
    /// The running subscriber, or `None` for an untracked frame.
    subscriber_id: Option<SubscriberId>,
    /// Cells read during this frame, deduplicated, in first-read order.
    dependencies: SmallVec<[CellId; 8]>,
}

/// Guard that pops the context when dropped.
#[must_use = "the context is exited as soon as the guard is dropped"]
pub struct ReactiveContext {
    subscriber_id: Option<SubscriberId>,
}

impl ReactiveContext {
    /// Enter a new reactive context for the given subscriber.
    ///
    /// While this context is active, any cells that are read will
    /// register the subscriber as a dependent.
    pub fn enter(subscriber_id: SubscriberId) -> Self {
        Self::push(Some(subscriber_id))
    }

    /// Enter a frame in which reads are not tracked.
    pub fn untracked() -> Self {
        Self::push(None)
    }

    fn push(subscriber_id: Option<SubscriberId>) -> Self {
        CONTEXT_STACK.with(|stack| {
            stack.borrow_mut().push(ContextEntry {
                subscriber_id,
                dependencies: SmallVec::new(),
            });
        });

        Self { subscriber_id }
    }

    /// Check if reads are currently being tracked.
    pub fn is_active() -> bool {
        Self::current_subscriber().is_some()
    }

    /// Get the current subscriber ID, if reads are being tracked.
    pub fn current_subscriber() -> Option<SubscriberId> {
        CONTEXT_STACK.with(|stack| stack.borrow().last().and_then(|entry| entry.subscriber_id))
    }

    /// Number of frames on the stack.
    pub fn depth() -> usize {
        CONTEXT_STACK.with(|stack| stack.borrow().len())
    }

    /// Record a read of the given cell in the current frame.
    ///
    /// Returns the subscriber to link the cell to, or `None` if the read is
    /// untracked or the cell was already recorded during this frame.
    pub fn track_dependency(cell_id: CellId) -> Option<SubscriberId> {
        CONTEXT_STACK.with(|stack| {
            let mut stack = stack.borrow_mut();
            let entry = stack.last_mut()?;
            let subscriber_id = entry.subscriber_id?;
            if entry.dependencies.contains(&cell_id) {
                return None;
            }
            entry.dependencies.push(cell_id);
            Some(subscriber_id)
        })
    }

    /// Get the dependencies collected in the current frame.
    pub fn get_dependencies() -> Vec<CellId> {
        CONTEXT_STACK.with(|stack| {
            stack
                .borrow()
                .last()
                .map(|entry| entry.dependencies.to_vec())
                .unwrap_or_default()
        })
    }
}

impl Drop for ReactiveContext {
    fn drop(&mut self) {
        CONTEXT_STACK.with(|stack| {
            let popped = stack.borrow_mut().pop();

            if let Some(entry) = popped {
                debug_assert_eq!(
                    entry.subscriber_id, self.subscriber_id,
                    "ReactiveContext mismatch: expected {:?}, got {:?}",
                    self.subscriber_id, entry.subscriber_id
                );
            }
        });
    }
}

/// Run `f` without tracking any reads it performs.
pub fn untrack<T>(f: impl FnOnce() -> T) -> T {
    let _ctx = ReactiveContext::untracked();
    f()
}
