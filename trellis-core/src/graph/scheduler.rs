//! Update Scheduler
//!
//! The scheduler decides when and in which order eager subscribers re-run.
//!
//! # Algorithm
//!
//! 1. A cell write notifies its subscribers synchronously. Each eager
//!    subscriber is inserted into the pending set, keyed by its ID, so
//!    re-enqueuing an already pending subscriber is a no-op.
//! 2. The first insertion outside a batch requests a flush through the
//!    configured tick driver. Without a driver the host calls [`flush`] or
//!    awaits [`next_tick`].
//! 3. A flush runs in passes. Each pass takes the whole pending set, sorts
//!    it by subscriber ID (creation order, so parents run before the
//!    children they created) and runs every entry once.
//! 4. Subscribers invalidated while a pass is running are collected into the
//!    next pass of the same flush. A subscriber still waiting in the current
//!    pass is not queued again.
//! 5. The number of passes is bounded. Effects that keep re-triggering each
//!    other past the ceiling get reported once as a fatal scheduling error
//!    and the remaining work is dropped, so the flush always terminates.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;

use crate::config;
use crate::error::{Error, ErrorContext};
use crate::reactive::boundary;
use crate::reactive::{Reactive, SubscriberId};

/// Counters describing scheduler activity on the current thread.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushStats {
    /// Flushes that ran at least one pass.
    pub flushes: u64,
    /// Subscriber runs performed by flushes.
    pub effect_runs: u64,
    /// Flushes aborted by the iteration ceiling.
    pub aborted: u64,
}

#[derive(Default)]
struct SchedulerState {
    /// Work for the next pass, in insertion order.
    pending: IndexMap<SubscriberId, Weak<dyn Reactive>>,

    /// The pass currently executing, sorted so `pop` yields the lowest ID.
    running: IndexMap<SubscriberId, Weak<dyn Reactive>>,

    flushing: bool,
    flush_requested: bool,
    batch_depth: usize,
    stats: FlushStats,
}

thread_local! {
    static STATE: RefCell<SchedulerState> = RefCell::new(SchedulerState::default());
}

/// Queue an eager subscriber for the next flush.
pub fn enqueue(reactive: &Rc<dyn Reactive>) {
    if reactive.is_disposed() {
        return;
    }
    let id = reactive.subscriber_id();

    let request_tick = STATE.with(|state| {
        let mut state = state.borrow_mut();
        if state.pending.contains_key(&id) || state.running.contains_key(&id) {
            return false;
        }
        state.pending.insert(id, Rc::downgrade(reactive));
        tracing::trace!(subscriber = %id, "enqueued");

        if state.flushing || state.batch_depth > 0 || state.flush_requested {
            return false;
        }
        state.flush_requested = true;
        true
    });

    if request_tick {
        let config = config::current();
        if let Some(driver) = config.tick_driver() {
            driver();
        }
    }
}

/// Drop a subscriber from the queue. Used on disposal.
pub fn dequeue(id: SubscriberId) {
    let _ = STATE.try_with(|state| {
        if let Ok(mut state) = state.try_borrow_mut() {
            state.pending.shift_remove(&id);
            state.running.shift_remove(&id);
        }
    });
}

/// Run every pending subscriber now.
///
/// Calling `flush` while a flush is already running is a no-op: the outer
/// flush picks up any new work in its next pass.
pub fn flush() {
    let entered = STATE.with(|state| {
        let mut state = state.borrow_mut();
        if state.flushing {
            return false;
        }
        state.flushing = true;
        state.flush_requested = false;
        true
    });
    if !entered {
        return;
    }

    struct FlushGuard;

    impl Drop for FlushGuard {
        fn drop(&mut self) {
            STATE.with(|state| {
                let mut state = state.borrow_mut();
                state.flushing = false;
                state.running.clear();
            });
        }
    }

    let _guard = FlushGuard;
    let limit = config::current().max_flush_iterations();
    let span = tracing::debug_span!("flush", limit);
    let _enter = span.enter();

    let mut passes = 0usize;
    let mut runs = 0u64;

    while begin_pass() {
        passes += 1;
        if passes > limit {
            let dropped = STATE.with(|state| {
                let mut state = state.borrow_mut();
                let dropped = state.pending.len() + state.running.len();
                state.pending.clear();
                state.running.clear();
                state.stats.aborted += 1;
                dropped
            });
            tracing::error!(limit, dropped, "flush aborted after exceeding iteration ceiling");
            boundary::report(&Error::FlushLimitExceeded { limit }, ErrorContext::Scheduler);
            break;
        }

        while let Some(reactive) = next_in_pass() {
            if reactive.is_disposed() {
                continue;
            }
            reactive.run();
            runs += 1;
        }
    }

    if passes > 0 {
        STATE.with(|state| {
            let mut state = state.borrow_mut();
            state.stats.flushes += 1;
            state.stats.effect_runs += runs;
        });
        tracing::debug!(passes, runs, "flush complete");
    }
}

/// Move the pending set into the running pass. Returns `false` when idle.
fn begin_pass() -> bool {
    STATE.with(|state| {
        let mut state = state.borrow_mut();
        if state.pending.is_empty() {
            return false;
        }
        let mut pass = std::mem::take(&mut state.pending);
        pass.sort_unstable_by(|a, _, b, _| b.cmp(a));
        state.running = pass;
        true
    })
}

fn next_in_pass() -> Option<Rc<dyn Reactive>> {
    loop {
        let (_, weak) = STATE.with(|state| state.borrow_mut().running.pop())?;
        if let Some(reactive) = weak.upgrade() {
            return Some(reactive);
        }
    }
}

/// Run `f` with flushing suppressed, then flush once.
///
/// Every write inside `f`, across any number of cells, is covered by a
/// single flush when the outermost batch exits. Batches nest.
pub fn batch<T>(f: impl FnOnce() -> T) -> T {
    STATE.with(|state| state.borrow_mut().batch_depth += 1);

    struct BatchGuard;

    impl Drop for BatchGuard {
        fn drop(&mut self) {
            let should_flush = STATE.with(|state| {
                let mut state = state.borrow_mut();
                state.batch_depth -= 1;
                state.batch_depth == 0 && !state.flushing && !state.pending.is_empty()
            });

            if should_flush {
                tracing::debug!("batch closed; flushing");
                flush();
            }
        }
    }

    let _guard = BatchGuard;
    f()
}

/// Whether a batch scope is open.
pub fn is_batching() -> bool {
    STATE.with(|state| state.borrow().batch_depth > 0)
}

/// Whether a flush is currently executing.
pub fn is_flushing() -> bool {
    STATE.with(|state| state.borrow().flushing)
}

/// Whether any subscriber is waiting for a flush.
pub fn has_pending() -> bool {
    STATE.with(|state| !state.borrow().pending.is_empty())
}

/// Number of subscribers waiting for the next pass.
pub fn pending_count() -> usize {
    STATE.with(|state| state.borrow().pending.len())
}

/// Scheduler counters for the current thread.
pub fn stats() -> FlushStats {
    STATE.with(|state| state.borrow().stats)
}

/// Resolve once pending work has been flushed.
///
/// Yields to the executor first so a flush scheduled by the tick driver gets
/// a chance to run, then performs any flush that is still outstanding.
pub async fn next_tick() {
    tokio::task::yield_now().await;
    if has_pending() && !is_flushing() {
        flush();
    }
}
