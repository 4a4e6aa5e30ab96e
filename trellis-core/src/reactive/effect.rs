//! Effect Implementation
//!
//! An Effect is a side-effecting computation that runs whenever its
//! dependencies change.
//!
//! # How Effects Work
//!
//! 1. When created, the effect runs its function immediately to establish
//!    initial dependencies.
//!
//! 2. When any dependency changes, the effect is enqueued and re-runs at the
//!    next flush, at most once per pass no matter how many of its cells
//!    changed.
//!
//! 3. Each run pushes a tracking frame, drops the previous dependency set,
//!    invokes the previous cleanup and then executes the function, so the
//!    dependency set always reflects the latest run only.
//!
//! # Errors
//!
//! The function runs behind the error boundary. A panic or an `Err` return
//! is reported with the effect's tag and swallowed; the effect keeps its
//! previous output (for a render binding, the DOM it last produced) and
//! runs again on the next change.
//!
//! # Cleanup
//!
//! Effects can return a [`Cleanup`]. It runs before the next run and when
//! the effect is disposed.

use std::cell::{Cell, RefCell};
use std::fmt::{self, Display};
use std::rc::{Rc, Weak};

use super::boundary;
use super::context::ReactiveContext;
use super::runtime::{Reactive, Runtime};
use super::scope;
use super::subscriber::{SubscriberId, SubscriberKind};
use crate::config;
use crate::error::{Error, ErrorContext};
use crate::graph::scheduler;

/// A function run before an effect's next run or on its disposal.
pub struct Cleanup(Box<dyn FnOnce()>);

impl Cleanup {
    pub fn new(f: impl FnOnce() + 'static) -> Self {
        Self(Box::new(f))
    }

    fn call(self) {
        (self.0)()
    }
}

impl fmt::Debug for Cleanup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Cleanup")
    }
}

/// Values an effect function may return.
///
/// `()` and [`Cleanup`] are infallible. `Result`s whose error is
/// displayable report the error through the boundary.
pub trait IntoEffectOutcome {
    fn into_outcome(self) -> Result<Option<Cleanup>, Error>;
}

impl IntoEffectOutcome for () {
    fn into_outcome(self) -> Result<Option<Cleanup>, Error> {
        Ok(None)
    }
}

impl IntoEffectOutcome for Cleanup {
    fn into_outcome(self) -> Result<Option<Cleanup>, Error> {
        Ok(Some(self))
    }
}

impl<E: Display> IntoEffectOutcome for Result<(), E> {
    fn into_outcome(self) -> Result<Option<Cleanup>, Error> {
        self.map(|()| None).map_err(Error::evaluation)
    }
}

impl<E: Display> IntoEffectOutcome for Result<Cleanup, E> {
    fn into_outcome(self) -> Result<Option<Cleanup>, Error> {
        self.map(Some).map_err(Error::evaluation)
    }
}

pub(crate) type EffectJob = Box<dyn FnMut() -> Result<Option<Cleanup>, Error>>;

/// The shared state behind an [`EffectHandle`].
pub(crate) struct EffectInner {
    id: SubscriberId,
    kind: SubscriberKind,
    job: RefCell<EffectJob>,
    cleanup: RefCell<Option<Cleanup>>,
    disposed: Cell<bool>,
    running: Cell<bool>,
    run_count: Cell<usize>,

    /// Set by the job to ask for disposal once the current run finishes.
    stop_after_run: Rc<Cell<bool>>,
}

impl EffectInner {
    /// Create and register an effect without running it.
    pub(crate) fn create(
        kind: SubscriberKind,
        job: EffectJob,
        stop_after_run: Rc<Cell<bool>>,
    ) -> Rc<Self> {
        config::mark_used();
        let id = SubscriberId::new();
        let effect = Rc::new(Self {
            id,
            kind,
            job: RefCell::new(job),
            cleanup: RefCell::new(None),
            disposed: Cell::new(false),
            running: Cell::new(false),
            run_count: Cell::new(0),
            stop_after_run,
        });

        let reactive: Rc<dyn Reactive> = effect.clone();
        let weak: Weak<dyn Reactive> = Rc::downgrade(&reactive);
        Runtime::register(weak, id);
        scope::adopt(reactive);
        tracing::trace!(subscriber = %id, ?kind, "effect created");

        effect
    }

    /// Execute the effect function under the boundary.
    pub(crate) fn run_now(&self) {
        if self.disposed.get() {
            return;
        }
        let Ok(mut job) = self.job.try_borrow_mut() else {
            tracing::warn!(subscriber = %self.id, "effect re-entered its own run; skipping");
            return;
        };

        self.running.set(true);
        let outcome = {
            let _ctx = ReactiveContext::enter(self.id);
            Runtime::clear_dependencies(self.id);
            let previous = self.cleanup.borrow_mut().take();
            if let Some(cleanup) = previous {
                run_cleanup(cleanup);
            }
            boundary::guard(self.kind.error_context(), || (*job)())
        };
        drop(job);
        self.running.set(false);
        self.run_count.set(self.run_count.get() + 1);

        let cleanup = outcome.flatten();
        if self.disposed.get() {
            // Disposed mid-run: the run finished, now undo what it set up.
            Runtime::clear_dependencies(self.id);
            if let Some(cleanup) = cleanup {
                run_cleanup(cleanup);
            }
            return;
        }
        *self.cleanup.borrow_mut() = cleanup;

        if self.stop_after_run.get() {
            self.dispose_inner();
        }
    }

    fn dispose_inner(&self) {
        if self.disposed.replace(true) {
            return;
        }
        Runtime::unregister(self.id);
        scheduler::dequeue(self.id);

        if self.running.get() {
            tracing::debug!(subscriber = %self.id, "effect disposed mid-run; finishing current run");
        }

        let cleanup = self.cleanup.try_borrow_mut().ok().and_then(|mut slot| slot.take());
        if let Some(cleanup) = cleanup {
            run_cleanup(cleanup);
        }
    }
}

fn run_cleanup(cleanup: Cleanup) {
    let _ctx = ReactiveContext::untracked();
    boundary::guard(ErrorContext::Cleanup, || {
        cleanup.call();
        Ok(())
    });
}

impl Reactive for EffectInner {
    fn subscriber_id(&self) -> SubscriberId {
        self.id
    }

    fn kind(&self) -> SubscriberKind {
        self.kind
    }

    // Effects are always re-run in full; there is no dirty state to keep.
    fn mark_dirty(&self) {}

    fn run(&self) {
        self.run_now();
    }

    fn dispose(&self) {
        self.dispose_inner();
    }

    fn is_disposed(&self) -> bool {
        self.disposed.get()
    }
}

impl Drop for EffectInner {
    fn drop(&mut self) {
        self.dispose_inner();
    }
}

/// Owning handle to a registered effect, watcher or render binding.
///
/// The effect stays alive while a handle (or the [`EffectScope`] it was
/// created in) holds it. Dropping the last owner disposes it.
///
/// [`EffectScope`]: crate::EffectScope
#[derive(Clone)]
#[must_use = "dropping the handle disposes the effect"]
pub struct EffectHandle {
    inner: Rc<EffectInner>,
}

impl EffectHandle {
    pub(crate) fn new(inner: Rc<EffectInner>) -> Self {
        Self { inner }
    }

    /// Get the subscriber ID of the effect.
    pub fn id(&self) -> SubscriberId {
        self.inner.id
    }

    /// Dispose of the effect.
    ///
    /// The effect leaves every cell's subscriber set and the pending queue,
    /// and its last cleanup runs. An effect disposed from inside its own run
    /// finishes that run first.
    pub fn dispose(&self) {
        self.inner.dispose_inner();
    }

    /// Check if the effect has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.get()
    }

    /// Get the number of times the effect has run.
    pub fn run_count(&self) -> usize {
        self.inner.run_count.get()
    }

    /// Get the number of cells read during the latest run.
    pub fn dependency_count(&self) -> usize {
        self.inner.dependencies().len()
    }
}

impl fmt::Debug for EffectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Effect")
            .field("id", &self.inner.id)
            .field("kind", &self.inner.kind)
            .field("run_count", &self.run_count())
            .field("dependency_count", &self.dependency_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

fn spawn<F, R>(kind: SubscriberKind, mut f: F) -> EffectHandle
where
    F: FnMut() -> R + 'static,
    R: IntoEffectOutcome,
{
    let job: EffectJob = Box::new(move || f().into_outcome());
    let inner = EffectInner::create(kind, job, Rc::new(Cell::new(false)));
    inner.run_now();
    EffectHandle::new(inner)
}

/// Register an effect and run it once, synchronously.
///
/// # Example
///
/// ```rust
/// use trellis_core::{effect, flush, Signal};
///
/// let count = Signal::new(0);
/// let seen = Signal::new(-1);
///
/// let (c, s) = (count.clone(), seen.clone());
/// let _handle = effect(move || {
///     s.set(c.get());
/// });
/// assert_eq!(seen.get(), 0);
///
/// count.set(5);
/// flush();
/// assert_eq!(seen.get(), 5);
/// ```
pub fn effect<F, R>(f: F) -> EffectHandle
where
    F: FnMut() -> R + 'static,
    R: IntoEffectOutcome,
{
    spawn(SubscriberKind::Effect, f)
}

/// Register a render binding.
///
/// Identical to [`effect`] except that failures are reported with the
/// `render` tag.
pub fn render_effect<F, R>(f: F) -> EffectHandle
where
    F: FnMut() -> R + 'static,
    R: IntoEffectOutcome,
{
    spawn(SubscriberKind::Render, f)
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
