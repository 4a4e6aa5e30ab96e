//! Computed Values
//!
//! A computed is a cached derived value that re-evaluates only when it is
//! read after one of its dependencies changed.
//!
//! # How Computeds Work
//!
//! 1. On first read, the computed runs its getter inside its own tracking
//!    frame and caches the result.
//!
//! 2. When a dependency changes, the runtime marks the computed dirty and
//!    the computed triggers its own cell, so whoever read it is notified.
//!    Nothing is recomputed at that point.
//!
//! 3. The next read of a dirty computed re-runs the getter. Reads of a clean
//!    computed return the cached value.
//!
//! This "pull" approach avoids unnecessary work:
//!
//! - A signal changes
//! - 10 computeds depend on it
//! - Only the computeds actually read again will recompute
//!
//! # Errors
//!
//! A failing getter is reported with the `computed` tag. The cached value
//! stays at its last good state and the dirty flag is cleared, so the getter
//! is not retried until a dependency changes again.

use std::cell::{Cell, RefCell};
use std::fmt::{self, Debug};
use std::rc::{Rc, Weak};

use super::boundary;
use super::cell::Dep;
use super::context::ReactiveContext;
use super::runtime::{Reactive, Runtime};
use super::scope;
use super::subscriber::{SubscriberId, SubscriberKind};
use crate::config;
use crate::error::{Error, ErrorContext};

struct ComputedInner<T> {
    /// Identity as a subscriber of the cells the getter reads.
    id: SubscriberId,

    /// The computed's own cell, read by whoever reads the computed.
    dep: Dep,

    getter: RefCell<Box<dyn FnMut() -> T>>,

    /// Last successfully computed value.
    value: RefCell<Option<T>>,

    dirty: Cell<bool>,
    disposed: Cell<bool>,
    recompute_count: Cell<usize>,
}

impl<T: Clone + 'static> ComputedInner<T> {
    fn evaluate(&self) {
        let Ok(mut getter) = self.getter.try_borrow_mut() else {
            boundary::report(
                &Error::evaluation("computed read itself while evaluating"),
                ErrorContext::Computed,
            );
            return;
        };

        let result = {
            let _ctx = ReactiveContext::enter(self.id);
            Runtime::clear_dependencies(self.id);
            boundary::guard(ErrorContext::Computed, || Ok((*getter)()))
        };
        drop(getter);

        if let Some(value) = result {
            *self.value.borrow_mut() = Some(value);
        }
        self.dirty.set(false);
        self.recompute_count.set(self.recompute_count.get() + 1);
    }
}

impl<T: Clone + 'static> Reactive for ComputedInner<T> {
    fn subscriber_id(&self) -> SubscriberId {
        self.id
    }

    fn kind(&self) -> SubscriberKind {
        SubscriberKind::Computed
    }

    fn mark_dirty(&self) {
        if self.dirty.get() || self.disposed.get() {
            return;
        }
        self.dirty.set(true);
        self.dep.trigger();
    }

    fn run(&self) {
        if self.dirty.get() && !self.disposed.get() {
            self.evaluate();
        }
    }

    fn dispose(&self) {
        if self.disposed.replace(true) {
            return;
        }
        Runtime::unregister(self.id);
    }

    fn is_disposed(&self) -> bool {
        self.disposed.get()
    }
}

impl<T> Drop for ComputedInner<T> {
    fn drop(&mut self) {
        Runtime::unregister(self.id);
    }
}

/// A cached, lazily recomputed derived value.
///
/// # Example
///
/// ```rust
/// use trellis_core::{computed, Signal};
///
/// let count = Signal::new(2);
/// let c = count.clone();
/// let doubled = computed(move || c.get() * 2);
///
/// assert_eq!(doubled.value(), Some(4));
/// count.set(5);
/// assert_eq!(doubled.value(), Some(10));
/// ```
pub struct Computed<T> {
    inner: Rc<ComputedInner<T>>,
}

impl<T: Clone + 'static> Computed<T> {
    /// Create a new computed. The getter does not run until the first read.
    pub fn new<F>(getter: F) -> Self
    where
        F: FnMut() -> T + 'static,
    {
        config::mark_used();
        let inner = Rc::new(ComputedInner {
            id: SubscriberId::new(),
            dep: Dep::new(),
            getter: RefCell::new(Box::new(getter)),
            value: RefCell::new(None),
            dirty: Cell::new(true),
            disposed: Cell::new(false),
            recompute_count: Cell::new(0),
        });

        let reactive: Rc<dyn Reactive> = inner.clone();
        let weak: Weak<dyn Reactive> = Rc::downgrade(&reactive);
        Runtime::register(weak, inner.id);
        scope::adopt(reactive);

        Self { inner }
    }

    /// Get the current value, recomputing if a dependency changed.
    ///
    /// Reading inside a reactive context makes the reader depend on this
    /// computed. Returns `None` only if the getter has never succeeded.
    pub fn value(&self) -> Option<T> {
        self.inner.dep.track();
        self.inner.run();
        self.inner.value.borrow().clone()
    }

    /// The cached value, without tracking or recomputing.
    pub fn peek(&self) -> Option<T> {
        self.inner.value.borrow().clone()
    }

    /// Whether the next read will recompute.
    pub fn is_dirty(&self) -> bool {
        self.inner.dirty.get()
    }

    /// Get the number of times the getter has run.
    pub fn recompute_count(&self) -> usize {
        self.inner.recompute_count.get()
    }

    /// Stop tracking dependencies. The cached value stays readable.
    pub fn dispose(&self) {
        self.inner.dispose();
    }

    pub fn id(&self) -> SubscriberId {
        self.inner.id
    }
}

impl<T> Clone for Computed<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> Debug for Computed<T>
where
    T: Clone + Debug + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Computed")
            .field("id", &self.inner.id)
            .field("dirty", &self.is_dirty())
            .field("value", &self.peek())
            .finish()
    }
}

/// Create a [`Computed`] from a getter.
pub fn computed<T, F>(getter: F) -> Computed<T>
where
    T: Clone + 'static,
    F: FnMut() -> T + 'static,
{
    Computed::new(getter)
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{configure, RuntimeConfig};
    use crate::graph::scheduler::flush;
    use crate::reactive::{effect, Signal};

    fn counted<T: Clone + 'static>(
        mut f: impl FnMut() -> T + 'static,
    ) -> (Computed<T>, Rc<Cell<usize>>) {
        let calls = Rc::new(Cell::new(0));
        let calls_clone = calls.clone();
        let c = computed(move || {
            calls_clone.set(calls_clone.get() + 1);
            f()
        });
        (c, calls)
    }

    #[test]
    fn computes_on_first_access() {
        let (c, calls) = counted(|| 42);
        assert!(c.is_dirty());
        assert_eq!(calls.get(), 0);

        assert_eq!(c.value(), Some(42));
        assert_eq!(calls.get(), 1);
        assert!(!c.is_dirty());
    }

    #[test]
    fn caches_value_when_clean() {
        let (c, calls) = counted(|| 42);
        for _ in 0..3 {
            assert_eq!(c.value(), Some(42));
        }
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn invalidation_is_lazy() {
        let signal = Signal::new(1);
        let s = signal.clone();
        let (c, calls) = counted(move || s.get() * 2);
        assert_eq!(c.value(), Some(2));

        signal.set(2);
        signal.set(3);
        assert!(c.is_dirty());
        assert_eq!(calls.get(), 1);

        assert_eq!(c.value(), Some(6));
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn readers_rerun_when_computed_invalidates() {
        let signal = Signal::new(1);
        let s = signal.clone();
        let doubled = computed(move || s.get() * 2);

        let seen = Rc::new(Cell::new(0));
        let (d, seen_clone) = (doubled.clone(), seen.clone());
        let _e = effect(move || seen_clone.set(d.value().unwrap_or_default()));
        assert_eq!(seen.get(), 2);

        signal.set(4);
        flush();
        assert_eq!(seen.get(), 8);
    }

    #[test]
    fn computed_chains() {
        let base = Signal::new(5);
        let b = base.clone();
        let doubled = computed(move || b.get() * 2);
        let d = doubled.clone();
        let plus_ten = computed(move || d.value().unwrap_or_default() + 10);

        assert_eq!(plus_ten.value(), Some(20));
        base.set(10);
        assert!(plus_ten.is_dirty());
        assert_eq!(plus_ten.value(), Some(30));
    }

    #[test]
    fn failure_keeps_last_good_value() {
        let errors = Rc::new(Cell::new(0));
        let sink = errors.clone();
        configure(RuntimeConfig::new().with_error_handler(move |_, ctx| {
            assert_eq!(ctx, ErrorContext::Computed);
            sink.set(sink.get() + 1);
        }))
        .unwrap();

        let signal = Signal::new(1);
        let s = signal.clone();
        let (c, calls) = counted(move || {
            let v = s.get();
            assert!(v >= 0, "negative input");
            v
        });
        assert_eq!(c.value(), Some(1));

        signal.set(-1);
        assert_eq!(c.value(), Some(1));
        assert_eq!(errors.get(), 1);
        assert!(!c.is_dirty());

        // Not retried until a dependency changes again.
        assert_eq!(c.value(), Some(1));
        assert_eq!(calls.get(), 2);

        signal.set(7);
        assert_eq!(c.value(), Some(7));
    }

    #[test]
    fn never_successful_computed_is_none() {
        let c: Computed<i32> = computed(|| panic!("always fails"));
        assert_eq!(c.value(), None);
    }
}
