//! Dependency Cells
//!
//! A cell is the unit of observability: one per state property, array slot
//! or computed value. Reading a cell inside a reactive context records an
//! edge to the running subscriber; writing a changed value notifies every
//! subscriber that read it during its latest run.
//!
//! # How Signals Work
//!
//! 1. When a signal is read within a reactive context (computed/effect), the
//!    signal registers that context as a subscriber.
//!
//! 2. When a signal is written with a value different from the current one,
//!    all subscribers are notified. Writing an equal value does nothing.
//!
//! 3. Notifications enqueue effects; they run at the next flush.
//!
//! # Lifetime
//!
//! A cell lives as long as its owner. Dropping the last handle removes the
//! cell and every edge pointing at it; there is no explicit destroy call.

use std::cell::{Ref, RefCell};
use std::fmt::{self, Debug};
use std::rc::Rc;

use super::runtime::Runtime;
use super::subscriber::CellId;

/// A bare dependency cell: identity plus tracking and triggering.
///
/// Value storage is left to the owner. [`Signal`] pairs a `Dep` with a
/// value; observable containers keep one `Dep` per key.
pub struct Dep {
    id: CellId,
}

impl Dep {
    pub fn new() -> Self {
        Self { id: CellId::new() }
    }

    pub fn id(&self) -> CellId {
        self.id
    }

    /// Record a read by the running subscriber, if any.
    pub fn track(&self) {
        Runtime::track(self.id);
    }

    /// Notify every subscriber of this cell.
    pub fn trigger(&self) {
        Runtime::notify_cell(self.id);
    }

    pub fn subscriber_count(&self) -> usize {
        Runtime::subscriber_count(self.id)
    }
}

impl Default for Dep {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Dep {
    fn drop(&mut self) {
        Runtime::drop_cell(self.id);
    }
}

impl Debug for Dep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Dep").field(&self.id).finish()
    }
}

struct SignalInner<T> {
    dep: Dep,
    value: RefCell<T>,
}

/// A reactive cell holding a value of type T.
///
/// # Example
///
/// ```rust
/// use trellis_core::Signal;
///
/// let count = Signal::new(0);
/// count.set(5);
/// assert_eq!(count.get(), 5);
/// ```
pub struct Signal<T> {
    inner: Rc<SignalInner<T>>,
}

impl<T> Signal<T>
where
    T: Clone + PartialEq + 'static,
{
    /// Create a new signal with the given initial value.
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(SignalInner {
                dep: Dep::new(),
                value: RefCell::new(value),
            }),
        }
    }

    /// Get the signal's cell ID.
    pub fn id(&self) -> CellId {
        self.inner.dep.id()
    }

    /// Get the current value, tracking the read.
    pub fn get(&self) -> T {
        self.inner.dep.track();
        self.inner.value.borrow().clone()
    }

    /// Get the current value without tracking dependencies.
    pub fn get_untracked(&self) -> T {
        self.inner.value.borrow().clone()
    }

    /// Borrow the current value, tracking the read.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.inner.dep.track();
        f(&self.inner.value.borrow())
    }

    /// Borrow the current value without tracking.
    pub fn peek(&self) -> Ref<'_, T> {
        self.inner.value.borrow()
    }

    /// Set a new value and notify subscribers.
    ///
    /// Returns `false` (and notifies nobody) if the value is unchanged.
    pub fn set(&self, value: T) -> bool {
        {
            let mut current = self.inner.value.borrow_mut();
            if *current == value {
                return false;
            }
            *current = value;
        }
        self.inner.dep.trigger();
        true
    }

    /// Mutate the value in place, notifying only if it actually changed.
    pub fn update(&self, f: impl FnOnce(&mut T)) -> bool {
        let changed = {
            let mut current = self.inner.value.borrow_mut();
            let before = current.clone();
            f(&mut current);
            *current != before
        };
        if changed {
            self.inner.dep.trigger();
        }
        changed
    }

    /// Get the number of subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.inner.dep.subscriber_count()
    }
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> Debug for Signal<T>
where
    T: Clone + PartialEq + Debug + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("id", &self.id())
            .field("value", &*self.peek())
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}
