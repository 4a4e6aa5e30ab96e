//! Effect Scopes
//!
//! A scope collects every effect, watcher and computed created while it is
//! running, so a whole component's worth of reactive work can be torn down
//! with one call. Scopes created inside another scope are disposed with
//! their parent.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use super::boundary;
use super::runtime::Reactive;
use crate::error::ErrorContext;

#[derive(Default)]
struct ScopeInner {
    reactives: RefCell<Vec<Rc<dyn Reactive>>>,
    cleanups: RefCell<Vec<Box<dyn FnOnce()>>>,
    disposed: Cell<bool>,
}

thread_local! {
    static SCOPE_STACK: RefCell<Vec<EffectScope>> = const { RefCell::new(Vec::new()) };
}

/// Owner of the reactive work created inside [`EffectScope::run`].
#[derive(Clone)]
pub struct EffectScope {
    inner: Rc<ScopeInner>,
}

impl EffectScope {
    /// Create a scope. If another scope is active, the new one becomes its
    /// child and is disposed along with it.
    pub fn new() -> Self {
        let scope = Self {
            inner: Rc::new(ScopeInner::default()),
        };
        if let Some(parent) = current() {
            let child = scope.clone();
            parent.on_dispose(move || child.dispose());
        }
        scope
    }

    /// Run `f` with this scope active. Returns `None` once disposed.
    pub fn run<T>(&self, f: impl FnOnce() -> T) -> Option<T> {
        if self.is_disposed() {
            return None;
        }

        struct ScopeGuard;

        impl Drop for ScopeGuard {
            fn drop(&mut self) {
                SCOPE_STACK.with(|stack| {
                    stack.borrow_mut().pop();
                });
            }
        }

        SCOPE_STACK.with(|stack| stack.borrow_mut().push(self.clone()));
        let _guard = ScopeGuard;
        Some(f())
    }

    /// Register a callback to run when the scope is disposed.
    ///
    /// On an already disposed scope the callback runs immediately.
    pub fn on_dispose(&self, f: impl FnOnce() + 'static) {
        if self.is_disposed() {
            run_cleanup(Box::new(f));
            return;
        }
        self.inner.cleanups.borrow_mut().push(Box::new(f));
    }

    /// Dispose every adopted subscriber, then run the dispose callbacks in
    /// registration order. Idempotent.
    pub fn dispose(&self) {
        if self.inner.disposed.replace(true) {
            return;
        }
        let reactives = std::mem::take(&mut *self.inner.reactives.borrow_mut());
        let cleanups = std::mem::take(&mut *self.inner.cleanups.borrow_mut());
        tracing::debug!(
            subscribers = reactives.len(),
            callbacks = cleanups.len(),
            "disposing effect scope"
        );

        for reactive in &reactives {
            reactive.dispose();
        }
        drop(reactives);

        for cleanup in cleanups {
            run_cleanup(cleanup);
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.get()
    }

    /// Number of live subscribers this scope owns.
    pub fn len(&self) -> usize {
        self.inner
            .reactives
            .borrow()
            .iter()
            .filter(|owned| !owned.is_disposed())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for EffectScope {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EffectScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectScope")
            .field("subscribers", &self.len())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

fn run_cleanup(cleanup: Box<dyn FnOnce()>) {
    boundary::guard(ErrorContext::Cleanup, || {
        cleanup();
        Ok(())
    });
}

fn current() -> Option<EffectScope> {
    SCOPE_STACK.with(|stack| stack.borrow().last().cloned())
}

/// Hand a newly created subscriber to the active scope, if any.
pub(crate) fn adopt(reactive: Rc<dyn Reactive>) {
    if let Some(scope) = current() {
        if scope.is_disposed() {
            return;
        }
        let mut reactives = scope.inner.reactives.borrow_mut();
        reactives.retain(|owned| !owned.is_disposed());
        reactives.push(reactive);
    }
}

/// Create a new [`EffectScope`].
pub fn effect_scope() -> EffectScope {
    EffectScope::new()
}

/// Register `f` with the active scope. Returns `false` when no scope is
/// active, in which case `f` is dropped without running.
pub fn on_scope_dispose(f: impl FnOnce() + 'static) -> bool {
    match current() {
        Some(scope) => {
            scope.on_dispose(f);
            true
        }
        None => {
            tracing::warn!("on_scope_dispose called outside of an effect scope");
            false
        }
    }
}
