//! Watchers
//!
//! A watcher splits an effect in two: a tracked getter that produces a value,
//! and an untracked callback that reacts to changes of that value.

use std::any::Any;
use std::cell::Cell;
use std::rc::Rc;

use serde_json::Value;

use super::context::untrack;
use super::effect::{EffectHandle, EffectInner, EffectJob};
use super::observe::Observable;
use super::subscriber::SubscriberKind;

/// Options accepted by [`watch`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WatchOptions {
    /// Invoke the callback once at registration with no previous value.
    pub immediate: bool,

    /// Traverse a watched [`Observable`] so every nested cell is a
    /// dependency, and fire when its structural snapshot changes.
    pub deep: bool,

    /// Dispose after the callback first fires because of a change.
    pub once: bool,
}

impl WatchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn immediate(mut self, immediate: bool) -> Self {
        self.immediate = immediate;
        self
    }

    pub fn deep(mut self, deep: bool) -> Self {
        self.deep = deep;
        self
    }

    pub fn once(mut self, once: bool) -> Self {
        self.once = once;
        self
    }
}

/// Deep-tracked snapshot of a watched value, if it is an observable.
fn deep_snapshot<T: 'static>(value: &T) -> Option<Value> {
    let any: &dyn Any = value;
    any.downcast_ref::<Observable>().map(Observable::snapshot)
}

/// Watch the value produced by `getter` and call `callback` when it changes.
///
/// The getter runs immediately to collect its dependencies. The callback
/// receives the new value and the previous one (`None` for the immediate
/// call). Both run behind the error boundary with the `watch` tag.
///
/// # Example
///
/// ```rust
/// use std::cell::RefCell;
/// use std::rc::Rc;
/// use trellis_core::{flush, watch, Signal, WatchOptions};
///
/// let count = Signal::new(1);
/// let log = Rc::new(RefCell::new(Vec::new()));
///
/// let (c, l) = (count.clone(), log.clone());
/// let _w = watch(
///     move || c.get() * 10,
///     move |new, old| l.borrow_mut().push((*new, old.copied())),
///     WatchOptions::new(),
/// );
///
/// count.set(2);
/// flush();
/// assert_eq!(*log.borrow(), vec![(20, Some(10))]);
/// ```
pub fn watch<T, G, C>(mut getter: G, mut callback: C, options: WatchOptions) -> EffectHandle
where
    T: Clone + PartialEq + 'static,
    G: FnMut() -> T + 'static,
    C: FnMut(&T, Option<&T>) + 'static,
{
    let stop = Rc::new(Cell::new(false));
    let stop_flag = Rc::clone(&stop);

    let mut previous: Option<T> = None;
    let mut previous_snapshot: Option<Value> = None;
    let mut initialized = false;

    let job: EffectJob = Box::new(move || {
        // Marked before the getter runs so a failed registration run still
        // counts as the registration run.
        let first = !initialized;
        initialized = true;

        let value = getter();
        let snapshot = if options.deep {
            deep_snapshot(&value)
        } else {
            None
        };

        let changed = match &previous {
            None => true,
            Some(old) => *old != value || (options.deep && snapshot != previous_snapshot),
        };
        let fire = if first { options.immediate } else { changed };

        let old = previous.replace(value.clone());
        previous_snapshot = snapshot;

        if fire {
            untrack(|| callback(&value, old.as_ref()));
            if options.once && !first {
                stop_flag.set(true);
            }
        }
        Ok(None)
    });

    let inner = EffectInner::create(SubscriberKind::Watch, job, stop);
    inner.run_now();
    EffectHandle::new(inner)
}
