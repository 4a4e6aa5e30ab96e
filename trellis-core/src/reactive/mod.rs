//! Reactive Primitives
//!
//! This module implements the core reactive system: dependency cells,
//! effects, watchers, computeds and observable value graphs.
//!
//! # Concepts
//!
//! ## Cells
//!
//! A cell is a unit of observability. [`Signal`] pairs one cell with a value;
//! an [`Observable`] keeps one cell per property or array slot. Reading a cell
//! while an effect or computed is running records a dependency. Writing a
//! different value notifies every subscriber that read it.
//!
//! ## Effects
//!
//! An effect re-runs whenever a cell it read changes. Runs are deferred to
//! the next flush, so several writes cause a single re-run. [`watch`] and
//! render bindings are effects with a different error tag and extra
//! bookkeeping.
//!
//! ## Computeds
//!
//! A [`Computed`] caches a derived value and only recomputes when read after
//! a dependency changed.
//!
//! # Implementation Notes
//!
//! The reactive system uses a thread-local tracking context to detect
//! dependencies automatically. The dependency relation itself lives in the
//! runtime and never owns a subscriber: dropping the last handle to an effect
//! disposes it and removes its edges.

pub(crate) mod boundary;
mod cell;
mod computed;
mod context;
mod effect;
mod observe;
mod runtime;
mod scope;
mod subscriber;
mod watch;

pub use boundary::invoke_handler;
pub use cell::{Dep, Signal};
pub use computed::{computed, Computed};
pub use context::{untrack, ReactiveContext};
pub use effect::{effect, render_effect, Cleanup, EffectHandle, IntoEffectOutcome};
pub use observe::{observe, observe_serialize, IntoObservable, Key, Observable};
pub use runtime::{Reactive, Runtime};
pub use scope::{effect_scope, on_scope_dispose, EffectScope};
pub use subscriber::{CellId, SubscriberId, SubscriberKind};
pub use watch::{watch, WatchOptions};
