//! Trellis Core
//!
//! This crate provides the runtime for fine-grained reactive UIs. It
//! implements:
//!
//! - Dependency cells with automatic dependency tracking
//! - Effects, watchers and render bindings with error isolation
//! - A batching scheduler that runs each effect at most once per pass
//! - Lazily recomputed computed values
//! - Keyed-list reconciliation based on the longest increasing subsequence
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `reactive`: Cells, effects, computeds and observable value graphs
//! - `graph`: The dependency relation and the update scheduler
//! - `reconcile`: Keyed-list diffing and patch application
//! - `config`: One-time runtime configuration (error hook, tick driver)
//! - `error`: The error taxonomy
//!
//! Everything is single-threaded. Each thread owns an independent runtime.
//!
//! # Example
//!
//! ```rust
//! use trellis_core::{computed, effect, flush, Signal};
//!
//! // Create a signal
//! let count = Signal::new(0);
//!
//! // Create a derived value
//! let c = count.clone();
//! let doubled = computed(move || c.get() * 2);
//!
//! // Create an effect
//! let seen = Signal::new(0);
//! let (d, s) = (doubled.clone(), seen.clone());
//! let _effect = effect(move || {
//!     s.set(d.value().unwrap_or_default());
//! });
//!
//! // Update the signal; the effect runs at the next flush
//! count.set(5);
//! flush();
//! assert_eq!(seen.get(), 10);
//! ```

pub mod config;
pub mod error;
pub mod graph;
pub mod reactive;
pub mod reconcile;

pub use config::{configure, is_configured, RuntimeConfig, DEFAULT_MAX_FLUSH_ITERATIONS};
pub use error::{Error, ErrorContext, InvalidInput, Result};
pub use graph::scheduler::{
    batch, flush, has_pending, is_batching, is_flushing, next_tick, stats, FlushStats,
};
pub use reactive::{
    computed, effect, effect_scope, invoke_handler, observe, observe_serialize, on_scope_dispose,
    render_effect, untrack, watch, Cleanup, Computed, EffectHandle, EffectScope, Key, Observable,
    Signal, WatchOptions,
};
pub use reconcile::{
    keyed_list, longest_increasing_subsequence, plan_patches, reconcile, KeyedList, ListHost,
    Patch, PatchStats, Reconciliation, VecHost,
};
