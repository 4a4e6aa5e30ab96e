//! Identities for the two halves of the dependency graph.
//!
//! A subscriber is anything that re-executes when the cells it read change:
//! effects, watchers, render bindings and computeds. A cell is the
//! observable unit backing one state slot.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::ErrorContext;

/// Unique identifier for a subscriber.
///
/// IDs are handed out from a monotonically increasing counter, so comparing
/// two IDs tells which subscriber was created first. The scheduler relies on
/// this to run parents before the children they create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Generate a new unique subscriber ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub#{}", self.0)
    }
}

/// Unique identifier for a dependency cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellId(u64);

impl CellId {
    /// Generate a new unique cell ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for CellId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cell#{}", self.0)
    }
}

/// What kind of subscriber this is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriberKind {
    /// `effect()`: eager, may return a cleanup.
    Effect,
    /// A render binding: eager, patches the DOM.
    Render,
    /// `watch()`: eager, getter plus callback.
    Watch,
    /// `computed()`: lazy, recomputes on the next read.
    Computed,
}

impl SubscriberKind {
    /// The tag reported when this subscriber's own code fails.
    pub fn error_context(&self) -> ErrorContext {
        match self {
            Self::Effect => ErrorContext::Effect,
            Self::Render => ErrorContext::Render,
            Self::Watch => ErrorContext::Watch,
            Self::Computed => ErrorContext::Computed,
        }
    }

    /// Eager subscribers are scheduled; lazy ones only mark themselves dirty.
    pub fn is_eager(&self) -> bool {
        !matches!(self, Self::Computed)
    }
}
