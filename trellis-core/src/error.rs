//! Error Types
//!
//! Every fallible operation in the crate returns [`Error`]. The variants fall
//! into three groups:
//!
//! - Evaluation errors: a binding, handler or cleanup panicked or returned an
//!   error. These are caught at the effect boundary and only ever surface
//!   through the configured error hook.
//! - Invalid-input errors: the caller handed the engine something it can
//!   never accept (duplicate list keys, a scalar where a container was
//!   expected). These are returned synchronously and never swallowed.
//! - Scheduling and configuration errors.

use std::fmt;

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by the reactive engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A binding panicked or returned an error while evaluating.
    #[error("evaluation failed: {message}")]
    Evaluation {
        /// Panic payload or the error's `Display` output.
        message: String,
    },

    /// A flush kept producing new work past the iteration ceiling.
    #[error("flush exceeded {limit} iterations; effects are re-triggering each other")]
    FlushLimitExceeded {
        /// The configured ceiling.
        limit: usize,
    },

    /// The caller passed a value the engine cannot accept.
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InvalidInput),

    /// `configure` was called twice.
    #[error("runtime is already configured")]
    AlreadyConfigured,

    /// `configure` was called after the runtime had been used with defaults.
    #[error("runtime was used before it was configured")]
    ConfiguredAfterUse,
}

impl Error {
    /// Build an evaluation error from anything displayable.
    pub fn evaluation(message: impl fmt::Display) -> Self {
        Self::Evaluation {
            message: message.to_string(),
        }
    }

    /// Whether this error indicates a programming mistake at the call site.
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Self::InvalidInput(_))
    }
}

/// Structurally invalid arguments.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidInput {
    /// The same key appears twice in one keyed sequence.
    #[error("duplicate key {key} at position {index}")]
    DuplicateKey { key: String, index: usize },

    /// Only objects and arrays can be observed.
    #[error("cannot observe a {kind} value; expected an object or array")]
    NotAContainer { kind: &'static str },

    /// A field key was used on an array or an index key on an object.
    #[error("expected a {expected} key")]
    KeyKind { expected: &'static str },

    /// An array index past the end of the array.
    #[error("index {index} is out of bounds for length {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    /// A value could not be converted to or from an observable graph.
    #[error("serialization failed: {0}")]
    Serialize(String),
}

/// Identifies where an error was caught.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorContext {
    /// A render binding.
    Render,
    /// An event handler invoked through [`invoke_handler`](crate::invoke_handler).
    Handler,
    /// A watcher getter or callback.
    Watch,
    /// A plain effect.
    Effect,
    /// A computed getter.
    Computed,
    /// A cleanup function returned by a previous run.
    Cleanup,
    /// The scheduler itself (flush limit exceeded).
    Scheduler,
}

impl ErrorContext {
    /// The lowercase tag handed to error hooks.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Render => "render",
            Self::Handler => "handler",
            Self::Watch => "watch",
            Self::Effect => "effect",
            Self::Computed => "computed",
            Self::Cleanup => "cleanup",
            Self::Scheduler => "scheduler",
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
