//! Runtime Configuration
//!
//! The engine reads three settings: the flush iteration ceiling, the error
//! hook, and the tick driver that decides when a requested flush runs.
//!
//! Configuration is an explicit, one-time step. Call [`configure`] at
//! application start, before the first effect is registered. A runtime that
//! is used without being configured runs with defaults, and a `configure`
//! call arriving after that point is rejected with
//! [`Error::ConfiguredAfterUse`] instead of silently taking effect halfway
//! through.
//!
//! # Threading
//!
//! The reactive graph is built on `Rc` and never crosses threads, so the
//! configuration is stored per thread. Each UI thread owns one runtime and
//! configures it once.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::error::{Error, ErrorContext, Result};

/// Default ceiling on flush passes before the scheduler gives up.
pub const DEFAULT_MAX_FLUSH_ITERATIONS: usize = 100;

/// Hook receiving every error caught at an effect boundary.
pub type ErrorHandler = Rc<dyn Fn(&Error, ErrorContext)>;

/// Called whenever the scheduler wants a flush to happen "soon".
///
/// The driver must not flush synchronously; it should arrange for
/// [`flush`](crate::flush) to be called on the next turn of the host's
/// event loop (for example by spawning a local task).
pub type TickDriver = Rc<dyn Fn()>;

/// Settings for the reactive runtime on the current thread.
#[derive(Clone)]
pub struct RuntimeConfig {
    max_flush_iterations: usize,
    error_handler: Option<ErrorHandler>,
    tick_driver: Option<TickDriver>,
}

impl RuntimeConfig {
    /// Create a configuration with default settings.
    pub fn new() -> Self {
        Self {
            max_flush_iterations: DEFAULT_MAX_FLUSH_ITERATIONS,
            error_handler: None,
            tick_driver: None,
        }
    }

    /// Set the number of flush passes allowed before the flush is aborted.
    ///
    /// A value of zero is treated as one.
    pub fn with_max_flush_iterations(mut self, limit: usize) -> Self {
        self.max_flush_iterations = limit.max(1);
        self
    }

    /// Install the error hook.
    pub fn with_error_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&Error, ErrorContext) + 'static,
    {
        self.error_handler = Some(Rc::new(handler));
        self
    }

    /// Install the tick driver.
    pub fn with_tick_driver<F>(mut self, driver: F) -> Self
    where
        F: Fn() + 'static,
    {
        self.tick_driver = Some(Rc::new(driver));
        self
    }

    pub fn max_flush_iterations(&self) -> usize {
        self.max_flush_iterations
    }

    pub fn error_handler(&self) -> Option<&ErrorHandler> {
        self.error_handler.as_ref()
    }

    pub fn tick_driver(&self) -> Option<&TickDriver> {
        self.tick_driver.as_ref()
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RuntimeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeConfig")
            .field("max_flush_iterations", &self.max_flush_iterations)
            .field("error_handler", &self.error_handler.is_some())
            .field("tick_driver", &self.tick_driver.is_some())
            .finish()
    }
}

#[derive(Default)]
struct ConfigState {
    configured: Option<Rc<RuntimeConfig>>,
    fallback: Option<Rc<RuntimeConfig>>,
    used: bool,
}

thread_local! {
    static STATE: RefCell<ConfigState> = RefCell::new(ConfigState::default());
}

/// Configure the runtime for the current thread.
///
/// # Errors
///
/// Returns [`Error::AlreadyConfigured`] on a second call and
/// [`Error::ConfiguredAfterUse`] if effects, flushes or error reports have
/// already run with the default configuration.
pub fn configure(config: RuntimeConfig) -> Result<()> {
    STATE.with(|state| {
        let mut state = state.borrow_mut();
        if state.configured.is_some() {
            return Err(Error::AlreadyConfigured);
        }
        if state.used {
            return Err(Error::ConfiguredAfterUse);
        }
        tracing::debug!(?config, "runtime configured");
        state.configured = Some(Rc::new(config));
        Ok(())
    })
}

/// Whether [`configure`] has been called on this thread.
pub fn is_configured() -> bool {
    STATE.with(|state| state.borrow().configured.is_some())
}

/// The active configuration. Marks the runtime as used.
pub(crate) fn current() -> Rc<RuntimeConfig> {
    STATE.with(|state| {
        let mut state = state.borrow_mut();
        state.used = true;
        if let Some(config) = &state.configured {
            return Rc::clone(config);
        }
        Rc::clone(
            state
                .fallback
                .get_or_insert_with(|| Rc::new(RuntimeConfig::default())),
        )
    })
}

/// Record that the runtime has started working without reading settings.
pub(crate) fn mark_used() {
    STATE.with(|state| state.borrow_mut().used = true);
}
