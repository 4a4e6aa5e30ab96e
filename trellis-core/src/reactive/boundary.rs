//! Error Boundary
//!
//! Every piece of user code the engine runs (getters, callbacks, cleanups,
//! handlers) goes through [`guard`]. A panic or an `Err` return is caught
//! here, reported once to the configured hook with a tag naming the site,
//! and swallowed. Nothing unwinds into the scheduler or into sibling
//! bindings.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use crate::config;
use crate::error::{Error, ErrorContext};

/// Run `f`, containing any failure.
///
/// Returns `None` if `f` panicked or returned an error; the failure has
/// already been reported.
pub fn guard<T>(context: ErrorContext, f: impl FnOnce() -> Result<T, Error>) -> Option<T> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(value)) => Some(value),
        Ok(Err(error)) => {
            report(&error, context);
            None
        }
        Err(payload) => {
            report(&Error::evaluation(panic_message(payload.as_ref())), context);
            None
        }
    }
}

/// Hand an error to the configured hook, or log it.
pub fn report(error: &Error, context: ErrorContext) {
    let config = config::current();
    let Some(handler) = config.error_handler() else {
        tracing::error!(context = %context, error = %error, "unhandled error in reactive binding");
        return;
    };

    let delivered = panic::catch_unwind(AssertUnwindSafe(|| handler(error, context)));
    if let Err(payload) = delivered {
        tracing::error!(
            context = %context,
            error = %error,
            hook_panic = %panic_message(payload.as_ref()),
            "error hook panicked while reporting"
        );
    }
}

/// Run an event handler under the error boundary.
///
/// Returns the handler's result, or `None` if it panicked.
pub fn invoke_handler<T>(handler: impl FnOnce() -> T) -> Option<T> {
    guard(ErrorContext::Handler, || Ok(handler()))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "binding panicked with a non-string payload".to_string()
    }
}
