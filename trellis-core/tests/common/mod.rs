//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Once;

use tracing_subscriber::fmt::format::FmtSpan;
use trellis_core::{configure, ErrorContext, RuntimeConfig};

static INIT_LOGGING: Once = Once::new();

/// Initialize test logging once per process.
///
/// Honors `RUST_LOG`; defaults to `trellis_core=debug`.
pub fn init_test_logging() {
    INIT_LOGGING.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("trellis_core=debug"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_span_events(FmtSpan::CLOSE)
            .with_ansi(false)
            .try_init();
    });
}

/// Errors delivered to the hook installed by [`capture_errors`].
pub type ErrorLog = Rc<RefCell<Vec<(String, ErrorContext)>>>;

/// Configure this thread's runtime with a recording error hook.
///
/// Must run before anything else touches the runtime on the thread.
pub fn capture_errors(config: RuntimeConfig) -> ErrorLog {
    init_test_logging();
    let log: ErrorLog = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&log);
    configure(config.with_error_handler(move |err, ctx| {
        sink.borrow_mut().push((err.to_string(), ctx));
    }))
    .expect("runtime configured twice in one test");
    log
}
