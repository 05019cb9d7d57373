//! Logging initialization.
//!
//! The library itself only emits `tracing` events; installing a subscriber
//! is left to the binary or test harness.

use tracing_subscriber::{fmt, EnvFilter};

/// Installs a global `fmt` subscriber.
///
/// # Environment
/// - `RUST_LOG`: filter directive (default: `info`),
///   e.g. `RUST_LOG=jobshop_sim=debug`.
///
/// Calling this more than once is harmless; later calls are ignored.
///
/// # Example
/// ```no_run
/// jobshop_sim::logging::init();
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_line_number(true)
        .try_init();
}

/// Installs a verbose subscriber that writes through the test harness.
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}
