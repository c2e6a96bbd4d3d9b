//! Logging setup with `tracing-subscriber`.

use tracing_subscriber::{EnvFilter, fmt};

/// Initialises the global subscriber.
///
/// The level comes from `RUST_LOG` (for example `RUST_LOG=precast_pricing=debug`)
/// and defaults to `info`. Call once, at process start.
///
/// ```no_run
/// precast_pricing::logging::init();
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_line_number(true)
        .init();
}

/// Initialises a debug-level subscriber that writes through the test
/// harness. Safe to call from every test.
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}
