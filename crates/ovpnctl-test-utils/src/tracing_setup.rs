//! Tracing capture for tests.
//!
//! The subscriber is installed at most once per process; later calls are
//! ignored, so every test may call [`init_test_tracing`] unconditionally.

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset: quiet dependencies, verbose core.
pub const DEFAULT_TEST_FILTER: &str = "warn,ovpnctl_core=debug";

/// Install a test-writer subscriber honouring `RUST_LOG`.
///
/// ```ignore
/// #[tokio::test]
/// async fn relays_lines() {
///     ovpnctl_test_utils::tracing_setup::init_test_tracing();
///     // connector and parser logs now show up in failing test output
/// }
/// ```
pub fn init_test_tracing() {
    init_test_tracing_with(DEFAULT_TEST_FILTER);
}

/// Like [`init_test_tracing`] with a custom fallback filter.
pub fn init_test_tracing_with(fallback: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .with_target(true)
        .try_init();
}
