pub mod builders;
pub mod recording_executor;

use std::sync::Once;
use std::time::Duration;

use tracing_subscriber::{EnvFilter, fmt};

pub use recording_executor::RecordingExecutor;

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// - Uses `with_test_writer()`, so logs are captured per-test.
/// - The Rust test harness only prints captured output for **failing** tests
///   (unless you run with `-- --nocapture`).
///
/// Enable levels with e.g.:
/// `RUST_LOG=debug cargo test`
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer() // print only for failing tests unless --nocapture
            .with_target(true)
            .init();
    });
}

/// Task body that sleeps for `ms` milliseconds and succeeds.
pub fn sleeping(ms: u64) -> impl Fn() -> anyhow::Result<()> + Send + Sync + 'static {
    move || {
        std::thread::sleep(Duration::from_millis(ms));
        Ok(())
    }
}

/// Task body that always returns an error with `msg`.
pub fn failing(msg: &'static str) -> impl Fn() -> anyhow::Result<()> + Send + Sync + 'static {
    move || Err(anyhow::anyhow!(msg))
}
