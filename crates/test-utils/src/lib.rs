pub mod builders;
pub mod fake_pipeline;
pub mod fixture;
pub mod recording_reporter;

use std::sync::Once;
use tracing_subscriber::{fmt, EnvFilter};

pub use builders::{ConfigFileBuilder, PipelineConfigBuilder};
pub use fake_pipeline::{FakePipeline, Gate};
pub use fixture::ProjectFixture;
pub use recording_reporter::{RecordingReporter, Report};

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
