use tracing_subscriber::{fmt::TestWriter, EnvFilter};

/// Installs a compact subscriber routed through the test output capture.
/// Filtering follows `RUST_LOG`. Safe to call from every test; only the first
/// call installs anything.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .compact()
        .with_writer(TestWriter::default())
        .try_init();
}
