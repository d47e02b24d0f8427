use tracing_subscriber::EnvFilter;

/// Installs a test writer subscriber once per test binary.
pub fn trace_init() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}
