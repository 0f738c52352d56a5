use tracing_subscriber::{fmt, EnvFilter};

/// Install the global fmt subscriber, writing to stderr.
///
/// `RUST_LOG` wins over `default_filter` when set. Calling this twice is a
/// no-op rather than a panic.
pub fn init_tracing(default_filter: &str) {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Route log output through the test harness so it shows up only on failure.
#[cfg(test)]
pub(crate) fn init_test_tracing() {
    let _ = fmt::Subscriber::builder()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}
