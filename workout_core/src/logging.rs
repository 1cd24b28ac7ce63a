//! Tracing subscriber setup shared by the engine and the `gymflow` binary.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the subscriber at `warn`; `RUST_LOG` takes precedence
pub fn init() {
    init_with_level("warn")
}

/// Install the subscriber with `default_level` unless `RUST_LOG` is set
///
/// Output goes to stderr so it stays out of command output. Calling this
/// again after a subscriber is installed does nothing.
pub fn init_with_level(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .try_init();
}

#[cfg(test)]
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(EnvFilter::new("debug"))
        .try_init();
}
