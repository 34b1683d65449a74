use tracing_subscriber::{EnvFilter, fmt};

use crate::config::LogLevel;

/// Install the global `tracing` subscriber. `RUST_LOG`, when set, wins over
/// the configured level. Output goes to stderr so a client's stdout carries
/// only relayed messages.
pub fn init_tracing(level: LogLevel) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str()));

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
