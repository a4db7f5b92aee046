/// Structured logging setup for the fingerprint service
///
/// The library emits `tracing` events (feed entries skipped, archive
/// downloads, distant weather stations, malformed reference rows). Binaries
/// call `init_logging` once at startup to route them to stderr.

use tracing_subscriber::EnvFilter;

/// Installs a stderr fmt subscriber filtered at `level`.
///
/// `RUST_LOG`, when set, takes precedence over `level`. Calling this more
/// than once is harmless; later calls leave the first subscriber in place.
pub fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| build_filter(level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Filter for `level`, falling back to `info` when it doesn't parse.
fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"))
}
