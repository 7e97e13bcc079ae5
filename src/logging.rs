//! `tracing` initialization for the binary.

use tracing_subscriber::EnvFilter;

/// Install a process-wide subscriber reading `RUST_LOG`, defaulting to
/// `info` when unset. Call once, at the top of `main`.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
