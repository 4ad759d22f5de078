//! Tracing subscriber set-up for the CLI.

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset: chatty in dev builds, quiet in release.
fn default_filter() -> &'static str {
    if cfg!(debug_assertions) { "info" } else { "warn" }
}

/// Install a stderr `fmt` subscriber that tags each line with its thread name.
///
/// Claimant threads are named `claimant-<n>`, so per-claim events can be traced
/// back to their thread. Safe to call more than once.
pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter()));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_names(true)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
