//! Tracing/logging initialization.
//!
//! Structured JSON logs, level-filtered via `RUST_LOG`. Report generation
//! emits its progress and per-item diagnostics through `tracing`, so this is
//! the only process-level setup needed.

use tracing_subscriber::EnvFilter;

/// Initialize tracing/logging for the process.
///
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false)
        .try_init();
}
