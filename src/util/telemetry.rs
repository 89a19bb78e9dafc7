//! Telemetry helpers for structured logging and tracing.

use tracing_subscriber::EnvFilter;

/// Directive used when `RUST_LOG` is not set.
pub const DEFAULT_LOG_DIRECTIVE: &str = "prometheus_build_orchestrator=info";

/// Install a default fmt subscriber unless the host process already installed one.
///
/// Honors `RUST_LOG`; falls back to [`DEFAULT_LOG_DIRECTIVE`].
pub fn init_tracing() {
    if tracing::dispatcher::has_been_set() {
        return;
    }
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_DIRECTIVE));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
