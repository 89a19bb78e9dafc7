//! Tests for utility functions

use prometheus_build_orchestrator::util::{init_tracing, now_ms, now_utc, DEFAULT_LOG_DIRECTIVE};

#[test]
fn test_clock_is_after_epoch() {
    assert!(now_ms() > 1_600_000_000_000);
    assert!(now_utc().timestamp() > 1_600_000_000);
}

#[test]
fn test_init_tracing_is_idempotent() {
    init_tracing();
    init_tracing();
    tracing::info!("tracing initialised");
    assert!(DEFAULT_LOG_DIRECTIVE.starts_with("prometheus_build_orchestrator"));
}
