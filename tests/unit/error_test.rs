//! Tests for error types

use prometheus_build_orchestrator::core::{
    LevelViolation, OrchestratorError, UnitLevel, UnitStatus,
};

#[test]
fn test_unknown_unit_error() {
    let err = OrchestratorError::UnknownUnit("api".to_string());
    assert_eq!(format!("{}", err), "unknown unit: api");
}

#[test]
fn test_cycle_error_lists_every_cycle() {
    let err = OrchestratorError::CycleDetected(vec![
        vec!["a".into(), "b".into(), "a".into()],
        vec!["c".into(), "c".into()],
    ]);
    assert_eq!(format!("{}", err), "cycle detected: a -> b -> a; c -> c");
}

#[test]
fn test_level_violation_error() {
    let err = OrchestratorError::LevelViolation(LevelViolation {
        from: "db".into(),
        from_level: UnitLevel::Base,
        to: "ui".into(),
        to_level: UnitLevel::Feature,
    });
    assert_eq!(
        format!("{}", err),
        "level violation: db at base(0) depends on ui at feature(2)"
    );
}

#[test]
fn test_stale_iteration_error() {
    let err = OrchestratorError::StaleIteration {
        unit_id: "api".into(),
        attempted: 2,
        latest: 3,
    };
    assert_eq!(
        format!("{}", err),
        "stale checkpoint for api: iteration 2 is not newer than 3"
    );
}

#[test]
fn test_invalid_transition_error() {
    let err = OrchestratorError::InvalidTransition {
        unit_id: "api".into(),
        from: UnitStatus::Complete,
        to: UnitStatus::Queued,
    };
    assert_eq!(
        format!("{}", err),
        "invalid transition for api: complete -> queued"
    );
}

#[test]
fn test_backend_error() {
    let err = OrchestratorError::backend("connection failed");
    assert_eq!(format!("{}", err), "backend error: connection failed");
}
