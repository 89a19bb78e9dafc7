//! Tests for audit sink

use prometheus_build_orchestrator::core::{
    build_audit_event, AuditAction, AuditSink, InMemoryAuditSink, SharedAuditSink,
};

#[test]
fn test_in_memory_audit_sink() {
    let mut sink = InMemoryAuditSink::new(10);
    sink.record(build_audit_event("api", AuditAction::Admit, None));

    let events = sink.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].unit_id, "api");
    assert_eq!(events[0].action, AuditAction::Admit);
}

#[test]
fn test_audit_sink_overflow() {
    let mut sink = InMemoryAuditSink::new(2);
    sink.record(build_audit_event("a", AuditAction::Register, None));
    sink.record(build_audit_event("b", AuditAction::Register, None));
    sink.record(build_audit_event("c", AuditAction::Register, None));

    let events = sink.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].unit_id, "b"); // First one popped
    assert_eq!(events[1].unit_id, "c");
}

#[test]
fn test_zero_capacity_sink_drops_everything() {
    let mut sink = InMemoryAuditSink::new(0);
    sink.record(build_audit_event("a", AuditAction::Fail, None));
    assert!(sink.events().is_empty());
}

#[test]
fn test_shared_sink_filters_by_unit() {
    let shared = SharedAuditSink::new(16);
    let mut handle = shared.clone();
    handle.record(build_audit_event("a", AuditAction::Enqueue, None));
    handle.record(build_audit_event("b", AuditAction::Admit, None));
    handle.record(build_audit_event("a", AuditAction::Promote, None));

    assert_eq!(
        shared.actions_for("a"),
        vec![AuditAction::Enqueue, AuditAction::Promote]
    );
    assert_eq!(shared.events().len(), 3);
}

#[test]
fn test_build_audit_event() {
    let event = build_audit_event(
        "api",
        AuditAction::Retry,
        Some("attempt 1: tests failed".to_string()),
    );

    assert_eq!(event.unit_id, "api");
    assert_eq!(event.action.to_string(), "retry");
    assert_eq!(event.detail.as_deref(), Some("attempt 1: tests failed"));
    assert_eq!(event.event_id.len(), 36);
    assert!(event.created_at_ms > 0);

    let other = build_audit_event("api", AuditAction::Retry, None);
    assert_ne!(event.event_id, other.event_id);
}
