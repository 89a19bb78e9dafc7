//! Tests for builder modules

use prometheus_build_orchestrator::builders::{build_scheduler, SchedulerBuilder};
use prometheus_build_orchestrator::config::{OrchestratorConfig, StorageBackendConfig};
use prometheus_build_orchestrator::core::{
    AuditAction, LaunchOutcome, LaunchTask, SharedAuditSink, UnitLevel, UnitStatus, WorkUnit,
};
use prometheus_build_orchestrator::infra::InMemoryRegistry;

#[test]
fn test_build_in_memory_scheduler() {
    let scheduler = build_scheduler(&OrchestratorConfig::default()).unwrap();
    assert_eq!(scheduler.limits().concurrency_limit, 3);
    assert_eq!(scheduler.budget().hard_limit(), 180_000);
    assert_eq!(scheduler.status_summary().concurrency_limit, 3);
}

#[test]
fn test_build_rejects_invalid_config() {
    let cfg = OrchestratorConfig {
        concurrency_limit: 0,
        ..OrchestratorConfig::default()
    };
    assert!(SchedulerBuilder::new(cfg).build().is_err());
}

#[test]
fn test_builder_restores_from_registry_override() {
    let mut done = WorkUnit::new("db", UnitLevel::Base, 5_000);
    done.status = UnitStatus::Complete;
    let mut interrupted = WorkUnit::new("api", UnitLevel::Core, 5_000).with_dependencies(["db"]);
    interrupted.status = UnitStatus::Running;
    let registry = InMemoryRegistry::with_units(vec![done, interrupted]);
    let audit = SharedAuditSink::new(16);

    let scheduler = SchedulerBuilder::new(OrchestratorConfig::default())
        .with_registry(Box::new(registry.clone()))
        .with_audit(Box::new(audit.clone()))
        .build()
        .unwrap();

    assert_eq!(scheduler.unit("api").unwrap().status, UnitStatus::Pending);
    assert_eq!(registry.snapshot()[0].status, UnitStatus::Pending);
    assert!(matches!(
        scheduler
            .request_launch("api", LaunchTask::new("resume", 1_000), 0)
            .unwrap(),
        LaunchOutcome::Admitted(_)
    ));
    assert_eq!(audit.actions_for("api"), vec![AuditAction::Admit]);
}

#[test]
fn test_file_storage_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = OrchestratorConfig {
        storage: StorageBackendConfig::File {
            registry_path: dir.path().join("units.json"),
            checkpoint_dir: dir.path().join("checkpoints"),
        },
        ..OrchestratorConfig::default()
    };

    {
        let scheduler = build_scheduler(&cfg).unwrap();
        scheduler
            .add_unit(WorkUnit::new("db", UnitLevel::Base, 5_000))
            .unwrap();
        scheduler
            .request_launch("db", LaunchTask::new("schema", 1_000), 0)
            .unwrap();
        scheduler
            .on_unit_suspended("db", Default::default())
            .unwrap();
        scheduler.shutdown().unwrap();
    }

    let restored = build_scheduler(&cfg).unwrap();
    assert_eq!(
        restored.unit("db").unwrap().status,
        UnitStatus::Checkpointed
    );
    assert_eq!(restored.unit_report("db").unwrap().latest_iteration, 1);
}
