//! Tests for tokio spawner utilities and API models

use prometheus_build_orchestrator::core::{
    Admission, BudgetThresholds, BudgetTracker, LaunchOutcome, LaunchTask, Spawn, UnitLevel,
    WorkUnit,
};
use prometheus_build_orchestrator::runtime::{LaunchRequest, LaunchResponse, TokioSpawner};

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_tokio_spawner_spawn() {
    let spawner = TokioSpawner::new(tokio::runtime::Handle::current());

    let (tx, rx) = tokio::sync::oneshot::channel();
    spawner.spawn(async move {
        tx.send(123).unwrap();
    });

    let result = rx.await.expect("oneshot result");
    assert_eq!(result, 123);
}

#[test]
fn test_current_spawner_needs_runtime() {
    assert!(TokioSpawner::current().is_err());
}

#[test]
fn test_launch_request_defaults_priority() {
    let req: LaunchRequest = serde_json::from_str(
        r#"{"unitId": "api", "task": {"description": "routes", "estimatedCost": 4000}}"#,
    )
    .unwrap();
    assert_eq!(req.unit_id, "api");
    assert_eq!(req.priority, 0);
    assert_eq!(req.task.estimated_cost, 4_000);
}

#[test]
fn test_launch_response_mapping() {
    let admitted = LaunchOutcome::Admitted(Admission {
        unit: WorkUnit::new("api", UnitLevel::Core, 1),
        task: LaunchTask::new("routes", 1),
        resume: None,
        ticket: 7,
    });
    assert_eq!(
        LaunchResponse::from(&admitted),
        LaunchResponse::Admitted {
            ticket: 7,
            resumed: false
        }
    );

    let decision = BudgetTracker::new(BudgetThresholds::default(), 20_000, 180_000)
        .unwrap()
        .check(170_000, 1_000);
    let json = serde_json::to_value(LaunchResponse::from(&LaunchOutcome::SplitRequired(decision)))
        .unwrap();
    assert_eq!(json["result"], "split_required");
    assert_eq!(json["decision"]["admitted"], false);
}
