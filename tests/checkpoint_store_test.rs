//! Checkpoint stores: ordering, staleness, durability, and resume input.

use std::time::Duration;

use prometheus_build_orchestrator::core::{
    generate_resume_context, Checkpoint, CheckpointData, CheckpointStore, OrchestratorError,
    TestStatus,
};
use prometheus_build_orchestrator::infra::{InMemoryCheckpointStore, JsonlCheckpointStore};

fn progress(done: &[&str], left: &[&str]) -> CheckpointData {
    CheckpointData {
        completed_tasks: done.iter().map(|s| (*s).to_string()).collect(),
        remaining_tasks: left.iter().map(|s| (*s).to_string()).collect(),
        modified_resources: vec!["src/lib.rs".into()],
        time_spent: Duration::from_secs(42),
        test_status: TestStatus {
            passed: 7,
            failed: 2,
        },
    }
}

fn exercise(store: &mut dyn CheckpointStore) {
    assert!(store.load_latest("api").unwrap().is_none());
    assert_eq!(store.latest_iteration("api").unwrap(), 0);

    store
        .save(Checkpoint::from_data("api", 1, progress(&["a"], &["b", "c"])))
        .unwrap();
    store
        .save(Checkpoint::from_data("api", 2, progress(&["a", "b"], &["c"])))
        .unwrap();

    let latest = store.load_latest("api").unwrap().unwrap();
    assert_eq!(latest.iteration, 2);
    assert_eq!(latest.completed_tasks, vec!["a", "b"]);
    assert_eq!(latest.remaining_tasks, vec!["c"]);
    assert_eq!(latest.time_spent, Duration::from_secs(42));

    let err = store
        .save(Checkpoint::from_data("api", 1, progress(&[], &[])))
        .unwrap_err();
    assert!(matches!(
        err,
        OrchestratorError::StaleIteration {
            attempted: 1,
            latest: 2,
            ..
        }
    ));

    let iterations: Vec<u32> = store
        .history("api")
        .unwrap()
        .iter()
        .map(|c| c.iteration)
        .collect();
    assert_eq!(iterations, vec![1, 2]);

    store.delete_all("api").unwrap();
    assert!(store.load_latest("api").unwrap().is_none());
    store.delete_all("api").unwrap();
}

#[test]
fn test_in_memory_store_contract() {
    exercise(&mut InMemoryCheckpointStore::new());
}

#[test]
fn test_jsonl_store_contract() {
    let dir = tempfile::tempdir().unwrap();
    exercise(&mut JsonlCheckpointStore::new(dir.path()).unwrap());
}

#[test]
fn test_jsonl_store_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    {
        let mut store = JsonlCheckpointStore::new(dir.path()).unwrap();
        store
            .save(Checkpoint::from_data("web", 1, progress(&["layout"], &["forms"])))
            .unwrap();
    }

    let reopened = JsonlCheckpointStore::new(dir.path()).unwrap();
    let latest = reopened.load_latest("web").unwrap().unwrap();
    assert_eq!(latest.remaining_tasks, vec!["forms"]);
    assert_eq!(latest.test_status.failed, 2);

    let ctx = generate_resume_context(&latest);
    assert_eq!(ctx.next_task(), Some("forms"));
    assert_eq!(ctx.modified_resources, vec!["src/lib.rs"]);
}
