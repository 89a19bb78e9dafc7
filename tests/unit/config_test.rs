//! Tests for configuration validation

use std::path::PathBuf;
use std::time::Duration;

use prometheus_build_orchestrator::config::{
    BudgetConfig, OrchestratorConfig, StorageBackendConfig,
};
use prometheus_build_orchestrator::core::OrchestratorError;

#[test]
fn test_config_validation() {
    let valid = OrchestratorConfig {
        concurrency_limit: 4,
        max_retries: 1,
        idle_timeout_secs: 600,
        budget: BudgetConfig::default(),
        storage: StorageBackendConfig::InMemory,
    };
    assert!(valid.validate().is_ok());
    assert_eq!(valid.limits().idle_timeout, Duration::from_secs(600));
    assert_eq!(valid.thresholds().split_trigger, 120_000);
}

#[test]
fn test_config_invalid_concurrency() {
    let invalid = OrchestratorConfig {
        concurrency_limit: 0,
        ..OrchestratorConfig::default()
    };
    assert!(matches!(
        invalid.validate(),
        Err(OrchestratorError::InvalidConfig(_))
    ));
}

#[test]
fn test_config_invalid_timeout() {
    let invalid = OrchestratorConfig {
        idle_timeout_secs: 0,
        ..OrchestratorConfig::default()
    };
    assert!(invalid.validate().is_err());
}

#[test]
fn test_config_from_json() {
    let json = r#"{
        "concurrency_limit": 2,
        "max_retries": 3,
        "idle_timeout_secs": 120,
        "budget": {
            "optimal": 40000,
            "warning": 60000,
            "split_trigger": 80000,
            "emergency": 90000,
            "safety_margin": 5000,
            "hard_limit": 100000
        },
        "storage": {
            "kind": "file",
            "registry_path": "/var/lib/orchestrator/units.json",
            "checkpoint_dir": "/var/lib/orchestrator/checkpoints"
        }
    }"#;

    let cfg = OrchestratorConfig::from_json_str(json).unwrap();
    assert_eq!(cfg.concurrency_limit, 2);
    assert_eq!(cfg.budget.safety_margin, 5_000);
    assert_eq!(
        cfg.storage,
        StorageBackendConfig::File {
            registry_path: PathBuf::from("/var/lib/orchestrator/units.json"),
            checkpoint_dir: PathBuf::from("/var/lib/orchestrator/checkpoints"),
        }
    );
}

#[test]
fn test_config_from_json_invalid() {
    assert!(matches!(
        OrchestratorConfig::from_json_str("{ not json"),
        Err(OrchestratorError::InvalidConfig(_))
    ));
}

#[test]
fn test_config_from_missing_file() {
    let err = OrchestratorConfig::from_json_file("/definitely/not/here.json").unwrap_err();
    assert!(err.to_string().contains("reading config file"));
}

#[test]
fn test_config_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("orchestrator.json");
    std::fs::write(&path, r#"{"max_retries": 0}"#).unwrap();

    let cfg = OrchestratorConfig::from_json_file(&path).unwrap();
    assert_eq!(cfg.max_retries, 0);
    assert_eq!(cfg.concurrency_limit, 3);
}

#[test]
fn test_env_overrides() {
    std::env::set_var("ORCHESTRATOR_CONCURRENCY_LIMIT", "7");
    std::env::set_var("ORCHESTRATOR_HARD_LIMIT", "250000");
    let cfg = OrchestratorConfig::from_env();
    std::env::remove_var("ORCHESTRATOR_CONCURRENCY_LIMIT");
    std::env::remove_var("ORCHESTRATOR_HARD_LIMIT");

    let cfg = cfg.unwrap();
    assert_eq!(cfg.concurrency_limit, 7);
    assert_eq!(cfg.budget.hard_limit, 250_000);
    assert_eq!(cfg.max_retries, 2);
}
