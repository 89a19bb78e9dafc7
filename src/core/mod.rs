//! Core orchestration model: units, the dependency graph, budgets, checkpoints, and admission.

pub mod audit;
pub mod budget;
pub mod checkpoint;
pub mod error;
pub mod executor;
pub mod graph;
pub mod queue;
pub mod registry;
pub mod scheduler;
pub mod unit;

pub use audit::{
    build_audit_event, AuditAction, AuditEvent, AuditSink, InMemoryAuditSink, SharedAuditSink,
};
pub use budget::{BudgetAction, BudgetDecision, BudgetThresholds, BudgetTier, BudgetTracker};
pub use checkpoint::{
    generate_resume_context, Checkpoint, CheckpointData, CheckpointStore, ResumeContext, TestStatus,
};
pub use error::{AppResult, OrchestratorError, OrchestratorResult};
pub use executor::{Spawn, SplitAnalyzer, UnitOutcome, WorkExecutor};
pub use graph::{DependencyGraph, LevelViolation, SplitPlan};
pub use queue::{AdmissionQueue, QueuedLaunch};
pub use registry::RegistryStore;
pub use scheduler::{
    Admission, LaunchOutcome, Scheduler, SchedulerLimits, StatusSummary, TransitionReport,
    UnitReport,
};
pub use unit::{LaunchTask, UnitId, UnitLevel, UnitStatus, WorkUnit};
