//! Collaborator interfaces: the work executor, the split analyzer, and task spawning.

use std::future::Future;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::budget::BudgetDecision;
use crate::core::checkpoint::{CheckpointData, ResumeContext};
use crate::core::error::OrchestratorResult;
use crate::core::graph::SplitPlan;
use crate::core::unit::{LaunchTask, WorkUnit};

/// The single outcome an executor reports for one admission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum UnitOutcome {
    /// The unit's work is done.
    Completed,
    /// The attempt failed.
    Failed {
        /// Executor-supplied reason.
        reason: String,
    },
    /// The unit stopped early and left progress to resume from.
    Suspended {
        /// Progress to checkpoint.
        checkpoint: CheckpointData,
    },
}

/// Runs a unit's work. Opaque to the scheduler and assumed to do no retries of its own.
///
/// # Example
///
/// ```rust,ignore
/// use async_trait::async_trait;
/// use prometheus_build_orchestrator::core::{
///     LaunchTask, ResumeContext, UnitOutcome, WorkExecutor, WorkUnit,
/// };
///
/// #[derive(Clone)]
/// struct AgentExecutor;
///
/// #[async_trait]
/// impl WorkExecutor for AgentExecutor {
///     async fn execute(
///         &self,
///         unit: WorkUnit,
///         task: LaunchTask,
///         resume: Option<ResumeContext>,
///     ) -> UnitOutcome {
///         // hand `task.description` and `resume` to the agent...
///         UnitOutcome::Completed
///     }
/// }
/// ```
#[async_trait]
pub trait WorkExecutor: Send + Sync + Clone + 'static {
    /// Execute `task` for `unit`, resuming from `resume` when present.
    async fn execute(
        &self,
        unit: WorkUnit,
        task: LaunchTask,
        resume: Option<ResumeContext>,
    ) -> UnitOutcome;
}

/// Decides how to break up a unit the budget gate refused.
#[async_trait]
pub trait SplitAnalyzer: Send + Sync + 'static {
    /// Produce a replacement plan for `unit`.
    async fn plan_split(
        &self,
        unit: &WorkUnit,
        decision: &BudgetDecision,
    ) -> OrchestratorResult<SplitPlan>;
}

/// Abstraction for spawning executor futures on a runtime.
pub trait Spawn {
    /// Spawn a detached future.
    fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static;
}
