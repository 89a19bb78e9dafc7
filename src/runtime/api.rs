//! API-facing request/response models.

use serde::{Deserialize, Serialize};

use crate::core::{
    BudgetAction, BudgetDecision, BudgetTier, LaunchOutcome, LaunchTask, Scheduler, Spawn,
    UnitId, UnitStatus, WorkExecutor,
};
use crate::runtime::Dispatcher;

/// Launch request payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchRequest {
    /// Unit to launch.
    pub unit_id: UnitId,
    /// Work to do.
    pub task: LaunchTask,
    /// Admission priority; lower admits first.
    #[serde(default)]
    pub priority: i32,
}

/// Launch response, one variant per launch outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "result")]
pub enum LaunchResponse {
    /// Running now.
    Admitted {
        /// Admission ticket.
        ticket: u64,
        /// Whether the executor resumes from a checkpoint.
        resumed: bool,
    },
    /// Waiting for capacity.
    Queued {
        /// Zero-based queue position.
        position: usize,
    },
    /// Waiting on dependencies.
    Blocked {
        /// Dependencies not yet complete.
        unmet: Vec<UnitId>,
    },
    /// Refused by the budget gate.
    SplitRequired {
        /// The refusing decision.
        decision: BudgetDecision,
    },
}

impl From<&LaunchOutcome> for LaunchResponse {
    fn from(outcome: &LaunchOutcome) -> Self {
        match outcome {
            LaunchOutcome::Admitted(admission) => Self::Admitted {
                ticket: admission.ticket,
                resumed: admission.resume.is_some(),
            },
            LaunchOutcome::Queued { position } => Self::Queued {
                position: *position,
            },
            LaunchOutcome::BlockedOnDependencies { unmet } => Self::Blocked {
                unmet: unmet.clone(),
            },
            LaunchOutcome::SplitRequired(decision) => Self::SplitRequired {
                decision: *decision,
            },
        }
    }
}

/// Unit status response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitStatusResponse {
    /// Unit identifier.
    pub unit_id: UnitId,
    /// Current status.
    pub status: UnitStatus,
    /// Size tier.
    pub tier: BudgetTier,
    /// Recommended action for the tier.
    pub action: BudgetAction,
    /// Latest checkpoint iteration, 0 if none.
    pub latest_iteration: u32,
    /// Dependencies not yet complete.
    pub unmet_dependencies: Vec<UnitId>,
}

/// Health response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Health {
    /// Healthy flag.
    pub ok: bool,
    /// Running units.
    pub active: usize,
    /// Queued units.
    pub queued: usize,
    /// Configured concurrency limit.
    pub concurrency_limit: usize,
}

/// Submit a launch through a dispatcher.
pub async fn submit_launch<E, S>(
    dispatcher: &Dispatcher<E, S>,
    req: LaunchRequest,
) -> Result<LaunchResponse, String>
where
    E: WorkExecutor,
    S: Spawn,
{
    dispatcher
        .launch(&req.unit_id, req.task, req.priority)
        .await
        .map(|outcome| LaunchResponse::from(&outcome))
        .map_err(|e| e.to_string())
}

/// Look up one unit's status.
pub fn unit_status(scheduler: &Scheduler, unit_id: &str) -> Result<UnitStatusResponse, String> {
    let report = scheduler.unit_report(unit_id).map_err(|e| e.to_string())?;
    Ok(UnitStatusResponse {
        unit_id: report.unit.id,
        status: report.unit.status,
        tier: report.tier,
        action: report.action,
        latest_iteration: report.latest_iteration,
        unmet_dependencies: report.unmet_dependencies,
    })
}

/// Return a health payload.
pub fn health(scheduler: &Scheduler) -> Health {
    let summary = scheduler.status_summary();
    Health {
        ok: true,
        active: summary.active.len(),
        queued: summary.queued.len(),
        concurrency_limit: summary.concurrency_limit,
    }
}
