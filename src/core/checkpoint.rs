//! Checkpoints: immutable partial-progress snapshots used to resume a unit.
//!
//! Checkpoints form an append-only log per unit. Only the highest iteration
//! matters for resume; older entries may be pruned without breaking anything.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::error::{OrchestratorError, OrchestratorResult};
use crate::core::unit::UnitId;

/// Test pass/fail counts at checkpoint time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestStatus {
    /// Passing tests.
    pub passed: u32,
    /// Failing tests.
    pub failed: u32,
}

/// Progress reported by an executor when it suspends a unit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckpointData {
    /// Tasks already done, in order.
    pub completed_tasks: Vec<String>,
    /// Tasks still pending, in order.
    pub remaining_tasks: Vec<String>,
    /// Resources touched so far (audit only).
    pub modified_resources: Vec<String>,
    /// Time spent on the unit so far.
    #[serde(rename = "timeSpentSeconds", with = "crate::util::serde::duration_secs")]
    pub time_spent: Duration,
    /// Test results at suspension.
    pub test_status: TestStatus,
}

/// A stored checkpoint. One JSON line per record in file-backed stores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Checkpoint {
    /// Owning unit.
    pub unit_id: UnitId,
    /// Strictly increasing per unit, starting at 1.
    pub iteration: u32,
    /// Tasks already done, in order.
    pub completed_tasks: Vec<String>,
    /// Tasks still pending, in order.
    pub remaining_tasks: Vec<String>,
    /// Resources touched so far (audit only).
    pub modified_resources: Vec<String>,
    /// Time spent on the unit so far.
    #[serde(rename = "timeSpentSeconds", with = "crate::util::serde::duration_secs")]
    pub time_spent: Duration,
    /// Test results at checkpoint time.
    pub test_status: TestStatus,
    /// When the checkpoint was taken.
    pub created_at: DateTime<Utc>,
}

impl Checkpoint {
    /// Stamp executor-reported progress with its owner, iteration, and the current time.
    pub fn from_data(unit_id: impl Into<UnitId>, iteration: u32, data: CheckpointData) -> Self {
        Self {
            unit_id: unit_id.into(),
            iteration,
            completed_tasks: data.completed_tasks,
            remaining_tasks: data.remaining_tasks,
            modified_resources: data.modified_resources,
            time_spent: data.time_spent,
            test_status: data.test_status,
            created_at: crate::util::clock::now_utc(),
        }
    }
}

/// Structured resume input for an executor. Rendering it into prose is the
/// executor's concern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeContext {
    /// Unit being resumed.
    pub unit_id: UnitId,
    /// Iteration the context was generated from.
    pub iteration: u32,
    /// Tasks that must not be redone.
    pub completed_tasks: Vec<String>,
    /// Tasks left to do, in order.
    pub remaining_tasks: Vec<String>,
    /// Resources touched before suspension.
    pub modified_resources: Vec<String>,
    /// Test results at suspension.
    pub test_status: TestStatus,
}

impl ResumeContext {
    /// First task still to do.
    #[must_use]
    pub fn next_task(&self) -> Option<&str> {
        self.remaining_tasks.first().map(String::as_str)
    }
}

/// Pure transformation of a checkpoint into resume input.
#[must_use]
pub fn generate_resume_context(checkpoint: &Checkpoint) -> ResumeContext {
    ResumeContext {
        unit_id: checkpoint.unit_id.clone(),
        iteration: checkpoint.iteration,
        completed_tasks: checkpoint.completed_tasks.clone(),
        remaining_tasks: checkpoint.remaining_tasks.clone(),
        modified_resources: checkpoint.modified_resources.clone(),
        test_status: checkpoint.test_status,
    }
}

/// Append-only checkpoint storage.
pub trait CheckpointStore: Send {
    /// Append a checkpoint. Fails with `StaleIteration` unless its iteration is
    /// newer than every stored one for the unit.
    fn save(&mut self, checkpoint: Checkpoint) -> OrchestratorResult<()>;

    /// Highest-iteration checkpoint for the unit.
    fn load_latest(&self, unit_id: &str) -> OrchestratorResult<Option<Checkpoint>>;

    /// All stored checkpoints for the unit, oldest first.
    fn history(&self, unit_id: &str) -> OrchestratorResult<Vec<Checkpoint>>;

    /// Remove every checkpoint for the unit. No-op if there are none.
    fn delete_all(&mut self, unit_id: &str) -> OrchestratorResult<()>;

    /// Latest stored iteration, or 0 when the unit has no checkpoints.
    fn latest_iteration(&self, unit_id: &str) -> OrchestratorResult<u32> {
        Ok(self.load_latest(unit_id)?.map_or(0, |c| c.iteration))
    }
}

/// Shared freshness rule for store implementations.
pub(crate) fn ensure_newer(unit_id: &str, attempted: u32, latest: u32) -> OrchestratorResult<()> {
    if attempted <= latest {
        return Err(OrchestratorError::StaleIteration {
            unit_id: unit_id.to_string(),
            attempted,
            latest,
        });
    }
    Ok(())
}
