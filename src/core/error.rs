//! Error types for orchestrator operations.

use thiserror::Error;

use crate::core::graph::LevelViolation;
use crate::core::unit::{UnitId, UnitStatus};

/// Errors produced by orchestrator components.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// No live unit carries this id.
    #[error("unknown unit: {0}")]
    UnknownUnit(UnitId),
    /// A unit with this id already exists (live or archived).
    #[error("duplicate unit: {0}")]
    DuplicateUnit(UnitId),
    /// An edge would point at a higher-level unit.
    #[error("level violation: {0}")]
    LevelViolation(LevelViolation),
    /// The dependency relation is not acyclic.
    #[error("cycle detected: {}", render_cycles(.0))]
    CycleDetected(Vec<Vec<UnitId>>),
    /// Budget thresholds are not strictly ascending or otherwise unusable.
    #[error("invalid threshold config: {0}")]
    InvalidThresholdConfig(String),
    /// A checkpoint with the same or a newer iteration already exists.
    #[error("stale checkpoint for {unit_id}: iteration {attempted} is not newer than {latest}")]
    StaleIteration {
        /// Owning unit.
        unit_id: UnitId,
        /// Iteration the caller tried to save.
        attempted: u32,
        /// Latest stored iteration.
        latest: u32,
    },
    /// The unit's current status does not allow the requested transition.
    #[error("invalid transition for {unit_id}: {from} -> {to}")]
    InvalidTransition {
        /// Unit being transitioned.
        unit_id: UnitId,
        /// Current status.
        from: UnitStatus,
        /// Requested status.
        to: UnitStatus,
    },
    /// The unit cannot be removed or replaced right now.
    #[error("unit {unit_id} is in use: {reason}")]
    UnitInUse {
        /// Unit that was targeted.
        unit_id: UnitId,
        /// Why the operation was refused.
        reason: String,
    },
    /// A split plan could not be applied.
    #[error("invalid split plan: {0}")]
    InvalidSplitPlan(String),
    /// Configuration failed validation.
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    /// Storage or runtime failure with context.
    #[error("backend error: {0}")]
    Backend(String),
}

impl OrchestratorError {
    /// Wrap any displayable backend failure.
    pub fn backend(err: impl std::fmt::Display) -> Self {
        Self::Backend(err.to_string())
    }
}

fn render_cycles(cycles: &[Vec<UnitId>]) -> String {
    cycles
        .iter()
        .map(|cycle| cycle.join(" -> "))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result alias for orchestrator operations.
pub type OrchestratorResult<T> = Result<T, OrchestratorError>;

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
