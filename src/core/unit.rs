//! Work unit model shared by the dependency graph, budget tracker, and scheduler.
//!
//! A [`WorkUnit`] serializes to exactly one registry record, so the same type is
//! used in memory and on disk.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable, operator-assigned unit identifier.
pub type UnitId = String;

/// Ordinal rank of a unit. A unit may only depend on units of the same or a lower level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum UnitLevel {
    /// Foundational building blocks.
    Base = 0,
    /// Core services built on base units.
    Core = 1,
    /// User-facing features.
    Feature = 2,
    /// Cross-feature integration work.
    Integration = 3,
    /// Top-level application assembly.
    Application = 4,
}

impl UnitLevel {
    /// Numeric rank of this level.
    #[must_use]
    pub const fn rank(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for UnitLevel {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Base),
            1 => Ok(Self::Core),
            2 => Ok(Self::Feature),
            3 => Ok(Self::Integration),
            4 => Ok(Self::Application),
            other => Err(format!("unit level must be within 0..=4 (got {other})")),
        }
    }
}

impl From<UnitLevel> for u8 {
    fn from(level: UnitLevel) -> Self {
        level.rank()
    }
}

impl fmt::Display for UnitLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Base => "base",
            Self::Core => "core",
            Self::Feature => "feature",
            Self::Integration => "integration",
            Self::Application => "application",
        };
        write!(f, "{name}({})", self.rank())
    }
}

/// Lifecycle status of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitStatus {
    /// Declared, or waiting on dependencies.
    Pending,
    /// Eligible and waiting for a free slot.
    Queued,
    /// Admitted and executing externally.
    Running,
    /// Suspended with a saved checkpoint.
    Checkpointed,
    /// Finished successfully.
    Complete,
    /// Failed with the retry budget exhausted.
    Failed,
}

impl UnitStatus {
    /// Whether the unit currently holds or waits for a scheduler slot.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Queued | Self::Running)
    }

    /// Lowercase name used in logs and audit events.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Checkpointed => "checkpointed",
            Self::Complete => "complete",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for UnitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One schedulable piece of work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkUnit {
    /// Unique stable name.
    pub id: UnitId,
    /// Ordinal rank constraining which units this one may depend on.
    pub level: UnitLevel,
    /// Current lifecycle status.
    pub status: UnitStatus,
    /// Admission priority; lower admits first.
    pub priority: i32,
    /// Operator-supplied or measured size in abstract cost units.
    pub declared_size: u64,
    /// Ids of units that must be complete before this one may start.
    #[serde(default)]
    pub dependencies: BTreeSet<UnitId>,
    /// Automatic retries consumed so far.
    #[serde(default)]
    pub retry_count: u32,
    /// Removed by the operator or replaced by a split. Archived ids stay
    /// reserved forever.
    #[serde(default, skip_serializing_if = "is_false")]
    pub archived: bool,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
const fn is_false(value: &bool) -> bool {
    !*value
}

impl WorkUnit {
    /// Declare a new pending unit with no dependencies and priority 0.
    pub fn new(id: impl Into<UnitId>, level: UnitLevel, declared_size: u64) -> Self {
        Self {
            id: id.into(),
            level,
            status: UnitStatus::Pending,
            priority: 0,
            declared_size,
            dependencies: BTreeSet::new(),
            retry_count: 0,
            archived: false,
        }
    }

    /// Set the admission priority.
    #[must_use]
    pub const fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Declare dependencies on other units.
    #[must_use]
    pub fn with_dependencies<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<UnitId>,
    {
        self.dependencies.extend(deps.into_iter().map(Into::into));
        self
    }
}

/// The piece of work requested for a unit in a launch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchTask {
    /// Free-form description handed to the executor.
    pub description: String,
    /// Estimated size growth this task adds to the unit.
    pub estimated_cost: u64,
}

impl LaunchTask {
    /// Create a task description with its estimated cost.
    pub fn new(description: impl Into<String>, estimated_cost: u64) -> Self {
        Self {
            description: description.into(),
            estimated_cost,
        }
    }
}
