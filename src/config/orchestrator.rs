//! Orchestrator configuration: admission limits, budget thresholds, and storage.
//!
//! Configuration is layered: built-in defaults, then a JSON document, then
//! `ORCHESTRATOR_*` environment variables (a `.env` file is honoured).

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::core::budget::{BudgetThresholds, BudgetTracker};
use crate::core::error::{AppResult, OrchestratorError, OrchestratorResult};
use crate::core::scheduler::SchedulerLimits;

/// Budget thresholds and the admission ceiling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetConfig {
    /// Upper bound of the green tier.
    pub optimal: u64,
    /// Upper bound of the yellow tier.
    pub warning: u64,
    /// Sizes from here on should be split before more work is scheduled.
    pub split_trigger: u64,
    /// Sizes from here on are red: never scheduled, and suspended mid-run.
    pub emergency: u64,
    /// Slack added to every admission projection.
    pub safety_margin: u64,
    /// Ceiling for `current + cost + margin`.
    pub hard_limit: u64,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        let t = BudgetThresholds::default();
        Self {
            optimal: t.optimal,
            warning: t.warning,
            split_trigger: t.split_trigger,
            emergency: t.emergency,
            safety_margin: 20_000,
            hard_limit: 180_000,
        }
    }
}

impl BudgetConfig {
    /// Threshold view of this config.
    #[must_use]
    pub const fn thresholds(&self) -> BudgetThresholds {
        BudgetThresholds {
            optimal: self.optimal,
            warning: self.warning,
            split_trigger: self.split_trigger,
            emergency: self.emergency,
        }
    }

    /// Build a validated tracker.
    pub fn tracker(&self) -> OrchestratorResult<BudgetTracker> {
        BudgetTracker::new(self.thresholds(), self.safety_margin, self.hard_limit)
    }
}

/// Storage backend selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum StorageBackendConfig {
    /// Nothing survives a restart. For development and tests.
    InMemory,
    /// JSON registry file plus a directory of JSONL checkpoint logs.
    File {
        /// Registry document path.
        registry_path: PathBuf,
        /// Checkpoint directory.
        checkpoint_dir: PathBuf,
    },
}

impl Default for StorageBackendConfig {
    fn default() -> Self {
        Self::InMemory
    }
}

/// Root orchestrator configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Maximum concurrently running units.
    pub concurrency_limit: usize,
    /// Automatic retries per unit before failure is terminal.
    pub max_retries: u32,
    /// Seconds without progress before a running unit is expired.
    pub idle_timeout_secs: u64,
    /// Budget thresholds and ceiling.
    pub budget: BudgetConfig,
    /// Storage backends.
    pub storage: StorageBackendConfig,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        let limits = SchedulerLimits::default();
        Self {
            concurrency_limit: limits.concurrency_limit,
            max_retries: limits.max_retries,
            idle_timeout_secs: limits.idle_timeout.as_secs(),
            budget: BudgetConfig::default(),
            storage: StorageBackendConfig::default(),
        }
    }
}

impl OrchestratorConfig {
    /// Validate every field.
    pub fn validate(&self) -> OrchestratorResult<()> {
        self.limits().validate()?;
        self.budget.tracker()?;
        if let StorageBackendConfig::File {
            registry_path,
            checkpoint_dir,
        } = &self.storage
        {
            if registry_path.as_os_str().is_empty() || checkpoint_dir.as_os_str().is_empty() {
                return Err(OrchestratorError::InvalidConfig(
                    "file storage needs both registry_path and checkpoint_dir".into(),
                ));
            }
        }
        Ok(())
    }

    /// Parse configuration from a JSON string and validate.
    pub fn from_json_str(input: &str) -> OrchestratorResult<Self> {
        let cfg: Self = serde_json::from_str(input)
            .map_err(|e| OrchestratorError::InvalidConfig(format!("parse error: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Read, parse, and validate a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        Self::from_json_str(&raw).with_context(|| format!("loading config {}", path.display()))
    }

    /// Defaults overridden by `ORCHESTRATOR_*` environment variables.
    pub fn from_env() -> AppResult<Self> {
        Self::default().with_env_overrides()
    }

    /// Apply `ORCHESTRATOR_*` environment overrides on top of `self`, then validate.
    ///
    /// Recognised: `CONCURRENCY_LIMIT`, `MAX_RETRIES`, `IDLE_TIMEOUT_SECS`,
    /// `BUDGET_OPTIMAL`, `BUDGET_WARNING`, `BUDGET_SPLIT_TRIGGER`,
    /// `BUDGET_EMERGENCY`, `SAFETY_MARGIN`, `HARD_LIMIT`, and `STATE_DIR` (which
    /// selects file storage under that directory).
    pub fn with_env_overrides(mut self) -> AppResult<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!("loaded environment from {}", path.display());
        }
        override_from_env(&mut self.concurrency_limit, "ORCHESTRATOR_CONCURRENCY_LIMIT")?;
        override_from_env(&mut self.max_retries, "ORCHESTRATOR_MAX_RETRIES")?;
        override_from_env(&mut self.idle_timeout_secs, "ORCHESTRATOR_IDLE_TIMEOUT_SECS")?;
        override_from_env(&mut self.budget.optimal, "ORCHESTRATOR_BUDGET_OPTIMAL")?;
        override_from_env(&mut self.budget.warning, "ORCHESTRATOR_BUDGET_WARNING")?;
        override_from_env(&mut self.budget.split_trigger, "ORCHESTRATOR_BUDGET_SPLIT_TRIGGER")?;
        override_from_env(&mut self.budget.emergency, "ORCHESTRATOR_BUDGET_EMERGENCY")?;
        override_from_env(&mut self.budget.safety_margin, "ORCHESTRATOR_SAFETY_MARGIN")?;
        override_from_env(&mut self.budget.hard_limit, "ORCHESTRATOR_HARD_LIMIT")?;
        if let Ok(dir) = dotenvy::var("ORCHESTRATOR_STATE_DIR") {
            let dir = PathBuf::from(dir);
            self.storage = StorageBackendConfig::File {
                registry_path: dir.join("units.json"),
                checkpoint_dir: dir.join("checkpoints"),
            };
        }
        self.validate().context("validating environment configuration")?;
        Ok(self)
    }

    /// Scheduler limits view of this config.
    #[must_use]
    pub const fn limits(&self) -> SchedulerLimits {
        SchedulerLimits {
            concurrency_limit: self.concurrency_limit,
            max_retries: self.max_retries,
            idle_timeout: Duration::from_secs(self.idle_timeout_secs),
        }
    }

    /// Threshold view of the budget config.
    #[must_use]
    pub const fn thresholds(&self) -> BudgetThresholds {
        self.budget.thresholds()
    }
}

fn override_from_env<T>(slot: &mut T, key: &str) -> AppResult<()>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    if let Ok(raw) = dotenvy::var(key) {
        *slot = raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has invalid value {raw:?}"))?;
    }
    Ok(())
}
