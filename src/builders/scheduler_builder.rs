//! Build a scheduler from configuration, restoring any persisted registry.

use anyhow::Context;

use crate::config::{OrchestratorConfig, StorageBackendConfig};
use crate::core::{AppResult, AuditSink, CheckpointStore, RegistryStore, Scheduler};
use crate::infra::{InMemoryCheckpointStore, InMemoryRegistry, JsonFileRegistry, JsonlCheckpointStore};

/// Assembles a [`Scheduler`]. Storage comes from the config unless overridden.
pub struct SchedulerBuilder {
    config: OrchestratorConfig,
    checkpoints: Option<Box<dyn CheckpointStore>>,
    registry: Option<Box<dyn RegistryStore>>,
    audit: Option<Box<dyn AuditSink>>,
}

impl SchedulerBuilder {
    /// Start from a configuration.
    #[must_use]
    pub fn new(config: OrchestratorConfig) -> Self {
        Self {
            config,
            checkpoints: None,
            registry: None,
            audit: None,
        }
    }

    /// Use this checkpoint store instead of the configured backend.
    #[must_use]
    pub fn with_checkpoint_store(mut self, store: Box<dyn CheckpointStore>) -> Self {
        self.checkpoints = Some(store);
        self
    }

    /// Use this registry instead of the configured backend.
    #[must_use]
    pub fn with_registry(mut self, registry: Box<dyn RegistryStore>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Record scheduler decisions to `sink`.
    #[must_use]
    pub fn with_audit(mut self, sink: Box<dyn AuditSink>) -> Self {
        self.audit = Some(sink);
        self
    }

    /// Validate the config, open storage, and restore persisted units.
    pub fn build(self) -> AppResult<Scheduler> {
        self.config.validate().context("invalid orchestrator config")?;
        let checkpoints = match self.checkpoints {
            Some(store) => store,
            None => open_checkpoints(&self.config.storage)?,
        };
        let registry = match self.registry {
            Some(registry) => registry,
            None => open_registry(&self.config.storage)?,
        };

        let scheduler = Scheduler::restore(
            self.config.limits(),
            self.config.budget.tracker()?,
            checkpoints,
            registry,
        )
        .context("restoring scheduler state")?;
        tracing::info!(
            "scheduler ready: concurrency limit {}, hard limit {}",
            self.config.concurrency_limit,
            self.config.budget.hard_limit
        );
        Ok(match self.audit {
            Some(sink) => scheduler.with_audit(sink),
            None => scheduler,
        })
    }
}

/// Build a scheduler straight from configuration.
pub fn build_scheduler(config: &OrchestratorConfig) -> AppResult<Scheduler> {
    SchedulerBuilder::new(config.clone()).build()
}

fn open_checkpoints(storage: &StorageBackendConfig) -> AppResult<Box<dyn CheckpointStore>> {
    let store: Box<dyn CheckpointStore> = match storage {
        StorageBackendConfig::InMemory => Box::new(InMemoryCheckpointStore::new()),
        StorageBackendConfig::File { checkpoint_dir, .. } => Box::new(
            JsonlCheckpointStore::new(checkpoint_dir)
                .with_context(|| format!("opening checkpoints at {}", checkpoint_dir.display()))?,
        ),
    };
    Ok(store)
}

fn open_registry(storage: &StorageBackendConfig) -> AppResult<Box<dyn RegistryStore>> {
    let registry: Box<dyn RegistryStore> = match storage {
        StorageBackendConfig::InMemory => Box::new(InMemoryRegistry::new()),
        StorageBackendConfig::File { registry_path, .. } => Box::new(
            JsonFileRegistry::new(registry_path)
                .with_context(|| format!("opening registry at {}", registry_path.display()))?,
        ),
    };
    Ok(registry)
}
