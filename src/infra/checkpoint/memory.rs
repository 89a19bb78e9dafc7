//! In-memory checkpoint store.

use std::collections::HashMap;

use crate::core::checkpoint::{ensure_newer, Checkpoint, CheckpointStore};
use crate::core::error::OrchestratorResult;
use crate::core::unit::UnitId;

/// Checkpoint store keeping every unit's log in memory. Lost on restart.
#[derive(Debug, Default)]
pub struct InMemoryCheckpointStore {
    logs: HashMap<UnitId, Vec<Checkpoint>>,
}

impl InMemoryCheckpointStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of units with at least one checkpoint.
    #[must_use]
    pub fn unit_count(&self) -> usize {
        self.logs.len()
    }
}

impl CheckpointStore for InMemoryCheckpointStore {
    fn save(&mut self, checkpoint: Checkpoint) -> OrchestratorResult<()> {
        let log = self.logs.entry(checkpoint.unit_id.clone()).or_default();
        let latest = log.last().map_or(0, |c| c.iteration);
        ensure_newer(&checkpoint.unit_id, checkpoint.iteration, latest)?;
        log.push(checkpoint);
        Ok(())
    }

    fn load_latest(&self, unit_id: &str) -> OrchestratorResult<Option<Checkpoint>> {
        Ok(self.logs.get(unit_id).and_then(|log| log.last()).cloned())
    }

    fn history(&self, unit_id: &str) -> OrchestratorResult<Vec<Checkpoint>> {
        Ok(self.logs.get(unit_id).cloned().unwrap_or_default())
    }

    fn delete_all(&mut self, unit_id: &str) -> OrchestratorResult<()> {
        self.logs.remove(unit_id);
        Ok(())
    }
}
