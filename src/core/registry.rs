//! Persisted unit registry.

use crate::core::error::OrchestratorResult;
use crate::core::unit::WorkUnit;

/// Storage for the unit registry: loaded once at start, flushed on every change.
pub trait RegistryStore: Send {
    /// Load every persisted unit record.
    fn load(&self) -> OrchestratorResult<Vec<WorkUnit>>;

    /// Replace the persisted records with `units`.
    fn flush(&mut self, units: &[WorkUnit]) -> OrchestratorResult<()>;
}
