//! In-memory unit registry.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::core::error::OrchestratorResult;
use crate::core::registry::RegistryStore;
use crate::core::unit::WorkUnit;

#[derive(Debug, Default)]
struct Inner {
    units: Vec<WorkUnit>,
    flushes: usize,
}

/// Registry held in memory. Clones share state, so a test can keep one handle
/// and give another to a scheduler.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRegistry {
    inner: Arc<Mutex<Inner>>,
}

impl InMemoryRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry pre-populated with `units`, as if loaded from disk.
    #[must_use]
    pub fn with_units(units: Vec<WorkUnit>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner { units, flushes: 0 })),
        }
    }

    /// Last flushed records.
    #[must_use]
    pub fn snapshot(&self) -> Vec<WorkUnit> {
        self.inner.lock().units.clone()
    }

    /// Number of flushes so far.
    #[must_use]
    pub fn flush_count(&self) -> usize {
        self.inner.lock().flushes
    }
}

impl RegistryStore for InMemoryRegistry {
    fn load(&self) -> OrchestratorResult<Vec<WorkUnit>> {
        Ok(self.snapshot())
    }

    fn flush(&mut self, units: &[WorkUnit]) -> OrchestratorResult<()> {
        let mut inner = self.inner.lock();
        inner.units = units.to_vec();
        inner.flushes += 1;
        Ok(())
    }
}
