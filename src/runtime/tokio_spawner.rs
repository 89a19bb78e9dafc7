//! Tokio runtime spawner for executor futures.

use std::future::Future;

use crate::core::{OrchestratorError, OrchestratorResult, Spawn};

/// Spawns executor futures onto a tokio runtime.
#[derive(Clone, Debug)]
pub struct TokioSpawner {
    handle: tokio::runtime::Handle,
}

impl TokioSpawner {
    /// Spawn onto the runtime behind `handle`.
    #[must_use]
    pub const fn new(handle: tokio::runtime::Handle) -> Self {
        Self { handle }
    }

    /// Spawn onto the runtime the caller is running in.
    pub fn current() -> OrchestratorResult<Self> {
        tokio::runtime::Handle::try_current()
            .map(Self::new)
            .map_err(|e| OrchestratorError::Backend(format!("no tokio runtime: {e}")))
    }
}

impl Spawn for TokioSpawner {
    fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.handle.spawn(fut);
    }
}
