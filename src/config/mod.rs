//! Configuration models for admission limits, budgets, and storage backends.

pub mod orchestrator;

pub use orchestrator::{BudgetConfig, OrchestratorConfig, StorageBackendConfig};
