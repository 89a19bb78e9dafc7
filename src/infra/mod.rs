//! Storage adapters for checkpoints and the unit registry.

pub mod checkpoint;
pub mod registry;
pub use checkpoint::{InMemoryCheckpointStore, JsonlCheckpointStore};
pub use registry::{InMemoryRegistry, JsonFileRegistry};
