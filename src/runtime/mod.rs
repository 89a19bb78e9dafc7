//! Tokio runtime adapters and API surface.

pub mod api;
pub mod dispatcher;
pub mod tokio_spawner;

pub use api::{health, submit_launch, unit_status, LaunchRequest, LaunchResponse, UnitStatusResponse};
pub use dispatcher::{Dispatcher, UnitEvent};
pub use tokio_spawner::TokioSpawner;
