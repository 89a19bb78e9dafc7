//! Unit registry backends.

pub mod json;
pub mod memory;

pub use json::JsonFileRegistry;
pub use memory::InMemoryRegistry;
