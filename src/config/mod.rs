//! Configuration for a phase worker
//!
//! - [`schema`] - typed `WorkerConfig` with defaults and validation
//! - [`loader`] - YAML file loading

pub mod loader;
pub mod schema;

pub use loader::load;
pub use schema::{CycleConfig, DEFAULT_RECEIVE_TIMEOUT, WorkerConfig};
