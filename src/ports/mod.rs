//! Ports - the seams between the relay and the outside world.

pub mod provider;
pub mod storage;

pub use provider::{ProviderError, TransformJob, TransformProvider};
pub use storage::{ObjectStore, StorageError};
