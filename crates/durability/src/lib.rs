//! Dataset persistence for ListServ
//!
//! This crate provides:
//! - DatasetStore: the persistence contract used by the cache and the engine
//! - FileStore: one JSON document per dataset plus rolling backups
//! - InMemoryStore: process-local store for ephemeral engines and tests
//! - StoreConfig / RetryConfig: size limits, backup retention, retry backoff

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod file_store;
pub mod memory;
pub mod paths;
pub mod retry;
pub mod store;

pub use config::{RetryConfig, StoreConfig};
pub use file_store::FileStore;
pub use memory::InMemoryStore;
pub use paths::StorePaths;
pub use retry::with_retry;
pub use store::DatasetStore;
