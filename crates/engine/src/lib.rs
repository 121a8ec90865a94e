//! Data engine for ListServ
//!
//! This crate composes the lower layers:
//! - DatasetCache: single-flight lazy loading, LRU bound, sliding expiry
//! - LinkEnricher: cross-dataset joins over cached datasets
//! - DataEngine: public operations, validation and the commit pipeline
//! - ListServConfig: `listserv.toml` handling
//!
//! The engine is the only component that knows about write ordering between
//! the in-memory copy and the store.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cache;
pub mod engine;
pub mod links;

pub use cache::{CacheLookup, CacheStats, CachedDataset, DatasetCache, PinGuard};
pub use engine::{
    CacheConfig, DataEngine, EngineConfig, ListServConfig, ReadOptions, WriteOrder,
    CONFIG_FILE_NAME,
};
pub use links::{LinkEnricher, LinkLookup, PreparedLinks};
