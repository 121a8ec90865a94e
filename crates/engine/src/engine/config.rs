//! Engine configuration via `listserv.toml`
//!
//! The file lives in the data directory. On first open a commented default is
//! written; edit it and restart to change settings.

use listserv_core::{ListServError, ListServResult, DEFAULT_MAX_LINKED_DATASETS, DEFAULT_MAX_SEARCH_RESULTS};
use listserv_durability::StoreConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Config file name placed in the data directory.
pub const CONFIG_FILE_NAME: &str = "listserv.toml";

/// Default bound on resident datasets
pub const DEFAULT_CACHE_MAX_ENTRIES: usize = 1000;

/// Default sliding expiration: 12 hours
pub const DEFAULT_CACHE_EXPIRATION_SECS: u64 = 12 * 60 * 60;

// ============================================================================
// Write ordering
// ============================================================================

/// Order of the in-memory mutation and the durable save
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteOrder {
    /// Mutate the cache, then save. A failed save leaves the cache ahead of
    /// the store until the dataset is evicted and reloaded.
    #[default]
    CacheThenPersist,
    /// Apply to a copy, save it, then mutate the cache. A failed save leaves
    /// the cache untouched.
    PersistThenCache,
}

// ============================================================================
// CacheConfig
// ============================================================================

/// Dataset cache bounds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum resident datasets; the least recently used is evicted on overflow
    pub max_entries: usize,
    /// Sliding expiration in seconds since last access (0 = never expire)
    pub expiration_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            max_entries: DEFAULT_CACHE_MAX_ENTRIES,
            expiration_secs: DEFAULT_CACHE_EXPIRATION_SECS,
        }
    }
}

impl CacheConfig {
    /// Sliding expiration, `None` when disabled
    pub fn expiration(&self) -> Option<Duration> {
        (self.expiration_secs > 0).then(|| Duration::from_secs(self.expiration_secs))
    }
}

// ============================================================================
// EngineConfig
// ============================================================================

/// Data engine options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Upper bound on `take` for list and search
    pub max_search_results: usize,
    /// Link specifiers processed per request; the rest are ignored
    pub max_linked_datasets: usize,
    /// Cache-then-persist or persist-then-cache
    pub write_order: WriteOrder,
    /// Cache bounds
    pub cache: CacheConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            max_search_results: DEFAULT_MAX_SEARCH_RESULTS,
            max_linked_datasets: DEFAULT_MAX_LINKED_DATASETS,
            write_order: WriteOrder::default(),
            cache: CacheConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Set the maximum page size
    pub fn with_max_search_results(mut self, max: usize) -> Self {
        self.max_search_results = max;
        self
    }

    /// Set the link fan-out cap
    pub fn with_max_linked_datasets(mut self, max: usize) -> Self {
        self.max_linked_datasets = max;
        self
    }

    /// Set the write ordering
    pub fn with_write_order(mut self, order: WriteOrder) -> Self {
        self.write_order = order;
        self
    }

    /// Set the cache bounds
    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> ListServResult<()> {
        if self.max_search_results == 0 {
            return Err(ListServError::validation(
                "engine.max_search_results must be at least 1",
            ));
        }
        if self.cache.max_entries == 0 {
            return Err(ListServError::validation(
                "engine.cache.max_entries must be at least 1",
            ));
        }
        Ok(())
    }
}

// ============================================================================
// ListServConfig
// ============================================================================

/// Complete configuration loaded from `listserv.toml`.
///
/// # Example
///
/// ```toml
/// [engine]
/// max_search_results = 1000
/// write_order = "cache_then_persist"
///
/// [engine.cache]
/// max_entries = 1000
///
/// [store]
/// max_backups_per_dataset = 10
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListServConfig {
    /// Engine options
    pub engine: EngineConfig,
    /// File store options
    pub store: StoreConfig,
}

impl ListServConfig {
    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# ListServ configuration

[engine]
# Upper bound on `take` for list and search requests
max_search_results = 1000
# Link specifiers processed per request (extra ones are ignored)
max_linked_datasets = 10
# "cache_then_persist" (default) or "persist_then_cache"
#   cache_then_persist = a failed save leaves memory ahead of disk until reload
#   persist_then_cache = a failed save leaves memory untouched
write_order = "cache_then_persist"

[engine.cache]
# Maximum datasets held in memory
max_entries = 1000
# Evict a dataset after this many seconds without access (0 = never)
expiration_secs = 43200

[store]
# Backups kept per dataset
max_backups_per_dataset = 10
# Largest dataset document accepted, in megabytes
max_dataset_size_mb = 100

[store.retry]
max_retries = 3
base_delay_ms = 500
max_delay_ms = 2000
"#
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> ListServResult<()> {
        self.engine.validate()
    }

    /// Read and parse config from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: &Path) -> ListServResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ListServError::storage(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let config: ListServConfig = toml::from_str(&content).map_err(|e| {
            ListServError::validation(format!(
                "Failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Write the default config file if it does not already exist.
    pub fn write_default_if_missing(path: &Path) -> ListServResult<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|e| {
                ListServError::storage(format!(
                    "Failed to write default config file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> ListServResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ListServError::internal(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content).map_err(|e| {
            ListServError::storage(format!(
                "Failed to write config file '{}': {}",
                path.display(),
                e
            ))
        })
    }
}
