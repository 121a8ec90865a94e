//! Store configuration
//!
//! Read from the `[store]` and `[store.retry]` tables of `listserv.toml`.
//! Every field has a default so a partial table is valid.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default number of backups kept per dataset
pub const DEFAULT_MAX_BACKUPS_PER_DATASET: usize = 10;

/// Default maximum serialized dataset size, in megabytes
pub const DEFAULT_MAX_DATASET_SIZE_MB: u64 = 100;

// ============================================================================
// StoreConfig
// ============================================================================

/// Persistence limits and retry behavior
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Backups kept per dataset; older ones are pruned after each save
    pub max_backups_per_dataset: usize,
    /// Largest dataset document accepted on save, load or restore
    pub max_dataset_size_mb: u64,
    /// Retry policy for file operations
    pub retry: RetryConfig,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            max_backups_per_dataset: DEFAULT_MAX_BACKUPS_PER_DATASET,
            max_dataset_size_mb: DEFAULT_MAX_DATASET_SIZE_MB,
            retry: RetryConfig::default(),
        }
    }
}

impl StoreConfig {
    /// Config for tests: no retry delay
    pub fn for_testing() -> Self {
        StoreConfig {
            retry: RetryConfig::no_retry(),
            ..Default::default()
        }
    }

    /// Set the number of backups kept per dataset
    pub fn with_max_backups(mut self, max_backups: usize) -> Self {
        self.max_backups_per_dataset = max_backups;
        self
    }

    /// Set the maximum dataset size in megabytes
    pub fn with_max_dataset_size_mb(mut self, size_mb: u64) -> Self {
        self.max_dataset_size_mb = size_mb;
        self
    }

    /// Set the retry policy
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Maximum dataset size in bytes; zero falls back to the default
    pub fn max_dataset_size_bytes(&self) -> u64 {
        let mb = if self.max_dataset_size_mb == 0 {
            DEFAULT_MAX_DATASET_SIZE_MB
        } else {
            self.max_dataset_size_mb
        };
        mb.saturating_mul(1024 * 1024)
    }

    /// Backups kept per dataset; zero falls back to the default
    pub fn backups_to_keep(&self) -> usize {
        if self.max_backups_per_dataset == 0 {
            DEFAULT_MAX_BACKUPS_PER_DATASET
        } else {
            self.max_backups_per_dataset
        }
    }
}

// ============================================================================
// Retry Configuration
// ============================================================================

/// Retry behavior for storage operations
///
/// # Example
/// ```ignore
/// let config = RetryConfig {
///     max_retries: 5,
///     base_delay_ms: 100,
///     max_delay_ms: 1000,
/// };
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (0 = no retries)
    pub max_retries: usize,
    /// Base delay between retries in milliseconds (exponential backoff)
    pub base_delay_ms: u64,
    /// Maximum delay between retries in milliseconds
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 500,
            max_delay_ms: 2000,
        }
    }
}

impl RetryConfig {
    /// Create a new RetryConfig with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a RetryConfig with no retries
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    /// Set maximum number of retries
    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set base delay for exponential backoff
    pub fn with_base_delay_ms(mut self, base_delay_ms: u64) -> Self {
        self.base_delay_ms = base_delay_ms;
        self
    }

    /// Set maximum delay between retries
    pub fn with_max_delay_ms(mut self, max_delay_ms: u64) -> Self {
        self.max_delay_ms = max_delay_ms;
        self
    }

    /// Delay before retry number `attempt` (0-based), doubling each time
    pub(crate) fn calculate_delay(&self, attempt: usize) -> Duration {
        let shift = attempt.min(63);
        let multiplier = 1u64 << shift;
        let delay_ms = self.base_delay_ms.saturating_mul(multiplier);
        Duration::from_millis(delay_ms.min(self.max_delay_ms))
    }
}
