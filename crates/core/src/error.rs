//! Error types for the data engine
//!
//! Every fallible operation returns [`ListServResult`]. Callers branch on the
//! variant (or on [`ListServError::category`]) instead of matching message text.
//!
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//! The error is `Clone` so a single in-flight dataset load can hand the same
//! failure to every caller waiting on it.

use std::io;
use thiserror::Error;

/// Result type alias for engine operations
pub type ListServResult<T> = std::result::Result<T, ListServError>;

/// Number of offending ids spelled out in a duplicate-item error
pub const MAX_REPORTED_DUPLICATES: usize = 5;

/// Error taxonomy for the data engine
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ListServError {
    /// Missing/blank argument or out-of-range pagination
    ///
    /// Raised before the cache or the guard is touched.
    #[error("Validation failed: {message}")]
    Validation {
        /// What was wrong with the input
        message: String,
    },

    /// Dataset id is not registered, or the store returned nothing for it
    #[error("Dataset '{dataset_id}' was not found or is not available")]
    DatasetNotFound {
        /// Requested dataset id
        dataset_id: String,
    },

    /// A dataset with this id is already registered
    #[error("Dataset with id '{dataset_id}' already exists")]
    DatasetAlreadyExists {
        /// Conflicting dataset id
        dataset_id: String,
    },

    /// Item id is absent (or archived, for reads)
    #[error("Item '{item_id}' not found in dataset '{dataset_id}'")]
    ItemNotFound {
        /// Requested item id
        item_id: String,
        /// Dataset that was searched
        dataset_id: String,
    },

    /// One or more item ids collide with existing items
    #[error("{}", duplicates_message(.item_ids, .remaining, .dataset_id))]
    ItemAlreadyExists {
        /// Up to the first [`MAX_REPORTED_DUPLICATES`] offending ids
        item_ids: Vec<String>,
        /// Number of further offending ids not listed
        remaining: usize,
        /// Dataset the items were added to
        dataset_id: String,
    },

    /// Persistence I/O failure
    #[error("Storage error: {message}")]
    Storage {
        /// Underlying failure description
        message: String,
    },

    /// A stored document could not be encoded or decoded
    #[error("Serialization error: {message}")]
    Serialization {
        /// Underlying failure description
        message: String,
    },

    /// Unexpected internal failure
    #[error("Internal error: {message}")]
    Internal {
        /// Failure description
        message: String,
    },
}

/// Coarse outcome classes surfaced to callers (HTTP layers map these to status codes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Caller supplied bad input
    BadRequest,
    /// Dataset or item does not exist
    NotFound,
    /// Dataset or item already exists
    Conflict,
    /// Persistence or internal failure; safe to retry
    Internal,
}

fn duplicates_message(item_ids: &[String], remaining: &usize, dataset_id: &str) -> String {
    let listed = item_ids.join(", ");
    if *remaining > 0 {
        format!(
            "Items with ids '{}' and {} others already exist in dataset '{}'",
            listed, remaining, dataset_id
        )
    } else {
        format!(
            "Items with ids '{}' already exist in dataset '{}'",
            listed, dataset_id
        )
    }
}

impl ListServError {
    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        ListServError::Validation {
            message: message.into(),
        }
    }

    /// Create a dataset-not-found error
    pub fn dataset_not_found(dataset_id: impl Into<String>) -> Self {
        ListServError::DatasetNotFound {
            dataset_id: dataset_id.into(),
        }
    }

    /// Create a dataset-already-exists error
    pub fn dataset_already_exists(dataset_id: impl Into<String>) -> Self {
        ListServError::DatasetAlreadyExists {
            dataset_id: dataset_id.into(),
        }
    }

    /// Create an item-not-found error
    pub fn item_not_found(dataset_id: impl Into<String>, item_id: impl Into<String>) -> Self {
        ListServError::ItemNotFound {
            item_id: item_id.into(),
            dataset_id: dataset_id.into(),
        }
    }

    /// Create an item-already-exists error from every offending id
    ///
    /// Only the first [`MAX_REPORTED_DUPLICATES`] ids are kept; the rest are counted.
    pub fn item_already_exists(dataset_id: impl Into<String>, mut item_ids: Vec<String>) -> Self {
        let remaining = item_ids.len().saturating_sub(MAX_REPORTED_DUPLICATES);
        item_ids.truncate(MAX_REPORTED_DUPLICATES);
        ListServError::ItemAlreadyExists {
            item_ids,
            remaining,
            dataset_id: dataset_id.into(),
        }
    }

    /// Create a storage error
    pub fn storage(message: impl Into<String>) -> Self {
        ListServError::Storage {
            message: message.into(),
        }
    }

    /// Create a serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        ListServError::Serialization {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        ListServError::Internal {
            message: message.into(),
        }
    }

    /// Outcome class of this error
    pub fn category(&self) -> ErrorCategory {
        match self {
            ListServError::Validation { .. } => ErrorCategory::BadRequest,
            ListServError::DatasetNotFound { .. } | ListServError::ItemNotFound { .. } => {
                ErrorCategory::NotFound
            }
            ListServError::DatasetAlreadyExists { .. }
            | ListServError::ItemAlreadyExists { .. } => ErrorCategory::Conflict,
            ListServError::Storage { .. }
            | ListServError::Serialization { .. }
            | ListServError::Internal { .. } => ErrorCategory::Internal,
        }
    }

    /// Whether repeating the same call may succeed
    ///
    /// A corrupt document stays corrupt, so serialization failures are not retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ListServError::Storage { .. } | ListServError::Internal { .. }
        )
    }

    /// True for either not-found variant
    pub fn is_not_found(&self) -> bool {
        self.category() == ErrorCategory::NotFound
    }

    /// True for either already-exists variant
    pub fn is_conflict(&self) -> bool {
        self.category() == ErrorCategory::Conflict
    }
}

impl From<io::Error> for ListServError {
    fn from(e: io::Error) -> Self {
        ListServError::storage(e.to_string())
    }
}

impl From<serde_json::Error> for ListServError {
    fn from(e: serde_json::Error) -> Self {
        ListServError::serialization(e.to_string())
    }
}
