//! Persistence contract consumed by the dataset cache and the engine

use listserv_core::{Dataset, ListServResult};

/// Durable storage for whole dataset documents
///
/// Implementations are shared across threads and called synchronously.
/// Absence is not an error: `load_dataset` returns `Ok(None)` for an unknown id.
pub trait DatasetStore: Send + Sync {
    /// Reject ids this store cannot hold; checked before anything is cached
    fn validate_id(&self, _dataset_id: &str) -> ListServResult<()> {
        Ok(())
    }

    /// Load a dataset, `None` if it does not exist
    fn load_dataset(&self, dataset_id: &str) -> ListServResult<Option<Dataset>>;

    /// Overwrite the whole document, backing up the previous version first
    fn save_dataset(&self, dataset: &Dataset) -> ListServResult<()>;

    /// Ids of every stored dataset
    fn list_dataset_ids(&self) -> ListServResult<Vec<String>>;

    /// Snapshot the current document; returns the backup reference
    fn backup_dataset(&self, dataset_id: &str) -> ListServResult<String>;

    /// Backup references, most recent first
    fn list_backups(&self, dataset_id: &str) -> ListServResult<Vec<String>>;

    /// Replace the live document with a backup
    fn restore_backup(&self, dataset_id: &str, backup_ref: &str) -> ListServResult<()>;

    /// Remove the document and its backups; a missing document is not an error
    fn delete_dataset(&self, dataset_id: &str) -> ListServResult<()>;
}
