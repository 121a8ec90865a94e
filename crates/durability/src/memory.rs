//! In-memory dataset store
//!
//! Keeps documents and their backups in process memory. Used by ephemeral
//! engines and tests; follows the same contract as the file store, including a
//! backup of the previous version on every overwrite.

use crate::config::StoreConfig;
use crate::store::DatasetStore;
use listserv_core::{Dataset, ListServError, ListServResult};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
struct Contents {
    datasets: HashMap<String, Dataset>,
    /// Oldest first
    backups: HashMap<String, Vec<(String, Dataset)>>,
}

/// Dataset store held entirely in memory
#[derive(Debug, Default)]
pub struct InMemoryStore {
    contents: RwLock<Contents>,
    next_backup: AtomicU64,
    config: StoreConfig,
}

impl InMemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store with custom limits
    pub fn with_config(config: StoreConfig) -> Self {
        InMemoryStore {
            config,
            ..Default::default()
        }
    }

    /// Create a store pre-populated with `datasets`
    pub fn with_datasets(datasets: impl IntoIterator<Item = Dataset>) -> Self {
        let store = Self::new();
        {
            let mut contents = store.contents.write();
            for dataset in datasets {
                contents.datasets.insert(dataset.id.clone(), dataset);
            }
        }
        store
    }

    /// Number of stored documents
    pub fn len(&self) -> usize {
        self.contents.read().datasets.len()
    }

    /// Whether the store holds no documents
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn push_backup(&self, contents: &mut Contents, dataset: Dataset) -> String {
        let seq = self.next_backup.fetch_add(1, Ordering::Relaxed);
        let backup_ref = format!("{}_backup_{:020}.json", dataset.id, seq);
        let keep = self.config.backups_to_keep();
        let backups = contents.backups.entry(dataset.id.clone()).or_default();
        backups.push((backup_ref.clone(), dataset));
        if backups.len() > keep {
            let excess = backups.len() - keep;
            backups.drain(..excess);
        }
        backup_ref
    }
}

impl DatasetStore for InMemoryStore {
    fn load_dataset(&self, dataset_id: &str) -> ListServResult<Option<Dataset>> {
        Ok(self.contents.read().datasets.get(dataset_id).cloned())
    }

    fn save_dataset(&self, dataset: &Dataset) -> ListServResult<()> {
        if dataset.id.trim().is_empty() {
            return Err(ListServError::validation("Dataset must have a valid ID."));
        }
        let mut contents = self.contents.write();
        if let Some(previous) = contents.datasets.remove(&dataset.id) {
            self.push_backup(&mut contents, previous);
        }
        contents.datasets.insert(dataset.id.clone(), dataset.clone());
        Ok(())
    }

    fn list_dataset_ids(&self) -> ListServResult<Vec<String>> {
        let mut ids: Vec<String> = self.contents.read().datasets.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }

    fn backup_dataset(&self, dataset_id: &str) -> ListServResult<String> {
        let mut contents = self.contents.write();
        let current = contents
            .datasets
            .get(dataset_id)
            .cloned()
            .ok_or_else(|| ListServError::dataset_not_found(dataset_id))?;
        Ok(self.push_backup(&mut contents, current))
    }

    fn list_backups(&self, dataset_id: &str) -> ListServResult<Vec<String>> {
        let contents = self.contents.read();
        Ok(contents
            .backups
            .get(dataset_id)
            .map(|backups| backups.iter().rev().map(|(r, _)| r.clone()).collect())
            .unwrap_or_default())
    }

    fn restore_backup(&self, dataset_id: &str, backup_ref: &str) -> ListServResult<()> {
        let mut contents = self.contents.write();
        let snapshot = contents
            .backups
            .get(dataset_id)
            .and_then(|backups| backups.iter().find(|(r, _)| r == backup_ref))
            .map(|(_, dataset)| dataset.clone())
            .ok_or_else(|| {
                ListServError::storage(format!("Backup file not found: {}", backup_ref))
            })?;
        contents.datasets.insert(dataset_id.to_string(), snapshot);
        Ok(())
    }

    fn delete_dataset(&self, dataset_id: &str) -> ListServResult<()> {
        let mut contents = self.contents.write();
        contents.datasets.remove(dataset_id);
        contents.backups.remove(dataset_id);
        Ok(())
    }
}
