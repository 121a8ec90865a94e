//! Store directory structure
//!
//! ```text
//! <data_dir>/
//! ├── datasets/            # Live documents
//! │   ├── countries.json
//! │   └── ...
//! └── backups/
//!     └── countries/       # One directory per dataset
//!         ├── countries_backup_20240101120000123.json
//!         └── ...
//! ```

use listserv_core::{ListServError, ListServResult};
use std::path::{Path, PathBuf};

/// Characters never accepted in a dataset id or backup file name
const FORBIDDEN_CHARS: &[char] = &['/', '\\', '<', '>', ':', '"', '|', '?', '*'];

/// Paths within a store directory
#[derive(Debug, Clone)]
pub struct StorePaths {
    root: PathBuf,
}

impl StorePaths {
    /// Create paths from the root directory
    pub fn from_root(root: impl AsRef<Path>) -> Self {
        StorePaths {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory of live dataset documents
    pub fn datasets_dir(&self) -> PathBuf {
        self.root.join("datasets")
    }

    /// Directory holding every dataset's backup directory
    pub fn backups_dir(&self) -> PathBuf {
        self.root.join("backups")
    }

    /// Live document for `dataset_id`
    pub fn dataset_file(&self, dataset_id: &str) -> PathBuf {
        self.datasets_dir().join(format!("{}.json", dataset_id))
    }

    /// Staging file written before the rename over the live document
    pub fn temp_file(&self, dataset_id: &str) -> PathBuf {
        self.datasets_dir().join(format!("{}.tmp", dataset_id))
    }

    /// Backup directory for `dataset_id`
    pub fn backup_dir(&self, dataset_id: &str) -> PathBuf {
        self.backups_dir().join(dataset_id)
    }
}

/// Reject ids that could escape the store directory or are not valid file names
pub fn sanitize_dataset_id(dataset_id: &str) -> ListServResult<&str> {
    if dataset_id.trim().is_empty() {
        return Err(ListServError::validation("Dataset ID must be provided."));
    }
    if !is_safe_file_name(dataset_id) {
        return Err(ListServError::validation(
            "Dataset ID contains invalid characters.",
        ));
    }
    Ok(dataset_id)
}

/// Reject backup names that are not plain `.json` file names
pub fn sanitize_backup_name(backup_name: &str) -> ListServResult<&str> {
    if backup_name.trim().is_empty() {
        return Err(ListServError::validation("Backup file name must be provided."));
    }
    if !is_safe_file_name(backup_name) {
        return Err(ListServError::validation(
            "Backup file name contains invalid characters.",
        ));
    }
    if !backup_name.to_ascii_lowercase().ends_with(".json") {
        return Err(ListServError::validation(
            "Backup file must have a .json extension.",
        ));
    }
    Ok(backup_name)
}

fn is_safe_file_name(name: &str) -> bool {
    name != "."
        && !name.contains("..")
        && !name
            .chars()
            .any(|c| c.is_control() || FORBIDDEN_CHARS.contains(&c))
}
