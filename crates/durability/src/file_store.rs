//! JSON file store with rolling backups
//!
//! Each dataset is one pretty-printed JSON document under `datasets/`. Every
//! save first copies the previous document into `backups/<id>/`, then writes
//! the new document to a temp file and renames it over the live one, so a
//! crash mid-write never leaves a truncated document behind.
//!
//! ## Locking
//!
//! - per-dataset mutex: serializes load/save/backup/restore/delete of one id
//! - directory mutex: serializes directory creation, listing and pruning
//!
//! Both are plain `parking_lot::Mutex<()>`; I/O on different datasets runs in
//! parallel.

use crate::config::StoreConfig;
use crate::paths::{sanitize_backup_name, sanitize_dataset_id, StorePaths};
use crate::retry::with_retry;
use crate::store::DatasetStore;
use chrono::Utc;
use dashmap::DashMap;
use listserv_core::{Dataset, ListServError, ListServResult};
use parking_lot::Mutex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Timestamp embedded in backup file names; sorts lexicographically by time
const BACKUP_TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S%3f";

/// Dataset store backed by a directory of JSON files
#[derive(Debug)]
pub struct FileStore {
    paths: StorePaths,
    config: StoreConfig,
    dataset_locks: DashMap<String, Arc<Mutex<()>>>,
    directory_lock: Mutex<()>,
}

impl FileStore {
    /// Open (creating if needed) a store rooted at `root`
    pub fn open(root: impl AsRef<Path>, config: StoreConfig) -> ListServResult<Self> {
        let paths = StorePaths::from_root(root);
        fs::create_dir_all(paths.datasets_dir())?;
        fs::create_dir_all(paths.backups_dir())?;
        info!(target: "listserv::store", root = %paths.root().display(), "Opened file store");
        Ok(FileStore {
            paths,
            config,
            dataset_locks: DashMap::new(),
            directory_lock: Mutex::new(()),
        })
    }

    /// Store directory layout
    pub fn paths(&self) -> &StorePaths {
        &self.paths
    }

    /// Active configuration
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    fn dataset_lock(&self, dataset_id: &str) -> Arc<Mutex<()>> {
        Arc::clone(
            self.dataset_locks
                .entry(dataset_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .value(),
        )
    }

    fn check_size(&self, len: u64, what: &str) -> ListServResult<()> {
        let max = self.config.max_dataset_size_bytes();
        if len > max {
            return Err(ListServError::validation(format!(
                "{} exceeds maximum allowed size of {} MB.",
                what,
                max / (1024 * 1024)
            )));
        }
        Ok(())
    }

    /// Copy `source` into the dataset's backup directory; returns the backup file name
    fn create_backup_file(&self, dataset_id: &str, source: &Path) -> ListServResult<String> {
        let backup_dir = self.paths.backup_dir(dataset_id);
        let (name, target) = {
            let _dir = self.directory_lock.lock();
            fs::create_dir_all(&backup_dir)?;
            let stamp = Utc::now().format(BACKUP_TIMESTAMP_FORMAT).to_string();
            unique_backup_path(&backup_dir, dataset_id, &stamp)
        };

        with_retry(&self.config.retry, "backup", || {
            fs::copy(source, &target)?;
            Ok(())
        })?;
        debug!(target: "listserv::store", dataset_id, backup = %name, "Created backup");
        Ok(name)
    }

    fn prune_backups(&self, dataset_id: &str) {
        let keep = self.config.backups_to_keep();
        let _dir = self.directory_lock.lock();
        let names = match backup_names(&self.paths.backup_dir(dataset_id)) {
            Ok(names) => names,
            Err(e) => {
                warn!(target: "listserv::store", dataset_id, error = %e, "Could not list backups for pruning");
                return;
            }
        };
        for name in names.into_iter().skip(keep) {
            let path = self.paths.backup_dir(dataset_id).join(&name);
            if let Err(e) = fs::remove_file(&path) {
                warn!(target: "listserv::store", dataset_id, backup = %name, error = %e, "Could not remove old backup");
            }
        }
    }

    /// Write `json` through the temp file and rename it over the live document
    fn replace_live_file(&self, dataset_id: &str, json: &str) -> ListServResult<()> {
        let live = self.paths.dataset_file(dataset_id);
        let temp = self.paths.temp_file(dataset_id);
        fs::write(&temp, json)?;
        fs::rename(&temp, &live)?;
        Ok(())
    }

    fn remove_temp_file(&self, dataset_id: &str) {
        let temp = self.paths.temp_file(dataset_id);
        if temp.exists() {
            if let Err(e) = fs::remove_file(&temp) {
                warn!(target: "listserv::store", dataset_id, error = %e, "Could not remove temp file");
            }
        }
    }
}

impl DatasetStore for FileStore {
    fn validate_id(&self, dataset_id: &str) -> ListServResult<()> {
        sanitize_dataset_id(dataset_id).map(|_| ())
    }

    fn load_dataset(&self, dataset_id: &str) -> ListServResult<Option<Dataset>> {
        let dataset_id = sanitize_dataset_id(dataset_id)?;
        let lock = self.dataset_lock(dataset_id);
        let _guard = lock.lock();

        let path = self.paths.dataset_file(dataset_id);
        if !path.exists() {
            return Ok(None);
        }
        self.check_size(fs::metadata(&path)?.len(), "Dataset file")?;

        let json = with_retry(&self.config.retry, "load", || Ok(fs::read_to_string(&path)?))?;
        if json.trim().is_empty() {
            return Ok(None);
        }
        let dataset: Dataset = serde_json::from_str(&json)?;
        debug!(target: "listserv::store", dataset_id, items = dataset.items.len(), "Loaded dataset file");
        Ok(Some(dataset))
    }

    fn save_dataset(&self, dataset: &Dataset) -> ListServResult<()> {
        let dataset_id = sanitize_dataset_id(&dataset.id)?;
        let json = serde_json::to_string_pretty(dataset)?;
        self.check_size(json.len() as u64, "Dataset")?;

        let lock = self.dataset_lock(dataset_id);
        let _guard = lock.lock();

        let live = self.paths.dataset_file(dataset_id);
        if live.exists() {
            self.create_backup_file(dataset_id, &live)?;
        }
        let result = with_retry(&self.config.retry, "save", || {
            self.replace_live_file(dataset_id, &json)
        });
        if let Err(e) = result {
            self.remove_temp_file(dataset_id);
            return Err(e);
        }

        self.prune_backups(dataset_id);
        debug!(target: "listserv::store", dataset_id, bytes = json.len(), "Saved dataset file");
        Ok(())
    }

    fn list_dataset_ids(&self) -> ListServResult<Vec<String>> {
        let _dir = self.directory_lock.lock();
        let dir = self.paths.datasets_dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut ids: Vec<String> = json_files(&dir)?
            .into_iter()
            .filter_map(|path| {
                path.file_stem()
                    .and_then(|stem| stem.to_str())
                    .map(str::to_string)
            })
            .filter(|id| !id.is_empty())
            .collect();
        ids.sort();
        Ok(ids)
    }

    fn backup_dataset(&self, dataset_id: &str) -> ListServResult<String> {
        let dataset_id = sanitize_dataset_id(dataset_id)?;
        let lock = self.dataset_lock(dataset_id);
        let _guard = lock.lock();

        let live = self.paths.dataset_file(dataset_id);
        if !live.exists() {
            return Err(ListServError::dataset_not_found(dataset_id));
        }
        let name = self.create_backup_file(dataset_id, &live)?;
        self.prune_backups(dataset_id);
        Ok(name)
    }

    fn list_backups(&self, dataset_id: &str) -> ListServResult<Vec<String>> {
        let dataset_id = sanitize_dataset_id(dataset_id)?;
        let _dir = self.directory_lock.lock();
        backup_names(&self.paths.backup_dir(dataset_id))
    }

    fn restore_backup(&self, dataset_id: &str, backup_ref: &str) -> ListServResult<()> {
        let dataset_id = sanitize_dataset_id(dataset_id)?;
        let backup_name = sanitize_backup_name(backup_ref)?;
        let lock = self.dataset_lock(dataset_id);
        let _guard = lock.lock();

        let backup = self.paths.backup_dir(dataset_id).join(backup_name);
        if !backup.exists() {
            return Err(ListServError::storage(format!(
                "Backup file not found: {}",
                backup.display()
            )));
        }

        let result = with_retry(&self.config.retry, "restore", || {
            let json = fs::read_to_string(&backup)?;
            self.check_size(json.len() as u64, "Backup")?;
            self.replace_live_file(dataset_id, &json)
        });
        if let Err(e) = result {
            self.remove_temp_file(dataset_id);
            return Err(e);
        }
        info!(target: "listserv::store", dataset_id, backup = %backup_name, "Restored dataset from backup");
        Ok(())
    }

    fn delete_dataset(&self, dataset_id: &str) -> ListServResult<()> {
        let dataset_id = sanitize_dataset_id(dataset_id)?;
        let lock = self.dataset_lock(dataset_id);
        let _guard = lock.lock();

        let live = self.paths.dataset_file(dataset_id);
        if live.exists() {
            fs::remove_file(&live)?;
        }
        let backup_dir = self.paths.backup_dir(dataset_id);
        if backup_dir.exists() {
            fs::remove_dir_all(&backup_dir)?;
        }
        info!(target: "listserv::store", dataset_id, "Deleted dataset files");
        Ok(())
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn json_files(dir: &Path) -> ListServResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json && path.is_file() {
            files.push(path);
        }
    }
    Ok(files)
}

/// Backup file names in `dir`, most recent first
fn backup_names(dir: &Path) -> ListServResult<Vec<String>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut names: Vec<String> = json_files(dir)?
        .into_iter()
        .filter_map(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .map(str::to_string)
        })
        .collect();
    names.sort_by(|a, b| b.cmp(a));
    Ok(names)
}

/// Pick a backup path that does not exist yet
///
/// Backups sharing a timestamp get zero-padded `_0001`, `_0002`, ... suffixes,
/// which sort after the unsuffixed name and in creation order among themselves.
fn unique_backup_path(backup_dir: &Path, dataset_id: &str, stamp: &str) -> (String, PathBuf) {
    let base = format!("{}_backup_{}", dataset_id, stamp);
    let mut name = format!("{}.json", base);
    let mut n = 1;
    while backup_dir.join(&name).exists() {
        name = format!("{}_{:04}.json", base, n);
        n += 1;
    }
    let path = backup_dir.join(&name);
    (name, path)
}
