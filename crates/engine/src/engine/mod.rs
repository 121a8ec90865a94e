//! Data engine
//!
//! [`DataEngine`] is the public surface: dataset and item CRUD, paginated
//! listing, substring search and link enrichment, composed from the
//! [`DatasetCache`], the [`LinkEnricher`] and a [`DatasetStore`].
//!
//! ## Dataset lifecycle
//!
//! ```text
//! Unknown → Registered → Cached ⇄ Evicted (Registered)
//!                 └──────────┴──→ Removed
//! ```
//!
//! Initialization registers every id the store lists, exactly once. Every
//! public operation waits for it; concurrent early callers share one attempt,
//! and a failed attempt is retried by the next call.
//!
//! ## Locking
//!
//! - the cache's process-wide guard: shared for reads, exclusive for any
//!   change to a resident dataset or index; never held across store I/O
//! - `commit_lock`: serializes writers end to end (check, apply, save) so
//!   saved snapshots reach the store in the order they were applied;
//!   readers never take it

pub mod config;
mod items;
mod mutation;
mod options;

pub use config::{
    CacheConfig, EngineConfig, ListServConfig, WriteOrder, CONFIG_FILE_NAME,
};
pub use options::ReadOptions;

use crate::cache::{CachedDataset, DatasetCache};
use crate::links::LinkEnricher;
use listserv_concurrency::InitGate;
use listserv_core::{
    require_non_blank, Dataset, DatasetMeta, EngineState, Item, ListServError, ListServResult,
};
use listserv_durability::{DatasetStore, FileStore, InMemoryStore};
use mutation::Mutation;
use options::project;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info};

/// In-process data engine over a dataset store
pub struct DataEngine {
    config: EngineConfig,
    store: Arc<dyn DatasetStore>,
    cache: Arc<DatasetCache>,
    links: LinkEnricher,
    init: InitGate<ListServError>,
    commit_lock: Mutex<()>,
}

impl DataEngine {
    // ========================================================================
    // Construction
    // ========================================================================

    /// Create an engine over `store`
    ///
    /// Nothing is read from the store until the first operation.
    pub fn new(store: Arc<dyn DatasetStore>, config: EngineConfig) -> ListServResult<Self> {
        config.validate()?;
        Ok(Self::assemble(store, config))
    }

    /// Engine over an empty in-memory store with default settings
    pub fn ephemeral() -> Self {
        Self::assemble(Arc::new(InMemoryStore::new()), EngineConfig::default())
    }

    fn assemble(store: Arc<dyn DatasetStore>, config: EngineConfig) -> Self {
        let cache = Arc::new(DatasetCache::new(Arc::clone(&store), &config.cache));
        let links = LinkEnricher::new(Arc::clone(&cache), config.max_linked_datasets);
        DataEngine {
            config,
            store,
            cache,
            links,
            init: InitGate::new(),
            commit_lock: Mutex::new(()),
        }
    }

    /// Open a file-backed engine in `data_dir`
    ///
    /// Creates the directory and a default `listserv.toml` if missing, then
    /// reads settings from that file.
    pub fn open(data_dir: impl AsRef<Path>) -> ListServResult<Self> {
        let data_dir = data_dir.as_ref();
        std::fs::create_dir_all(data_dir)?;
        let config_path = data_dir.join(CONFIG_FILE_NAME);
        ListServConfig::write_default_if_missing(&config_path)?;
        let config = ListServConfig::from_file(&config_path)?;
        Self::open_with_config(data_dir, config)
    }

    /// Open a file-backed engine in `data_dir` with explicit settings
    pub fn open_with_config(
        data_dir: impl AsRef<Path>,
        config: ListServConfig,
    ) -> ListServResult<Self> {
        config.validate()?;
        let store = FileStore::open(data_dir.as_ref(), config.store)?;
        info!(
            target: "listserv::engine",
            data_dir = %data_dir.as_ref().display(),
            write_order = ?config.engine.write_order,
            "Opened data engine"
        );
        Self::new(Arc::new(store), config.engine)
    }

    /// Active configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The dataset cache
    pub fn cache(&self) -> &DatasetCache {
        &self.cache
    }

    // ========================================================================
    // Initialization
    // ========================================================================

    /// Register every stored dataset id; runs once, retried after failure
    pub fn initialize(&self) -> ListServResult<()> {
        self.init.ensure(|| {
            let ids = self.store.list_dataset_ids().map_err(|e| {
                error!(target: "listserv::engine", error = %e, "Failed to initialize data engine");
                e
            })?;
            let registered = self.cache.initialize(ids);
            info!(target: "listserv::engine", datasets = registered, "Data engine initialized");
            Ok(())
        })
    }

    /// Whether initialization has completed
    pub fn is_initialized(&self) -> bool {
        self.init.is_open()
    }

    // ========================================================================
    // Datasets
    // ========================================================================

    /// Registered dataset ids, sorted
    pub fn list_dataset_ids(&self) -> ListServResult<Vec<String>> {
        self.initialize()?;
        Ok(self.cache.list_known_ids())
    }

    /// Copies of the datasets currently held in memory
    pub fn get_all_datasets(&self) -> ListServResult<Vec<Dataset>> {
        self.initialize()?;
        Ok(self.cache.list_cached_datasets())
    }

    /// Create a dataset with its initial items
    ///
    /// Items are keyed by their own id. Fails with `DatasetAlreadyExists` if
    /// the id is registered, including when two creates race.
    pub fn create_dataset(&self, dataset: Dataset) -> ListServResult<()> {
        require_non_blank(&dataset.id, "dataset id")?;
        require_non_blank(&dataset.name, "dataset name")?;
        if dataset.items.values().any(|item| item.id.trim().is_empty()) {
            return Err(ListServError::validation(
                "Item with null or empty id found in the collection",
            ));
        }
        self.store.validate_id(&dataset.id)?;
        self.initialize()?;

        if self.cache.is_known(&dataset.id) {
            return Err(ListServError::dataset_already_exists(&dataset.id));
        }

        let mut dataset = dataset;
        dataset.items = dataset
            .items
            .into_values()
            .map(|item| (item.id.clone(), item))
            .collect();
        let dataset_id = dataset.id.clone();
        let items = dataset.items.len();
        let cached = CachedDataset::build(dataset);

        let _commit = self.commit_lock.lock();
        match self.config.write_order {
            WriteOrder::CacheThenPersist => {
                let snapshot = cached.dataset.clone();
                let _pin = self.cache.pin(&dataset_id);
                self.cache.put(cached)?;
                self.persist(&snapshot)?;
            }
            WriteOrder::PersistThenCache => {
                if self.cache.is_known(&dataset_id) {
                    return Err(ListServError::dataset_already_exists(&dataset_id));
                }
                self.persist(&cached.dataset)?;
                self.cache.put(cached)?;
            }
        }
        info!(target: "listserv::engine", dataset_id = %dataset_id, items, "Dataset created");
        Ok(())
    }

    /// Dataset by id
    ///
    /// With default options the stored dataset is returned as is, archived
    /// items included. Otherwise the result holds only active items, each
    /// projected to the requested fields and enriched with the requested links.
    pub fn get_dataset_by_id(
        &self,
        dataset_id: &str,
        options: &ReadOptions,
    ) -> ListServResult<Dataset> {
        require_non_blank(dataset_id, "dataset id")?;
        self.initialize()?;

        if options.is_plain() {
            return self.cache.read(dataset_id, |cached| cached.dataset.clone());
        }

        let fields = options.field_set();
        let (mut filtered, items) = self.cache.read(dataset_id, |cached| {
            let source = &cached.dataset;
            let shell = Dataset {
                id: source.id.clone(),
                name: source.name.clone(),
                description: source.description.clone(),
                id_field: source.id_field.clone(),
                name_field: source.name_field.clone(),
                fields: source.fields.clone(),
                items: HashMap::new(),
            };
            let items: Vec<Item> = source
                .active_items()
                .map(|item| project(item, &fields))
                .collect();
            (shell, items)
        })?;

        let prepared = self.links.prepare(&options.links, None);
        for mut item in items {
            self.links.enrich(&mut item, &options.links, &prepared);
            filtered.items.insert(item.id.clone(), item);
        }
        Ok(filtered)
    }

    /// Dataset without its items
    pub fn get_dataset_meta(&self, dataset_id: &str) -> ListServResult<DatasetMeta> {
        require_non_blank(dataset_id, "dataset id")?;
        self.initialize()?;
        self.cache.read(dataset_id, |cached| cached.dataset.meta())
    }

    /// Replace name, description and schema; id and key fields never change
    pub fn update_dataset(&self, meta: DatasetMeta) -> ListServResult<()> {
        require_non_blank(&meta.id, "dataset id")?;
        self.initialize()?;
        let dataset_id = meta.id;
        self.commit(
            &dataset_id,
            &Mutation::UpdateMeta {
                name: meta.name,
                description: meta.description,
                fields: meta.fields,
            },
        )?;
        info!(target: "listserv::engine", dataset_id = %dataset_id, "Dataset updated");
        Ok(())
    }

    /// Remove a dataset from memory, the registry and the store
    pub fn delete_dataset(&self, dataset_id: &str) -> ListServResult<()> {
        require_non_blank(dataset_id, "dataset id")?;
        self.initialize()?;
        if !self.cache.is_known(dataset_id) {
            return Err(ListServError::dataset_not_found(dataset_id));
        }

        let _commit = self.commit_lock.lock();
        if !self.cache.remove(dataset_id) {
            return Err(ListServError::dataset_not_found(dataset_id));
        }
        self.store.delete_dataset(dataset_id).map_err(|e| {
            error!(target: "listserv::engine", dataset_id, error = %e, "Failed to delete dataset from store");
            e
        })?;
        info!(target: "listserv::engine", dataset_id, "Dataset deleted");
        Ok(())
    }

    /// Drop the in-memory copy; the next access reloads from the store
    pub fn invalidate_cache(&self, dataset_id: &str) -> ListServResult<()> {
        require_non_blank(dataset_id, "dataset id")?;
        self.initialize()?;
        if !self.cache.is_known(dataset_id) {
            return Err(ListServError::dataset_not_found(dataset_id));
        }
        let _commit = self.commit_lock.lock();
        let evicted = self.cache.evict(dataset_id);
        info!(target: "listserv::engine", dataset_id, evicted, "Dataset cache invalidated");
        Ok(())
    }

    /// Every in-memory dataset, captured under one shared lock
    pub fn get_state(&self) -> ListServResult<EngineState> {
        self.initialize()?;
        Ok(EngineState {
            datasets: self.cache.snapshot(),
        })
    }

    // ========================================================================
    // Backups
    // ========================================================================

    /// Snapshot the stored document; returns the backup reference
    pub fn backup_dataset(&self, dataset_id: &str) -> ListServResult<String> {
        self.require_registered(dataset_id)?;
        let backup = self.store.backup_dataset(dataset_id)?;
        info!(target: "listserv::engine", dataset_id, backup = %backup, "Dataset backed up");
        Ok(backup)
    }

    /// Backup references, most recent first
    pub fn list_backups(&self, dataset_id: &str) -> ListServResult<Vec<String>> {
        self.require_registered(dataset_id)?;
        self.store.list_backups(dataset_id)
    }

    /// Replace the stored document with a backup and drop the in-memory copy
    pub fn restore_backup(&self, dataset_id: &str, backup_ref: &str) -> ListServResult<()> {
        self.require_registered(dataset_id)?;
        require_non_blank(backup_ref, "backup reference")?;

        let _commit = self.commit_lock.lock();
        self.store.restore_backup(dataset_id, backup_ref)?;
        self.cache.evict(dataset_id);
        info!(target: "listserv::engine", dataset_id, backup = %backup_ref, "Dataset restored from backup");
        Ok(())
    }

    fn require_registered(&self, dataset_id: &str) -> ListServResult<()> {
        require_non_blank(dataset_id, "dataset id")?;
        self.initialize()?;
        if self.cache.is_known(dataset_id) {
            Ok(())
        } else {
            Err(ListServError::dataset_not_found(dataset_id))
        }
    }

    // ========================================================================
    // Shared read pipeline
    // ========================================================================

    /// Project and enrich a snapshot taken under the shared lock
    ///
    /// Runs without the guard held; link preparation takes it per linked dataset.
    fn finish_items(
        &self,
        snapshot: Vec<Item>,
        options: &ReadOptions,
        required: Option<&HashSet<String>>,
    ) -> Vec<Item> {
        let fields = options.field_set();
        let prepared = self.links.prepare(&options.links, required);
        snapshot
            .iter()
            .map(|item| {
                let mut item = project(item, &fields);
                self.links.enrich(&mut item, &options.links, &prepared);
                item
            })
            .collect()
    }
}
