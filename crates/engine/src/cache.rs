//! Dataset cache
//!
//! Holds at most one materialized copy of each dataset together with its
//! search index, loading on demand from the [`DatasetStore`].
//!
//! ## State
//!
//! - registry: every dataset id known to exist (concurrent set, lock-free)
//! - resident map: id → [`CachedDataset`], owned by the process-wide
//!   [`ConcurrencyGuard`]; every read of a dataset or its index takes the
//!   guard in shared mode, every change takes it exclusively
//! - in-flight loads: [`SingleFlight`] keyed by dataset id
//!
//! ## Loading
//!
//! ```text
//! get_or_load(id)
//!   ├─ id not registered        → DatasetNotFound
//!   ├─ resident and fresh       → Hit
//!   └─ single-flight(id):
//!        resident now?          → Hit   (another flight finished first)
//!        store.load_dataset(id) → None = DatasetNotFound, Err = propagate
//!        rebuild index          (no lock held)
//!        write lock: re-check registry, insert, evict on overflow
//! ```
//!
//! A failed load is shared with every caller waiting on it and is not cached.
//!
//! ## Eviction
//!
//! Entries expire after a sliding period without access. When the resident
//! count exceeds `max_entries`, the least recently accessed entry is dropped.
//! Evicted datasets stay registered and are reloaded on next access.
//!
//! A pinned dataset (see [`DatasetCache::pin`]) neither expires nor is chosen
//! as the overflow victim, so the resident count may briefly exceed
//! `max_entries` while writes are being persisted.

use crate::engine::config::CacheConfig;
use dashmap::mapref::entry::Entry;
use dashmap::{DashMap, DashSet};
use listserv_concurrency::{ConcurrencyGuard, GuardStats, SingleFlight};
use listserv_core::{Dataset, ListServError, ListServResult};
use listserv_durability::DatasetStore;
use listserv_search::{rebuild_index, ItemIndex};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

/// Attempts to find a dataset resident after loading it before giving up
const MAX_RESIDENCY_ATTEMPTS: usize = 8;

// ============================================================================
// CachedDataset
// ============================================================================

/// A dataset and the index rebuilt from its non-archived items
#[derive(Debug, Clone)]
pub struct CachedDataset {
    /// The dataset document
    pub dataset: Dataset,
    /// Substring index over the name field of active items
    pub index: ItemIndex,
}

impl CachedDataset {
    /// Pair `dataset` with a freshly rebuilt index
    pub fn build(dataset: Dataset) -> Self {
        let index = rebuild_index(&dataset);
        CachedDataset { dataset, index }
    }
}

/// How [`DatasetCache::get_or_load`] satisfied a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheLookup {
    /// Already resident
    Hit,
    /// Loaded from the store by this or a concurrent call
    Loaded,
}

/// Cache counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Requests served from resident entries
    pub hits: u64,
    /// Loads from the store
    pub loads: u64,
    /// Entries dropped for expiry, overflow or invalidation
    pub evictions: u64,
}

#[derive(Debug)]
struct ResidentEntry {
    cached: CachedDataset,
    last_access_ms: AtomicU64,
}

impl ResidentEntry {
    fn new(cached: CachedDataset, now_ms: u64) -> Self {
        ResidentEntry {
            cached,
            last_access_ms: AtomicU64::new(now_ms),
        }
    }

    fn touch(&self, now_ms: u64) {
        self.last_access_ms.store(now_ms, Ordering::Relaxed);
    }

    fn last_access(&self) -> u64 {
        self.last_access_ms.load(Ordering::Relaxed)
    }
}

// ============================================================================
// DatasetCache
// ============================================================================

/// Keeps a dataset resident while alive; see [`DatasetCache::pin`]
#[must_use = "the dataset is unpinned as soon as the guard drops"]
pub struct PinGuard<'a> {
    cache: &'a DatasetCache,
    dataset_id: String,
}

impl Drop for PinGuard<'_> {
    fn drop(&mut self) {
        self.cache.unpin(&self.dataset_id);
    }
}

/// Lazily loaded, bounded cache of datasets and their indexes
pub struct DatasetCache {
    store: Arc<dyn DatasetStore>,
    max_entries: usize,
    expiration: Option<Duration>,
    resident: ConcurrencyGuard<HashMap<String, ResidentEntry>>,
    registry: DashSet<String>,
    pinned: DashMap<String, usize>,
    loads: SingleFlight<String, ListServResult<CacheLookup>>,
    epoch: Instant,
    hits: AtomicU64,
    loads_count: AtomicU64,
    evictions: AtomicU64,
}

impl DatasetCache {
    /// Create an empty cache over `store`
    pub fn new(store: Arc<dyn DatasetStore>, config: &CacheConfig) -> Self {
        DatasetCache {
            store,
            max_entries: config.max_entries.max(1),
            expiration: config.expiration(),
            resident: ConcurrencyGuard::new(HashMap::new()),
            registry: DashSet::new(),
            pinned: DashMap::new(),
            loads: SingleFlight::new(),
            epoch: Instant::now(),
            hits: AtomicU64::new(0),
            loads_count: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    #[cfg(test)]
    fn with_expiration(mut self, expiration: Duration) -> Self {
        self.expiration = Some(expiration);
        self
    }

    /// Seed the registry with the ids the store reports; returns how many were new
    pub fn initialize(&self, dataset_ids: impl IntoIterator<Item = String>) -> usize {
        let added = dataset_ids
            .into_iter()
            .filter(|id| self.registry.insert(id.clone()))
            .count();
        info!(target: "listserv::cache", registered = added, "Dataset registry initialized");
        added
    }

    // ========================================================================
    // Registry
    // ========================================================================

    /// Whether `dataset_id` is registered, resident or not
    pub fn is_known(&self, dataset_id: &str) -> bool {
        self.registry.contains(dataset_id)
    }

    /// Register an id; false if it was already registered
    pub fn register(&self, dataset_id: &str) -> bool {
        let added = self.registry.insert(dataset_id.to_string());
        debug!(target: "listserv::cache", dataset_id, added, "Registered dataset id");
        added
    }

    /// Unregister an id without touching the resident copy
    pub fn unregister(&self, dataset_id: &str) -> bool {
        let removed = self.registry.remove(dataset_id).is_some();
        debug!(target: "listserv::cache", dataset_id, removed, "Unregistered dataset id");
        removed
    }

    /// Registered ids, sorted
    pub fn list_known_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.registry.iter().map(|id| id.key().clone()).collect();
        ids.sort();
        ids
    }

    // ========================================================================
    // Residency
    // ========================================================================

    /// Make `dataset_id` resident, loading it at most once across concurrent callers
    pub fn get_or_load(&self, dataset_id: &str) -> ListServResult<CacheLookup> {
        if !self.is_known(dataset_id) {
            return Err(ListServError::dataset_not_found(dataset_id));
        }
        if self.touch_if_fresh(dataset_id) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(CacheLookup::Hit);
        }
        self.loads
            .run(&dataset_id.to_string(), || self.load(dataset_id))
    }

    fn load(&self, dataset_id: &str) -> ListServResult<CacheLookup> {
        if self.touch_if_fresh(dataset_id) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(CacheLookup::Hit);
        }

        self.loads_count.fetch_add(1, Ordering::Relaxed);
        let started = Instant::now();
        let dataset = match self.store.load_dataset(dataset_id) {
            Ok(Some(dataset)) => dataset,
            Ok(None) => {
                error!(target: "listserv::cache", dataset_id, "Registered dataset missing from store");
                return Err(ListServError::dataset_not_found(dataset_id));
            }
            Err(e) => {
                error!(target: "listserv::cache", dataset_id, error = %e, "Failed to load dataset");
                return Err(e);
            }
        };
        let items = dataset.items.len();
        let cached = CachedDataset::build(dataset);

        let now = self.now_ms();
        self.resident.with_write(|map| {
            // Deleted while the load was in flight
            if !self.is_known(dataset_id) {
                return Err(ListServError::dataset_not_found(dataset_id));
            }
            self.insert_locked(map, dataset_id, cached, now);
            Ok(())
        })?;

        info!(
            target: "listserv::cache",
            dataset_id,
            items,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Loaded dataset"
        );
        Ok(CacheLookup::Loaded)
    }

    /// Run `f` on the resident copy under the shared lock, loading first if needed
    pub fn read<R>(
        &self,
        dataset_id: &str,
        f: impl FnOnce(&CachedDataset) -> R,
    ) -> ListServResult<R> {
        let mut f = Some(f);
        for _ in 0..MAX_RESIDENCY_ATTEMPTS {
            self.get_or_load(dataset_id)?;
            let now = self.now_ms();
            let out = self.resident.with_read(|map| {
                let entry = map.get(dataset_id)?;
                entry.touch(now);
                f.take().map(|f| f(&entry.cached))
            });
            if let Some(out) = out {
                return Ok(out);
            }
        }
        Err(self.residency_lost(dataset_id))
    }

    /// Run `f` on the resident copy under the exclusive lock, loading first if needed
    pub fn write<R>(
        &self,
        dataset_id: &str,
        f: impl FnOnce(&mut CachedDataset) -> R,
    ) -> ListServResult<R> {
        let mut f = Some(f);
        for _ in 0..MAX_RESIDENCY_ATTEMPTS {
            self.get_or_load(dataset_id)?;
            let now = self.now_ms();
            let out = self.resident.with_write(|map| {
                let entry = map.get_mut(dataset_id)?;
                entry.touch(now);
                f.take().map(|f| f(&mut entry.cached))
            });
            if let Some(out) = out {
                return Ok(out);
            }
        }
        Err(self.residency_lost(dataset_id))
    }

    /// Register and insert a new dataset in one exclusive step
    ///
    /// Fails with `DatasetAlreadyExists` if the id is already registered; the
    /// check runs under the write lock so two racing creates cannot both pass.
    pub fn put(&self, cached: CachedDataset) -> ListServResult<()> {
        let dataset_id = cached.dataset.id.clone();
        let now = self.now_ms();
        self.resident.with_write(|map| {
            if !self.registry.insert(dataset_id.clone()) {
                return Err(ListServError::dataset_already_exists(&dataset_id));
            }
            self.insert_locked(map, &dataset_id, cached, now);
            Ok(())
        })?;
        debug!(target: "listserv::cache", dataset_id = %dataset_id, "Inserted dataset");
        Ok(())
    }

    /// Exempt `dataset_id` from expiry and overflow eviction until the guard drops
    ///
    /// Pins nest. Explicit [`evict`](Self::evict) and [`remove`](Self::remove)
    /// still drop a pinned entry.
    pub fn pin(&self, dataset_id: &str) -> PinGuard<'_> {
        *self.pinned.entry(dataset_id.to_string()).or_insert(0) += 1;
        PinGuard {
            cache: self,
            dataset_id: dataset_id.to_string(),
        }
    }

    /// Whether `dataset_id` currently holds a pin
    pub fn is_pinned(&self, dataset_id: &str) -> bool {
        self.pinned.contains_key(dataset_id)
    }

    fn unpin(&self, dataset_id: &str) {
        if let Entry::Occupied(mut entry) = self.pinned.entry(dataset_id.to_string()) {
            *entry.get_mut() -= 1;
            if *entry.get() == 0 {
                entry.remove();
            }
        }
    }

    /// Drop the resident copy; the id stays registered
    pub fn evict(&self, dataset_id: &str) -> bool {
        let evicted = self
            .resident
            .with_write(|map| map.remove(dataset_id).is_some());
        if evicted {
            self.evictions.fetch_add(1, Ordering::Relaxed);
        }
        debug!(target: "listserv::cache", dataset_id, evicted, "Evicted dataset");
        evicted
    }

    /// Drop the resident copy and unregister the id; false if it was not registered
    pub fn remove(&self, dataset_id: &str) -> bool {
        let removed = self.resident.with_write(|map| {
            map.remove(dataset_id);
            self.registry.remove(dataset_id).is_some()
        });
        debug!(target: "listserv::cache", dataset_id, removed, "Removed dataset");
        removed
    }

    /// Whether a copy of `dataset_id` is currently resident
    pub fn is_resident(&self, dataset_id: &str) -> bool {
        self.resident.with_read(|map| map.contains_key(dataset_id))
    }

    /// Ids of resident datasets, sorted
    pub fn list_cached_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.resident.with_read(|map| map.keys().cloned().collect());
        ids.sort();
        ids
    }

    /// Copies of resident datasets, sorted by id
    pub fn list_cached_datasets(&self) -> Vec<Dataset> {
        let mut datasets: Vec<Dataset> = self.resident.with_read(|map| {
            map.values()
                .map(|entry| entry.cached.dataset.clone())
                .collect()
        });
        datasets.sort_by(|a, b| a.id.cmp(&b.id));
        datasets
    }

    /// Copies of resident datasets keyed by id, taken under one shared lock
    pub fn snapshot(&self) -> HashMap<String, Dataset> {
        self.resident.with_read(|map| {
            map.iter()
                .map(|(id, entry)| (id.clone(), entry.cached.dataset.clone()))
                .collect()
        })
    }

    /// Number of resident datasets
    pub fn resident_count(&self) -> usize {
        self.resident.with_read(|map| map.len())
    }

    /// Cache counters
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            loads: self.loads_count.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }

    /// Acquisition counters of the process-wide guard
    pub fn guard_stats(&self) -> GuardStats {
        self.resident.stats()
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn now_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }

    fn is_expired(&self, dataset_id: &str, entry: &ResidentEntry, now_ms: u64) -> bool {
        if self.is_pinned(dataset_id) {
            return false;
        }
        match self.expiration {
            Some(ttl) => now_ms.saturating_sub(entry.last_access()) > ttl.as_millis() as u64,
            None => false,
        }
    }

    fn touch_if_fresh(&self, dataset_id: &str) -> bool {
        let now = self.now_ms();
        self.resident.with_read(|map| match map.get(dataset_id) {
            Some(entry) if !self.is_expired(dataset_id, entry, now) => {
                entry.touch(now);
                true
            }
            _ => false,
        })
    }

    /// Insert unless a fresh copy is already resident, then enforce the bounds
    fn insert_locked(
        &self,
        map: &mut HashMap<String, ResidentEntry>,
        dataset_id: &str,
        cached: CachedDataset,
        now_ms: u64,
    ) {
        let fresh = map
            .get(dataset_id)
            .is_some_and(|entry| !self.is_expired(dataset_id, entry, now_ms));
        if !fresh {
            map.insert(dataset_id.to_string(), ResidentEntry::new(cached, now_ms));
        }

        let before = map.len();
        map.retain(|id, entry| id == dataset_id || !self.is_expired(id, entry, now_ms));
        let mut dropped = before - map.len();

        while map.len() > self.max_entries {
            let victim = map
                .iter()
                .filter(|(id, _)| id.as_str() != dataset_id && !self.is_pinned(id))
                .min_by_key(|(_, entry)| entry.last_access())
                .map(|(id, _)| id.clone());
            let Some(victim) = victim else { break };
            map.remove(&victim);
            dropped += 1;
            debug!(target: "listserv::cache", dataset_id = %victim, "Evicted least recently used dataset");
        }

        if dropped > 0 {
            self.evictions.fetch_add(dropped as u64, Ordering::Relaxed);
        }
    }

    fn residency_lost(&self, dataset_id: &str) -> ListServError {
        ListServError::internal(format!(
            "Dataset '{}' was evicted {} times before it could be used",
            dataset_id, MAX_RESIDENCY_ATTEMPTS
        ))
    }
}
