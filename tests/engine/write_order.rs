//! Write ordering between the cache and the store, under save failure and eviction pressure

use crate::common::*;
use listserv::{
    CacheConfig, DataEngine, Dataset, DatasetStore, EngineConfig, InMemoryStore, ListServError,
    ListServResult, ReadOptions, WriteOrder,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;

#[test]
fn cache_then_persist_keeps_cache_ahead_on_failure() {
    init_tracing();
    let (store, engine) = engine_with(vec![letters()], EngineConfig::default());
    store.fail_saves.store(true, Ordering::SeqCst);

    let err = engine.add_item("letters", named("d", "Delta")).unwrap_err();
    assert!(matches!(err, ListServError::Storage { .. }));

    // visible in memory, absent from the store
    assert_eq!(engine.get_item_by_id("letters", "d").unwrap().name, "Delta");
    assert!(!store.stored("letters").unwrap().items.contains_key("d"));

    store.fail_saves.store(false, Ordering::SeqCst);
    engine.invalidate_cache("letters").unwrap();
    assert!(engine.get_item_by_id("letters", "d").unwrap_err().is_not_found());
}

#[test]
fn persist_then_cache_leaves_cache_untouched_on_failure() {
    let config = EngineConfig::default().with_write_order(WriteOrder::PersistThenCache);
    let (store, engine) = engine_with(vec![letters()], config);
    store.fail_saves.store(true, Ordering::SeqCst);

    assert!(engine.add_item("letters", named("d", "Delta")).is_err());
    assert!(engine.archive_item("letters", "a").is_err());
    assert!(engine.get_item_by_id("letters", "d").is_err());
    assert_eq!(engine.get_item_by_id("letters", "a").unwrap().name, "Alpha");
    assert!(engine
        .search_items("letters", "delta", 0, 10, &ReadOptions::new())
        .unwrap()
        .is_empty());

    store.fail_saves.store(false, Ordering::SeqCst);
    engine.add_item("letters", named("d", "Delta")).unwrap();
    assert!(store.stored("letters").unwrap().items.contains_key("d"));
    let found = engine.search_items("letters", "delta", 0, 10, &ReadOptions::new()).unwrap();
    assert_eq!(ids(&found), vec!["d"]);
}

#[test]
fn persist_then_cache_failed_create_is_not_registered() {
    let config = EngineConfig::default().with_write_order(WriteOrder::PersistThenCache);
    let (store, engine) = engine_with(vec![], config);
    store.fail_saves.store(true, Ordering::SeqCst);

    assert!(engine.create_dataset(letters()).is_err());
    assert!(engine.list_dataset_ids().unwrap().is_empty());

    store.fail_saves.store(false, Ordering::SeqCst);
    engine.create_dataset(letters()).unwrap();
}

#[test]
fn both_orders_agree_on_success() {
    for order in [WriteOrder::CacheThenPersist, WriteOrder::PersistThenCache] {
        let config = EngineConfig::default().with_write_order(order);
        let (store, engine) = engine_with(vec![letters()], config);

        engine.update_item("letters", named("a", "Alfa")).unwrap();
        engine.archive_item("letters", "b").unwrap();

        let stored = store.stored("letters").unwrap();
        assert_eq!(stored.items["a"].name, "Alfa");
        assert!(stored.items["b"].is_archived);
        assert_eq!(engine.get_state().unwrap().datasets["letters"], stored);
    }
}

// ============================================================================
// Eviction while a save is in flight
// ============================================================================

/// In-memory store whose next save blocks until released
struct GatedStore {
    inner: InMemoryStore,
    armed: AtomicBool,
    entered: Mutex<Option<mpsc::Sender<()>>>,
    release: Mutex<Option<mpsc::Receiver<()>>>,
}

impl GatedStore {
    fn new(datasets: Vec<Dataset>) -> Self {
        GatedStore {
            inner: InMemoryStore::with_datasets(datasets),
            armed: AtomicBool::new(false),
            entered: Mutex::new(None),
            release: Mutex::new(None),
        }
    }

    /// Block the next save; returns (save entered, release save)
    fn arm(&self) -> (mpsc::Receiver<()>, mpsc::Sender<()>) {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        *self.entered.lock() = Some(entered_tx);
        *self.release.lock() = Some(release_rx);
        self.armed.store(true, Ordering::SeqCst);
        (entered_rx, release_tx)
    }
}

impl DatasetStore for GatedStore {
    fn load_dataset(&self, dataset_id: &str) -> ListServResult<Option<Dataset>> {
        self.inner.load_dataset(dataset_id)
    }

    fn save_dataset(&self, dataset: &Dataset) -> ListServResult<()> {
        if self.armed.swap(false, Ordering::SeqCst) {
            let entered = self.entered.lock().take();
            let release = self.release.lock().take();
            if let (Some(entered), Some(release)) = (entered, release) {
                entered.send(()).unwrap();
                release.recv().unwrap();
            }
        }
        self.inner.save_dataset(dataset)
    }

    fn list_dataset_ids(&self) -> ListServResult<Vec<String>> {
        self.inner.list_dataset_ids()
    }

    fn backup_dataset(&self, dataset_id: &str) -> ListServResult<String> {
        self.inner.backup_dataset(dataset_id)
    }

    fn list_backups(&self, dataset_id: &str) -> ListServResult<Vec<String>> {
        self.inner.list_backups(dataset_id)
    }

    fn restore_backup(&self, dataset_id: &str, backup_ref: &str) -> ListServResult<()> {
        self.inner.restore_backup(dataset_id, backup_ref)
    }

    fn delete_dataset(&self, dataset_id: &str) -> ListServResult<()> {
        self.inner.delete_dataset(dataset_id)
    }
}

#[test]
fn write_survives_eviction_pressure_during_save() {
    let store = Arc::new(GatedStore::new(vec![letters(), customers()]));
    let config = EngineConfig::default().with_cache(CacheConfig {
        max_entries: 1,
        expiration_secs: 0,
    });
    let engine = Arc::new(DataEngine::new(store.clone(), config).unwrap());
    engine.get_item_by_id("letters", "a").unwrap();

    let (entered, release) = store.arm();
    let writer = {
        let engine = Arc::clone(&engine);
        thread::spawn(move || engine.add_item("letters", named("d", "Delta")))
    };
    entered.recv().unwrap();

    // loading another dataset overflows the cache while the save is pending
    engine.get_dataset_meta("customers").unwrap();
    assert_eq!(engine.get_item_by_id("letters", "d").unwrap().name, "Delta");

    release.send(()).unwrap();
    writer.join().unwrap().unwrap();
    assert_eq!(engine.get_item_by_id("letters", "d").unwrap().name, "Delta");

    engine.add_item("letters", named("e", "Echo")).unwrap();
    let stored = store.inner.load_dataset("letters").unwrap().unwrap();
    assert!(stored.items.contains_key("d"));
    assert!(stored.items.contains_key("e"));
}
