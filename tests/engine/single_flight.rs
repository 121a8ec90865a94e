//! Single-flight loading and one-time initialization
//!
//! - N concurrent first reads of an uncached dataset hit the store once
//! - a failed load is shared by its waiters, not cached, and retried
//! - initialization runs once and is retried after failure

use crate::common::*;
use listserv::{EngineConfig, ListServError, ReadOptions};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

#[test]
fn concurrent_first_access_loads_once() {
    let (store, engine) = engine_with(vec![letters()], EngineConfig::default());
    store.set_load_delay(Duration::from_millis(50));
    let engine = Arc::new(engine);
    let barrier = Arc::new(Barrier::new(16));

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let engine = Arc::clone(&engine);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                engine.list_items("letters", 0, 10, &ReadOptions::new())
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap().unwrap().len(), 3);
    }
    assert_eq!(store.loads(), 1);
}

#[test]
fn concurrent_failed_load_is_shared_then_retried() {
    let (store, engine) = engine_with(vec![letters()], EngineConfig::default());
    store.set_load_delay(Duration::from_millis(50));
    store.fail_loads.store(true, std::sync::atomic::Ordering::SeqCst);
    let engine = Arc::new(engine);
    let barrier = Arc::new(Barrier::new(4));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let engine = Arc::clone(&engine);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                engine.get_item_by_id("letters", "a")
            })
        })
        .collect();

    for handle in handles {
        let err = handle.join().unwrap().unwrap_err();
        assert!(matches!(err, ListServError::Storage { .. }));
        assert!(err.is_retryable());
    }
    assert!(!engine.cache().is_resident("letters"));

    store.fail_loads.store(false, std::sync::atomic::Ordering::SeqCst);
    let before = store.loads();
    assert_eq!(engine.get_item_by_id("letters", "a").unwrap().name, "Alpha");
    assert_eq!(store.loads(), before + 1);
}

#[test]
fn initialization_runs_once_across_callers() {
    let (store, engine) = engine_with(vec![letters(), customers()], EngineConfig::default());
    let engine = Arc::new(engine);
    let barrier = Arc::new(Barrier::new(8));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let engine = Arc::clone(&engine);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                engine.list_dataset_ids()
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(
            handle.join().unwrap().unwrap(),
            vec!["customers".to_string(), "letters".to_string()]
        );
    }
    assert_eq!(store.lists.load(std::sync::atomic::Ordering::SeqCst), 1);
}

#[test]
fn failed_initialization_is_retried() {
    let (store, engine) = engine_with(vec![letters()], EngineConfig::default());
    store.fail_lists.store(true, std::sync::atomic::Ordering::SeqCst);

    let err = engine.list_dataset_ids().unwrap_err();
    assert!(matches!(err, ListServError::Storage { .. }));
    assert!(err.is_retryable());
    assert!(!engine.is_initialized());

    store.fail_lists.store(false, std::sync::atomic::Ordering::SeqCst);
    assert_eq!(engine.list_dataset_ids().unwrap(), vec!["letters".to_string()]);
    assert!(engine.is_initialized());
}

#[test]
fn validation_fails_before_initialization() {
    let (store, engine) = engine_with(vec![letters()], EngineConfig::default());
    assert!(matches!(
        engine.list_items("letters", 0, 0, &ReadOptions::new()),
        Err(ListServError::Validation { .. })
    ));
    assert!(matches!(
        engine.get_item_by_id(" ", "a"),
        Err(ListServError::Validation { .. })
    ));
    assert_eq!(store.lists.load(std::sync::atomic::Ordering::SeqCst), 0);
    assert_eq!(store.loads(), 0);
}
