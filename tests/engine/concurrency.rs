//! Concurrent readers and writers against one engine
//!
//! Readers never observe a half-applied batch: every snapshot holds either
//! none or all of a batch's items.

use crate::common::*;
use listserv::{EngineConfig, Item, ReadOptions};
use std::sync::{Arc, Barrier};
use std::thread;

#[test]
fn batches_are_atomic_to_readers() {
    let (_store, engine) = engine_with(vec![letters()], EngineConfig::default());
    let engine = Arc::new(engine);
    let barrier = Arc::new(Barrier::new(5));

    let writer = {
        let engine = Arc::clone(&engine);
        let barrier = Arc::clone(&barrier);
        thread::spawn(move || {
            barrier.wait();
            for batch in 0..50 {
                let items: Vec<Item> = (0..4)
                    .map(|i| named(&format!("w{:02}-{}", batch, i), "Batch"))
                    .collect();
                engine.add_items("letters", items).unwrap();
            }
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let engine = Arc::clone(&engine);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for _ in 0..100 {
                    let dataset = engine
                        .get_dataset_by_id("letters", &ReadOptions::new())
                        .unwrap();
                    assert_eq!((dataset.items.len() - 3) % 4, 0);
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }
    let found = engine
        .search_items("letters", "batch", 0, 1000, &ReadOptions::new())
        .unwrap();
    assert_eq!(found.len(), 200);
}

#[test]
fn concurrent_distinct_adds_all_land() {
    let (store, engine) = engine_with(vec![letters()], EngineConfig::default());
    let engine = Arc::new(engine);
    let barrier = Arc::new(Barrier::new(8));

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let engine = Arc::clone(&engine);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for i in 0..10 {
                    engine
                        .add_item("letters", named(&format!("t{}-{}", t, i), "Thread"))
                        .unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(store.stored("letters").unwrap().items.len(), 83);
    assert_eq!(
        engine.get_dataset_by_id("letters", &ReadOptions::new()).unwrap().items.len(),
        83
    );
}

#[test]
fn concurrent_duplicate_add_only_one_wins() {
    let (_store, engine) = engine_with(vec![letters()], EngineConfig::default());
    let engine = Arc::new(engine);
    let barrier = Arc::new(Barrier::new(6));

    let handles: Vec<_> = (0..6)
        .map(|_| {
            let engine = Arc::clone(&engine);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                engine.add_item("letters", named("x", "Xray")).is_ok()
            })
        })
        .collect();

    let wins = handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .filter(|won| *won)
        .count();
    assert_eq!(wins, 1);
}

#[test]
fn guard_counts_shared_and_exclusive_sections() {
    let (_store, engine) = engine_with(vec![letters()], EngineConfig::default());
    engine.get_item_by_id("letters", "a").unwrap();
    let before = engine.cache().guard_stats();

    engine.get_item_by_id("letters", "b").unwrap();
    engine.archive_item("letters", "c").unwrap();

    let after = engine.cache().guard_stats();
    assert!(after.reads > before.reads);
    assert!(after.writes > before.writes);
}
