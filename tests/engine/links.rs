//! Cross-dataset link enrichment through the engine

use crate::common::*;
use listserv::{EngineConfig, ReadOptions};
use serde_json::{json, Value};
use std::sync::atomic::Ordering;

fn linked(items: &[listserv::Item], id: &str, key: &str) -> Vec<Value> {
    let item = items.iter().find(|item| item.id == id).unwrap();
    item.data[key].as_array().unwrap().clone()
}

#[test]
fn customers_get_their_orders() {
    let (_store, engine) = engine_with(vec![customers(), orders()], EngineConfig::default());
    let options = ReadOptions::new().with_links(["orders-customerId"]);

    let items = engine.list_items("customers", 0, 10, &options).unwrap();
    assert_eq!(ids(&items), vec!["c1", "c2"]);

    let mut totals: Vec<i64> = linked(&items, "c1", "orders")
        .iter()
        .map(|order| order["total"].as_i64().unwrap())
        .collect();
    totals.sort();
    assert_eq!(totals, vec![10, 25]);
    assert_eq!(linked(&items, "c2", "orders"), Vec::<Value>::new());
}

#[test]
fn links_combine_with_projection() {
    let (_store, engine) = engine_with(vec![customers(), orders()], EngineConfig::default());
    let options = ReadOptions::new()
        .with_fields(["email"])
        .with_links(["orders-customerId"]);

    let item = engine
        .search_items_by_ids("customers", &["c2".to_string()], &options)
        .unwrap()
        .pop()
        .unwrap();
    assert_eq!(item.data.len(), 2);
    assert_eq!(item.data["email"], "grace@example.com");
    assert_eq!(item.data["orders"], json!([]));
}

#[test]
fn archived_linked_items_are_skipped() {
    let (_store, engine) = engine_with(vec![customers(), orders()], EngineConfig::default());
    engine.archive_item("orders", "o2").unwrap();

    let items = engine
        .list_items("customers", 0, 10, &ReadOptions::new().with_links(["orders-customerId"]))
        .unwrap();
    let c1 = linked(&items, "c1", "orders");
    assert_eq!(c1.len(), 1);
    assert_eq!(c1[0]["total"], 10);
}

#[test]
fn unknown_and_malformed_links_are_ignored() {
    let (_store, engine) = engine_with(vec![customers(), orders()], EngineConfig::default());
    let options = ReadOptions::new().with_links(["ghosts-customerId", "nodash", "-x"]);

    let items = engine.list_items("customers", 0, 10, &options).unwrap();
    assert!(items.iter().all(|item| item.data.is_empty()));
}

#[test]
fn link_cap_applies_before_filtering() {
    let config = EngineConfig::default().with_max_linked_datasets(1);
    let (_store, engine) = engine_with(vec![customers(), orders()], config);
    let options = ReadOptions::new().with_links(["ghosts-customerId", "orders-customerId"]);

    let items = engine.list_items("customers", 0, 10, &options).unwrap();
    assert!(items.iter().all(|item| !item.data.contains_key("orders")));
}

#[test]
fn failed_linked_load_degrades_only_that_link() {
    init_tracing();
    let (store, engine) = engine_with(vec![customers(), orders()], EngineConfig::default());
    engine.get_item_by_id("customers", "c1").unwrap();
    engine.get_item_by_id("orders", "o1").unwrap();
    engine.invalidate_cache("orders").unwrap();
    store.fail_loads.store(true, Ordering::SeqCst);

    let items = engine
        .list_items("customers", 0, 10, &ReadOptions::new().with_links(["orders-customerId"]))
        .unwrap();
    assert_eq!(items.len(), 2);
    assert!(items.iter().all(|item| !item.data.contains_key("orders")));

    store.fail_loads.store(false, Ordering::SeqCst);
    let items = engine
        .list_items("customers", 0, 10, &ReadOptions::new().with_links(["orders-customerId"]))
        .unwrap();
    assert_eq!(linked(&items, "c1", "orders").len(), 2);
}

#[test]
fn filtered_dataset_read_is_enriched() {
    let (_store, engine) = engine_with(vec![customers(), orders()], EngineConfig::default());
    let dataset = engine
        .get_dataset_by_id("customers", &ReadOptions::new().with_links(["orders-customerId"]))
        .unwrap();
    assert_eq!(dataset.items["c1"].data["orders"].as_array().unwrap().len(), 2);
    assert_eq!(dataset.items["c2"].data["orders"], json!([]));
}
