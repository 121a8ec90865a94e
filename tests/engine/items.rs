//! Item semantics: archive, bulk add atomicity, pagination, projection

use crate::common::*;
use listserv::{DataEngine, EngineConfig, Item, ListServError, ReadOptions};

fn engine() -> DataEngine {
    let engine = DataEngine::ephemeral();
    engine.create_dataset(letters()).unwrap();
    engine
}

#[test]
fn archived_item_hidden_but_kept() {
    let engine = engine();
    engine.archive_item("letters", "b").unwrap();

    assert!(matches!(
        engine.get_item_by_id("letters", "b"),
        Err(ListServError::ItemNotFound { .. })
    ));
    let listed = engine.list_items("letters", 0, 10, &ReadOptions::new()).unwrap();
    assert_eq!(ids(&listed), vec!["a", "c"]);
    assert!(engine
        .search_items("letters", "bravo", 0, 10, &ReadOptions::new())
        .unwrap()
        .is_empty());

    let raw = engine
        .get_dataset_by_id("letters", &ReadOptions::new())
        .unwrap();
    assert!(raw.items["b"].is_archived);
    assert_eq!(raw.items.len(), 3);

    let filtered = engine
        .get_dataset_by_id("letters", &ReadOptions::new().with_fields(["name"]))
        .unwrap();
    assert!(!filtered.items.contains_key("b"));
}

#[test]
fn archived_id_still_blocks_add() {
    let engine = engine();
    engine.archive_item("letters", "b").unwrap();
    assert!(matches!(
        engine.add_item("letters", named("b", "Beta")),
        Err(ListServError::ItemAlreadyExists { .. })
    ));
}

#[test]
fn bulk_add_is_all_or_nothing() {
    let (store, engine) = engine_with(vec![letters()], EngineConfig::default());
    let err = engine
        .add_items(
            "letters",
            vec![named("new1", "One"), named("a", "Again"), named("new2", "Two")],
        )
        .unwrap_err();
    assert!(matches!(err, ListServError::ItemAlreadyExists { .. }));
    assert!(err.to_string().contains("'a'"));

    for id in ["new1", "new2"] {
        assert!(engine.get_item_by_id("letters", id).is_err());
    }
    assert!(engine
        .search_items("letters", "one", 0, 10, &ReadOptions::new())
        .unwrap()
        .is_empty());
    assert_eq!(store.saves(), 0);
    assert_eq!(store.stored("letters").unwrap().items.len(), 3);
}

#[test]
fn bulk_add_reports_first_five_duplicates() {
    let engine = DataEngine::ephemeral();
    let existing: Vec<Item> = (0..8).map(|i| named(&format!("i{}", i), "x")).collect();
    engine
        .create_dataset(listserv::Dataset::new("many", "Many", "id", "name").with_items(existing.clone()))
        .unwrap();

    match engine.add_items("many", existing).unwrap_err() {
        ListServError::ItemAlreadyExists {
            item_ids,
            remaining,
            dataset_id,
        } => {
            assert_eq!(item_ids.len(), 5);
            assert_eq!(remaining, 3);
            assert_eq!(dataset_id, "many");
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn bulk_add_success_indexes_all() {
    let engine = engine();
    engine
        .add_items("letters", vec![named("d", "Delta"), named("e", "Echo")])
        .unwrap();
    let found = engine.search_items("letters", "ta", 0, 10, &ReadOptions::new()).unwrap();
    assert_eq!(ids(&found), vec!["d"]);
    assert_eq!(engine.list_items("letters", 0, 10, &ReadOptions::new()).unwrap().len(), 5);
}

#[test]
fn pagination_is_deterministic() {
    let engine = engine();
    let page = engine.list_items("letters", 1, 1, &ReadOptions::new()).unwrap();
    assert_eq!(ids(&page), vec!["b"]);

    let found = engine.search_items("letters", "a", 1, 1, &ReadOptions::new()).unwrap();
    // "a" matches Alpha, Bravo and Charlie
    assert_eq!(ids(&found), vec!["b"]);
}

#[test]
fn search_is_case_insensitive_substring() {
    let engine = engine();
    for term in ["ALPHA", "lph", "Alp", "ha"] {
        let found = engine.search_items("letters", term, 0, 10, &ReadOptions::new()).unwrap();
        assert!(ids(&found).contains(&"a"), "{} did not match", term);
    }
}

#[test]
fn take_is_bounded_by_config() {
    let config = EngineConfig::default().with_max_search_results(2);
    let (_store, engine) = engine_with(vec![letters()], config);
    assert!(engine.list_items("letters", 0, 2, &ReadOptions::new()).is_ok());
    let err = engine.list_items("letters", 0, 3, &ReadOptions::new()).unwrap_err();
    assert_eq!(err.category(), listserv::ErrorCategory::BadRequest);
}

#[test]
fn update_moves_index_entry() {
    let engine = engine();
    engine.update_item("letters", named("c", "Cobalt")).unwrap();
    assert!(engine
        .search_items("letters", "charlie", 0, 10, &ReadOptions::new())
        .unwrap()
        .is_empty());
    let found = engine.search_items("letters", "cob", 0, 10, &ReadOptions::new()).unwrap();
    assert_eq!(ids(&found), vec!["c"]);
}

#[test]
fn projection_keeps_requested_fields_only() {
    let engine = DataEngine::ephemeral();
    engine.create_dataset(customers()).unwrap();

    let items = engine
        .list_items("customers", 0, 10, &ReadOptions::new().with_fields(["email"]))
        .unwrap();
    assert_eq!(items[0].data.len(), 1);
    assert_eq!(items[0].data["email"], "ada@example.com");

    let bare = engine.list_items("customers", 0, 10, &ReadOptions::new()).unwrap();
    assert!(bare.iter().all(|item| item.data.is_empty()));
    assert_eq!(bare[0].name, "Ada");
}
