//! File-backed engine: config bootstrap, persistence across reopen, backups

use crate::common::*;
use listserv::{
    DataEngine, EngineConfig, ListServConfig, ListServError, ReadOptions, StoreConfig,
    CONFIG_FILE_NAME,
};
use tempfile::TempDir;

#[test]
fn open_writes_default_config() {
    let dir = TempDir::new().unwrap();
    let engine = DataEngine::open(dir.path()).unwrap();

    let config_path = dir.path().join(CONFIG_FILE_NAME);
    assert!(config_path.exists());
    let config = ListServConfig::from_file(&config_path).unwrap();
    assert_eq!(&config.engine, engine.config());
    assert!(engine.list_dataset_ids().unwrap().is_empty());
}

#[test]
fn open_reads_existing_config() {
    let dir = TempDir::new().unwrap();
    let config = ListServConfig {
        engine: EngineConfig::default().with_max_search_results(7),
        store: StoreConfig::for_testing(),
    };
    config.write_to_file(&dir.path().join(CONFIG_FILE_NAME)).unwrap();

    let engine = DataEngine::open(dir.path()).unwrap();
    assert_eq!(engine.config().max_search_results, 7);
}

#[test]
fn invalid_config_file_is_rejected() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join(CONFIG_FILE_NAME), "[engine\nbroken").unwrap();
    assert!(matches!(
        DataEngine::open(dir.path()),
        Err(ListServError::Validation { .. })
    ));
}

#[test]
fn data_survives_reopen() {
    let dir = TempDir::new().unwrap();
    {
        let engine = DataEngine::open(dir.path()).unwrap();
        engine.create_dataset(letters()).unwrap();
        engine.add_item("letters", named("d", "Delta")).unwrap();
        engine.archive_item("letters", "a").unwrap();
    }

    let engine = DataEngine::open(dir.path()).unwrap();
    assert_eq!(engine.list_dataset_ids().unwrap(), vec!["letters".to_string()]);
    let items = engine.list_items("letters", 0, 10, &ReadOptions::new()).unwrap();
    assert_eq!(ids(&items), vec!["b", "c", "d"]);
    let found = engine.search_items("letters", "elt", 0, 10, &ReadOptions::new()).unwrap();
    assert_eq!(ids(&found), vec!["d"]);
}

#[test]
fn backup_and_restore_round() {
    let dir = TempDir::new().unwrap();
    let engine = DataEngine::open(dir.path()).unwrap();
    engine.create_dataset(letters()).unwrap();

    let backup = engine.backup_dataset("letters").unwrap();
    assert!(engine.list_backups("letters").unwrap().contains(&backup));

    engine.add_item("letters", named("d", "Delta")).unwrap();
    engine.restore_backup("letters", &backup).unwrap();

    assert!(engine.get_item_by_id("letters", "d").unwrap_err().is_not_found());
    assert_eq!(engine.list_items("letters", 0, 10, &ReadOptions::new()).unwrap().len(), 3);
}

#[test]
fn restore_of_missing_backup_fails() {
    let dir = TempDir::new().unwrap();
    let engine = DataEngine::open(dir.path()).unwrap();
    engine.create_dataset(letters()).unwrap();

    assert!(matches!(
        engine.restore_backup("letters", "letters_backup_19700101000000000.json"),
        Err(ListServError::Storage { .. })
    ));
    assert!(engine.backup_dataset("ghost").unwrap_err().is_not_found());
}

#[test]
fn delete_removes_file() {
    let dir = TempDir::new().unwrap();
    let engine = DataEngine::open(dir.path()).unwrap();
    engine.create_dataset(letters()).unwrap();
    engine.delete_dataset("letters").unwrap();

    let reopened = DataEngine::open(dir.path()).unwrap();
    assert!(reopened.list_dataset_ids().unwrap().is_empty());
}

#[test]
fn unstorable_id_is_rejected_before_registration() {
    let dir = TempDir::new().unwrap();
    let engine = DataEngine::open(dir.path()).unwrap();

    let err = engine
        .create_dataset(listserv::Dataset::new("a/b", "Slashed", "id", "name"))
        .unwrap_err();
    assert!(matches!(err, ListServError::Validation { .. }));
    assert!(engine.list_dataset_ids().unwrap().is_empty());
    assert!(engine.get_state().unwrap().datasets.is_empty());

    // a retry with the same bad id is still a validation failure, not a conflict
    assert!(matches!(
        engine.create_dataset(listserv::Dataset::new("a/b", "Slashed", "id", "name")),
        Err(ListServError::Validation { .. })
    ));
    engine
        .create_dataset(listserv::Dataset::new("ab", "Plain", "id", "name"))
        .unwrap();
}
