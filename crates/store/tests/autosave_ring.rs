#![forbid(unsafe_code)]

use cq_core::ids::TableName;
use cq_core::model::Dataset;
use cq_store::{Store, StoreError};
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(test_name: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("cq_autosave_{test_name}_{nanos}"));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn one_cell(value: &str) -> Dataset {
    Dataset::new(vec!["v".to_string()], vec![vec![value.to_string()]]).expect("valid dataset")
}

fn slot_csv(dir: &PathBuf, slot: usize) -> String {
    std::fs::read_to_string(dir.join(format!("autosaves/workspace_{slot}/t.csv")))
        .unwrap_or_default()
}

#[test]
fn capture_fills_slot_one() {
    let dir = temp_dir("fill");
    let (mut store, _) = Store::open(&dir, 4).unwrap();

    let name = TableName::try_new("t").unwrap();
    store.register(&name, &one_cell("first")).unwrap();
    let warnings = store.autosave_capture().unwrap();
    assert!(warnings.is_empty());

    assert_eq!(slot_csv(&dir, 1), "v\nfirst\n");

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn rotation_shifts_slots_and_evicts_oldest() {
    let dir = temp_dir("rotate");
    let depth = 2;
    let (mut store, _) = Store::open(&dir, depth).unwrap();
    let name = TableName::try_new("t").unwrap();

    // depth + 1 captures: the first one must fall off the end.
    store.register(&name, &one_cell("c1")).unwrap();
    store.autosave_capture().unwrap();
    store.register(&name, &one_cell("c2")).unwrap();
    store.autosave_capture().unwrap();
    store.register(&name, &one_cell("c3")).unwrap();
    store.autosave_capture().unwrap();

    assert_eq!(slot_csv(&dir, 1), "v\nc3\n");
    assert_eq!(slot_csv(&dir, depth), "v\nc2\n");
    assert!(!dir.join(format!("autosaves/workspace_{}", depth + 1)).exists());

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn depth_one_capture_replaces_the_previous_snapshot() {
    let dir = temp_dir("depth_one");
    let (mut store, _) = Store::open(&dir, 1).unwrap();

    store
        .register(&TableName::try_new("t").unwrap(), &one_cell("old"))
        .unwrap();
    store.autosave_capture().unwrap();

    store.reset().unwrap();
    store
        .register(&TableName::try_new("u").unwrap(), &one_cell("new"))
        .unwrap();
    store.autosave_capture().unwrap();

    // The deleted table's CSV must not survive into the fresh snapshot.
    assert!(!dir.join("autosaves/workspace_1/t.csv").exists());
    assert_eq!(
        std::fs::read_to_string(dir.join("autosaves/workspace_1/u.csv")).unwrap(),
        "v\nnew\n"
    );
    let slots = store.autosave_slots().unwrap();
    assert_eq!(slots.len(), 1);
    assert_eq!(slots[0].tables, ["u"]);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn capture_with_empty_catalog_is_a_no_op() {
    let dir = temp_dir("empty");
    let (mut store, _) = Store::open(&dir, 2).unwrap();

    let name = TableName::try_new("t").unwrap();
    store.register(&name, &one_cell("keep")).unwrap();
    store.autosave_capture().unwrap();

    store.reset().unwrap();
    store.autosave_capture().unwrap();

    // The existing snapshot did not rotate away.
    assert_eq!(slot_csv(&dir, 1), "v\nkeep\n");

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn slots_listing_reports_populated_slots_newest_first() {
    let dir = temp_dir("slots");
    let (mut store, _) = Store::open(&dir, 3).unwrap();
    let name = TableName::try_new("t").unwrap();

    store.register(&name, &one_cell("a")).unwrap();
    store.autosave_capture().unwrap();
    store.autosave_capture().unwrap();

    let slots = store.autosave_slots().unwrap();
    assert_eq!(slots.len(), 2);
    assert_eq!(slots[0].slot, 1);
    assert_eq!(slots[0].tables, ["t"]);
    assert_eq!(slots[1].slot, 2);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn restore_brings_snapshot_tables_back() {
    let dir = temp_dir("restore");
    let (mut store, _) = Store::open(&dir, 2).unwrap();
    let name = TableName::try_new("t").unwrap();

    store.register(&name, &one_cell("snapshotted")).unwrap();
    store.autosave_capture().unwrap();

    store.register(&name, &one_cell("newer")).unwrap();
    let (restored, warnings) = store.autosave_restore(1).unwrap();
    assert_eq!(restored, ["t"]);
    assert!(warnings.is_empty());
    assert_eq!(store.dump(&name).unwrap(), one_cell("snapshotted"));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn restore_of_absent_slot_errors() {
    let dir = temp_dir("absent_slot");
    let (mut store, _) = Store::open(&dir, 2).unwrap();

    assert!(matches!(
        store.autosave_restore(1),
        Err(StoreError::UnknownSlot(1))
    ));
    assert!(matches!(
        store.autosave_restore(9),
        Err(StoreError::UnknownSlot(9))
    ));

    let _ = std::fs::remove_dir_all(&dir);
}
