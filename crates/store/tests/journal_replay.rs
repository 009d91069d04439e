#![forbid(unsafe_code)]

use cq_core::ids::{TableName, WorkspaceName};
use cq_core::model::Dataset;
use cq_store::Store;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(test_name: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("cq_journal_{test_name}_{nanos}"));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn one_cell(value: &str) -> Dataset {
    Dataset::new(vec!["v".to_string()], vec![vec![value.to_string()]]).expect("valid dataset")
}

fn write_journal(dir: &PathBuf, body: &str) {
    std::fs::write(dir.join("journal.json"), body).unwrap();
}

#[test]
fn interrupted_rename_is_finished_on_open() {
    let dir = temp_dir("rename_finish");
    {
        let (mut store, _) = Store::open(&dir, 4).unwrap();
        store
            .register(&TableName::try_new("old_name").unwrap(), &one_cell("x"))
            .unwrap();
    }
    // Crash simulation: journal written, file not yet moved.
    write_journal(
        &dir,
        r#"{"op":"rename","table":"old_name","to":"new_name","started_at":""}"#,
    );

    let (store, warnings) = Store::open(&dir, 4).unwrap();
    assert!(warnings.iter().any(|w| w.code == "JOURNAL_REPLAYED"));
    assert!(!dir.join("journal.json").exists());
    assert!(!dir.join("tables/old_name.csv").exists());
    assert!(dir.join("tables/new_name.csv").exists());
    assert_eq!(store.list_tables().unwrap(), ["new_name"]);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn interrupted_delete_is_finished_on_open() {
    let dir = temp_dir("delete_finish");
    {
        let (mut store, _) = Store::open(&dir, 4).unwrap();
        store
            .register(&TableName::try_new("doomed").unwrap(), &one_cell("x"))
            .unwrap();
    }
    write_journal(
        &dir,
        r#"{"op":"delete","table":"doomed","started_at":""}"#,
    );

    let (store, warnings) = Store::open(&dir, 4).unwrap();
    assert!(warnings.iter().any(|w| w.code == "JOURNAL_REPLAYED"));
    assert!(!dir.join("tables/doomed.csv").exists());
    assert!(store.list_tables().unwrap().is_empty());

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn partial_workspace_save_without_meta_is_discarded() {
    let dir = temp_dir("partial_save");
    std::fs::create_dir_all(dir.join("workspaces/half/tables")).unwrap();
    std::fs::write(dir.join("workspaces/half/tables/t.csv"), "v\n1\n").unwrap();
    write_journal(
        &dir,
        r#"{"op":"workspace_save","workspace":"half","started_at":""}"#,
    );

    let (store, warnings) = Store::open(&dir, 4).unwrap();
    assert!(warnings.iter().any(|w| w.code == "JOURNAL_REPLAYED"));
    assert!(!dir.join("workspaces/half").exists());
    assert!(store.workspace_list().unwrap().is_empty());

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn interrupted_resave_keeps_workspace_but_warns() {
    let dir = temp_dir("resave_warn");
    let ws = WorkspaceName::try_new("kept").unwrap();
    {
        let (mut store, _) = Store::open(&dir, 4).unwrap();
        store
            .register(&TableName::try_new("t").unwrap(), &one_cell("x"))
            .unwrap();
        store.workspace_save(&ws, "", "").unwrap();
    }
    write_journal(
        &dir,
        r#"{"op":"workspace_save","workspace":"kept","started_at":""}"#,
    );

    let (mut store, warnings) = Store::open(&dir, 4).unwrap();
    assert!(warnings.iter().any(|w| w.code == "JOURNAL_REPLAYED"));
    // The earlier complete snapshot is still loadable.
    let outcome = store.workspace_load(&ws).unwrap();
    assert_eq!(outcome.loaded, ["t"]);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn unreadable_journal_warns_and_clears() {
    let dir = temp_dir("garbage");
    write_journal(&dir, "not json at all");

    let (_store, warnings) = Store::open(&dir, 4).unwrap();
    assert!(warnings.iter().any(|w| w.code == "JOURNAL_UNREADABLE"));
    assert!(!dir.join("journal.json").exists());

    let _ = std::fs::remove_dir_all(&dir);
}
