#![forbid(unsafe_code)]

//! Pending-operation journal. Multi-step mutations (rename, delete, workspace
//! save) span a file move and an engine statement; a crash between the halves
//! would otherwise leave the mirror and the catalog disagreeing with nothing
//! to notice. The journal entry is written before the first half and removed
//! after the last, so a leftover entry at open time identifies exactly which
//! operation to finish or discard.

use crate::{StoreError, TABLES_DIR, WORKSPACES_DIR, Warning};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const JOURNAL_FILE: &str = "journal.json";

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub(crate) enum JournalEntry {
    Rename {
        table: String,
        to: String,
        started_at: String,
    },
    Delete {
        table: String,
        started_at: String,
    },
    WorkspaceSave {
        workspace: String,
        started_at: String,
    },
}

fn journal_path(data_dir: &Path) -> PathBuf {
    data_dir.join(JOURNAL_FILE)
}

pub(crate) fn begin(data_dir: &Path, entry: &JournalEntry) -> Result<(), StoreError> {
    let bytes = serde_json::to_vec_pretty(entry)?;
    std::fs::write(journal_path(data_dir), bytes)?;
    Ok(())
}

pub(crate) fn clear(data_dir: &Path) -> Result<(), StoreError> {
    match std::fs::remove_file(journal_path(data_dir)) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err.into()),
    }
}

/// Called once at open, before the engine catalog is rebuilt from the live
/// mirror. Since the catalog is rebuilt from files anyway, repair only has to
/// settle the file side of whichever operation was cut short.
pub(crate) fn replay_pending(data_dir: &Path) -> Result<Vec<Warning>, StoreError> {
    let path = journal_path(data_dir);
    let bytes = match std::fs::read(&path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(err.into()),
    };

    let mut warnings = Vec::new();
    match serde_json::from_slice::<JournalEntry>(&bytes) {
        Ok(JournalEntry::Rename { table, to, .. }) => {
            let tables = data_dir.join(TABLES_DIR);
            let old_path = tables.join(format!("{table}.csv"));
            let new_path = tables.join(format!("{to}.csv"));
            if old_path.exists() && !new_path.exists() {
                std::fs::rename(&old_path, &new_path)?;
                warnings.push(Warning::new(
                    "JOURNAL_REPLAYED",
                    format!("finished interrupted rename of {table} to {to}"),
                ));
            } else if old_path.exists() && new_path.exists() {
                // The new file was written but the old one never went away;
                // the rename side wins.
                std::fs::remove_file(&old_path)?;
                warnings.push(Warning::new(
                    "JOURNAL_REPLAYED",
                    format!("removed stale file for {table} after interrupted rename to {to}"),
                ));
            } else {
                warnings.push(Warning::new(
                    "JOURNAL_REPLAYED",
                    format!("rename of {table} to {to} had already completed"),
                ));
            }
        }
        Ok(JournalEntry::Delete { table, .. }) => {
            let file = data_dir.join(TABLES_DIR).join(format!("{table}.csv"));
            if file.exists() {
                std::fs::remove_file(&file)?;
            }
            warnings.push(Warning::new(
                "JOURNAL_REPLAYED",
                format!("finished interrupted delete of {table}"),
            ));
        }
        Ok(JournalEntry::WorkspaceSave { workspace, .. }) => {
            // meta.json is written last during a save. If it never landed the
            // snapshot is a fresh half-written one and gets discarded; if it
            // exists this was a re-save over an older snapshot, which now may
            // mix old and new table files and is only flagged.
            let dir = data_dir.join(WORKSPACES_DIR).join(&workspace);
            if dir.join("meta.json").exists() {
                warnings.push(Warning::new(
                    "JOURNAL_REPLAYED",
                    format!(
                        "save of workspace {workspace} was interrupted; its table files may be stale, save again to repair"
                    ),
                ));
            } else {
                if dir.exists() {
                    std::fs::remove_dir_all(&dir)?;
                }
                warnings.push(Warning::new(
                    "JOURNAL_REPLAYED",
                    format!("discarded partial save of workspace {workspace}"),
                ));
            }
        }
        Err(err) => {
            warnings.push(Warning::new(
                "JOURNAL_UNREADABLE",
                format!("could not parse pending journal entry: {err}"),
            ));
        }
    }

    std::fs::remove_file(&path)?;
    Ok(warnings)
}
