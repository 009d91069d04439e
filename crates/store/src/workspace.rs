#![forbid(unsafe_code)]

//! Named workspaces: a directory of table CSVs plus a `meta.json` carrying the
//! table list and the last query state. Saves are full snapshots, loads are
//! diff-based against the current catalog, deletes are recursive.

use crate::{Store, StoreError, WORKSPACES_DIR, Warning, csvio, journal, now_rfc3339};
use cq_core::ids::{TableName, WorkspaceName};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

const META_FILE: &str = "meta.json";
const WORKSPACE_TABLES_DIR: &str = "tables";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableMeta {
    pub source: String,
    pub custom_name: String,
    pub description: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceMeta {
    pub tables: BTreeMap<String, TableMeta>,
    pub last_query: String,
    pub last_description: String,
    #[serde(default)]
    pub saved_at: String,
}

impl WorkspaceMeta {
    /// Snapshot equality for the idempotence contract: two saves with no
    /// intervening mutation must leave `meta.json` byte-identical, so the
    /// timestamp is excluded from the comparison and the old file is kept
    /// when nothing else changed.
    fn same_content(&self, other: &Self) -> bool {
        self.tables == other.tables
            && self.last_query == other.last_query
            && self.last_description == other.last_description
    }
}

#[derive(Clone, Debug)]
pub struct WorkspaceSummary {
    pub name: String,
    pub table_count: usize,
    pub saved_at: String,
}

#[derive(Clone, Debug)]
pub struct WorkspaceLoadOutcome {
    pub loaded: Vec<String>,
    pub last_query: String,
    pub last_description: String,
    pub warnings: Vec<Warning>,
}

impl Store {
    fn workspace_dir(&self, name: &WorkspaceName) -> PathBuf {
        self.data_dir().join(WORKSPACES_DIR).join(name.as_str())
    }

    /// Dumps every catalog table into the workspace and writes `meta.json`
    /// last. Per-table failures warn and the batch continues. Files whose
    /// serialized content is unchanged are left untouched, which keeps repeat
    /// saves byte-identical.
    pub fn workspace_save(
        &mut self,
        name: &WorkspaceName,
        last_query: &str,
        last_description: &str,
    ) -> Result<Vec<Warning>, StoreError> {
        let ws_dir = self.workspace_dir(name);
        let tables_dir = ws_dir.join(WORKSPACE_TABLES_DIR);

        journal::begin(
            self.data_dir(),
            &journal::JournalEntry::WorkspaceSave {
                workspace: name.as_str().to_string(),
                started_at: now_rfc3339(),
            },
        )?;
        std::fs::create_dir_all(&tables_dir)?;

        let mut warnings = Vec::new();
        let mut tables = BTreeMap::new();
        for raw in self.list_tables()? {
            let table = match TableName::try_new(raw.clone()) {
                Ok(table) => table,
                Err(err) => {
                    warnings.push(Warning::new(
                        "SKIPPED_TABLE",
                        format!("could not save table {raw}: {err}"),
                    ));
                    continue;
                }
            };
            let dataset = match self.dump(&table) {
                Ok(dataset) => dataset,
                Err(err) => {
                    warnings.push(Warning::new(
                        "SKIPPED_TABLE",
                        format!("could not save table {raw}: {err}"),
                    ));
                    continue;
                }
            };
            let file_name = table.file_name();
            if let Err(err) =
                csvio::write_dataset_if_changed(&tables_dir.join(&file_name), &dataset)
            {
                warnings.push(Warning::new(
                    "SKIPPED_TABLE",
                    format!("could not save table {raw}: {err}"),
                ));
                continue;
            }
            tables.insert(
                raw.clone(),
                TableMeta {
                    source: file_name,
                    custom_name: raw,
                    description: format!("Saved from workspace '{name}'"),
                },
            );
        }

        // A re-save owns the whole directory: table files from a previous save
        // that no longer correspond to a catalog table are stale.
        for (stem, path) in csvio::csv_files_in(&tables_dir)? {
            if !tables.contains_key(&stem) {
                std::fs::remove_file(path)?;
            }
        }

        let candidate = WorkspaceMeta {
            tables,
            last_query: last_query.to_string(),
            last_description: last_description.to_string(),
            saved_at: now_rfc3339(),
        };
        let meta_path = ws_dir.join(META_FILE);
        let unchanged = match read_meta(&meta_path) {
            Ok(Some(existing)) => existing.same_content(&candidate),
            _ => false,
        };
        if !unchanged {
            std::fs::write(&meta_path, serde_json::to_vec_pretty(&candidate)?)?;
        }

        journal::clear(self.data_dir())?;
        Ok(warnings)
    }

    /// Brings the catalog to the workspace's table set: tables absent from the
    /// snapshot are dropped, listed tables are (re)registered from their CSVs.
    /// A listed table whose file is missing warns and is skipped; the rest
    /// still load.
    pub fn workspace_load(
        &mut self,
        name: &WorkspaceName,
    ) -> Result<WorkspaceLoadOutcome, StoreError> {
        let ws_dir = self.workspace_dir(name);
        let meta = read_meta(&ws_dir.join(META_FILE))?
            .ok_or_else(|| StoreError::UnknownWorkspace(name.as_str().to_string()))?;
        let tables_dir = ws_dir.join(WORKSPACE_TABLES_DIR);

        let mut warnings = Vec::new();

        for current in self.list_tables()? {
            if meta.tables.contains_key(&current) {
                continue;
            }
            self.drop_table_raw(&current)?;
        }

        let mut loaded = Vec::new();
        for (raw, info) in &meta.tables {
            let table = match TableName::try_new(raw.clone()) {
                Ok(table) => table,
                Err(err) => {
                    warnings.push(Warning::new(
                        "SKIPPED_TABLE",
                        format!("workspace lists invalid table name {raw}: {err}"),
                    ));
                    continue;
                }
            };
            let csv_path = tables_dir.join(&info.source);
            if !csv_path.exists() {
                warnings.push(Warning::new(
                    "MISSING_TABLE_FILE",
                    format!("missing table file: {}", csv_path.display()),
                ));
                continue;
            }
            let dataset = match csvio::read_dataset(&csv_path) {
                Ok(dataset) => dataset,
                Err(err) => {
                    warnings.push(Warning::new(
                        "BAD_TABLE_FILE",
                        format!("could not load table {raw}: {err}"),
                    ));
                    continue;
                }
            };
            if let Err(err) = self.register(&table, &dataset) {
                warnings.push(Warning::new(
                    "BAD_TABLE_FILE",
                    format!("could not register table {raw}: {err}"),
                ));
                continue;
            }
            loaded.push(raw.clone());
        }

        Ok(WorkspaceLoadOutcome {
            loaded,
            last_query: meta.last_query,
            last_description: meta.last_description,
            warnings,
        })
    }

    pub fn workspace_delete(&mut self, name: &WorkspaceName) -> Result<(), StoreError> {
        let ws_dir = self.workspace_dir(name);
        if !ws_dir.exists() {
            return Err(StoreError::UnknownWorkspace(name.as_str().to_string()));
        }
        std::fs::remove_dir_all(ws_dir)?;
        Ok(())
    }

    pub fn workspace_list(&self) -> Result<Vec<WorkspaceSummary>, StoreError> {
        let root = self.data_dir().join(WORKSPACES_DIR);
        let mut out = Vec::new();
        let entries = match std::fs::read_dir(&root) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(out),
            Err(err) => return Err(err.into()),
        };
        for entry in entries {
            let entry = entry?;
            if !entry.path().is_dir() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(|s| s.to_string()) else {
                continue;
            };
            let (table_count, saved_at) = match read_meta(&entry.path().join(META_FILE)) {
                Ok(Some(meta)) => (meta.tables.len(), meta.saved_at),
                _ => (0, String::new()),
            };
            out.push(WorkspaceSummary {
                name,
                table_count,
                saved_at,
            });
        }
        out.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(out)
    }
}

fn read_meta(path: &std::path::Path) -> Result<Option<WorkspaceMeta>, StoreError> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err.into()),
    };
    Ok(Some(serde_json::from_slice(&bytes)?))
}
