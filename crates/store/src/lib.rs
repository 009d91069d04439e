#![forbid(unsafe_code)]

//! Persistence and engine layer: an in-memory SQL engine mirrored 1:1 by CSV
//! files on disk, plus named workspace snapshots and a rotating autosave ring.
//!
//! The on-disk layout under the data dir:
//!
//! ```text
//! tables/<table>.csv                 live mirror of the engine catalog
//! workspaces/<name>/tables/*.csv     named snapshot
//! workspaces/<name>/meta.json        table list + last query state
//! autosaves/workspace_<1..N>/*.csv   rotating snapshots, 1 = newest
//! journal.json                       pending multi-step mutation, if any
//! ```

use cq_core::ids::{NameError, TableName};
use cq_core::model::DatasetError;
use rusqlite::Connection;
use std::path::{Path, PathBuf};

mod autosave;
mod csvio;
mod journal;
mod query;
mod tables;
mod workspace;

pub use autosave::AutosaveSlot;
pub use csvio::{dataset_from_csv_path, dataset_from_csv_text};
pub use query::QueryResult;
pub use workspace::{TableMeta, WorkspaceLoadOutcome, WorkspaceMeta, WorkspaceSummary};

pub(crate) const TABLES_DIR: &str = "tables";
pub(crate) const WORKSPACES_DIR: &str = "workspaces";
pub(crate) const AUTOSAVES_DIR: &str = "autosaves";

#[derive(Debug)]
pub enum StoreError {
    Io(std::io::Error),
    Sql(rusqlite::Error),
    Csv(csv::Error),
    Json(serde_json::Error),
    InvalidInput(&'static str),
    BadName(NameError),
    BadDataset(DatasetError),
    UnknownTable(String),
    TableExists(String),
    UnknownWorkspace(String),
    UnknownSlot(usize),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "io: {err}"),
            Self::Sql(err) => write!(f, "sql: {err}"),
            Self::Csv(err) => write!(f, "csv: {err}"),
            Self::Json(err) => write!(f, "json: {err}"),
            Self::InvalidInput(message) => write!(f, "invalid input: {message}"),
            Self::BadName(err) => write!(f, "bad name: {err}"),
            Self::BadDataset(err) => write!(f, "bad dataset: {err}"),
            Self::UnknownTable(name) => write!(f, "unknown table: {name}"),
            Self::TableExists(name) => write!(f, "table already exists: {name}"),
            Self::UnknownWorkspace(name) => write!(f, "unknown workspace: {name}"),
            Self::UnknownSlot(slot) => write!(f, "no autosave in slot {slot}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<std::io::Error> for StoreError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sql(value)
    }
}

impl From<csv::Error> for StoreError {
    fn from(value: csv::Error) -> Self {
        Self::Csv(value)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

impl From<NameError> for StoreError {
    fn from(value: NameError) -> Self {
        Self::BadName(value)
    }
}

impl From<DatasetError> for StoreError {
    fn from(value: DatasetError) -> Self {
        Self::BadDataset(value)
    }
}

/// A non-fatal problem surfaced to the user alongside an otherwise successful
/// operation. Batch operations (startup load, workspace save/load, autosave
/// capture) collect these instead of aborting.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Warning {
    pub code: &'static str,
    pub message: String,
}

impl Warning {
    pub(crate) fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

#[derive(Debug)]
pub struct Store {
    data_dir: PathBuf,
    conn: Connection,
    autosave_depth: usize,
}

impl Store {
    /// Opens the store over `data_dir`, replaying any pending journal entry
    /// left by a crash and loading every live table CSV into a fresh in-memory
    /// engine. Per-file load failures come back as warnings, mirroring the
    /// startup behavior of the tool this replaces: a bad file is reported, the
    /// rest still load.
    pub fn open(
        data_dir: impl AsRef<Path>,
        autosave_depth: usize,
    ) -> Result<(Self, Vec<Warning>), StoreError> {
        if autosave_depth == 0 {
            return Err(StoreError::InvalidInput("autosave depth must be at least 1"));
        }
        let data_dir = data_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(data_dir.join(TABLES_DIR))?;
        std::fs::create_dir_all(data_dir.join(WORKSPACES_DIR))?;
        std::fs::create_dir_all(data_dir.join(AUTOSAVES_DIR))?;

        let mut warnings = journal::replay_pending(&data_dir)?;

        let conn = Connection::open_in_memory()?;
        let mut store = Self {
            data_dir,
            conn,
            autosave_depth,
        };
        warnings.extend(store.load_live_tables()?);
        Ok((store, warnings))
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn autosave_depth(&self) -> usize {
        self.autosave_depth
    }

    pub(crate) fn live_tables_dir(&self) -> PathBuf {
        self.data_dir.join(TABLES_DIR)
    }

    pub(crate) fn live_table_path(&self, name: &TableName) -> PathBuf {
        self.live_tables_dir().join(name.file_name())
    }

    fn load_live_tables(&mut self) -> Result<Vec<Warning>, StoreError> {
        let mut warnings = Vec::new();
        for (name, path) in csvio::csv_files_in(&self.live_tables_dir())? {
            let table = match TableName::try_new(name.clone()) {
                Ok(table) => table,
                Err(err) => {
                    warnings.push(Warning::new(
                        "BAD_TABLE_FILE",
                        format!("skipping {name}.csv: {err}"),
                    ));
                    continue;
                }
            };
            let dataset = match csvio::read_dataset(&path) {
                Ok(dataset) => dataset,
                Err(err) => {
                    warnings.push(Warning::new(
                        "BAD_TABLE_FILE",
                        format!("could not load {name}.csv: {err}"),
                    ));
                    continue;
                }
            };
            if let Err(err) = self.create_engine_table(&table, &dataset) {
                warnings.push(Warning::new(
                    "BAD_TABLE_FILE",
                    format!("could not register {name}: {err}"),
                ));
            }
        }
        Ok(warnings)
    }
}

pub(crate) fn now_rfc3339() -> String {
    time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_default()
}
