#![forbid(unsafe_code)]

//! Table lifecycle: every catalog table is mirrored by `tables/<name>.csv` in
//! the data dir. Mutations touch the file first and the engine second; rename,
//! delete and snapshot writes are journaled so the two halves can be settled
//! after a crash.

use crate::{Store, StoreError, csvio, journal, now_rfc3339, query};
use cq_core::ids::TableName;
use cq_core::model::Dataset;
use rusqlite::OptionalExtension;

/// Column identifiers come straight from CSV headers and may contain anything;
/// they are always interpolated double-quoted with embedded quotes doubled.
pub(crate) fn quote_ident(raw: &str) -> String {
    format!("\"{}\"", raw.replace('"', "\"\""))
}

impl Store {
    /// Writes the dataset to the live mirror, then (re)creates the same-named
    /// engine table from it. An existing table of the same name is overwritten
    /// unconditionally.
    pub fn register(&mut self, name: &TableName, dataset: &Dataset) -> Result<(), StoreError> {
        csvio::write_dataset(&self.live_table_path(name), dataset)?;
        self.create_engine_table(name, dataset)
    }

    /// Same contract as [`Store::register`]; kept as its own entry point
    /// because the surface exposes "replace the data under this name" as a
    /// distinct user action.
    pub fn replace(&mut self, name: &TableName, dataset: &Dataset) -> Result<(), StoreError> {
        self.register(name, dataset)
    }

    pub fn rename(&mut self, old: &TableName, new: &TableName) -> Result<(), StoreError> {
        if !self.table_exists(old)? {
            return Err(StoreError::UnknownTable(old.as_str().to_string()));
        }
        if self.table_exists(new)? || self.live_table_path(new).exists() {
            return Err(StoreError::TableExists(new.as_str().to_string()));
        }

        journal::begin(
            &self.data_dir,
            &journal::JournalEntry::Rename {
                table: old.as_str().to_string(),
                to: new.as_str().to_string(),
                started_at: now_rfc3339(),
            },
        )?;
        let old_path = self.live_table_path(old);
        if old_path.exists() {
            std::fs::rename(old_path, self.live_table_path(new))?;
        }
        self.conn.execute(
            &format!("ALTER TABLE {} RENAME TO {}", old.quoted(), new.quoted()),
            [],
        )?;
        journal::clear(&self.data_dir)?;
        Ok(())
    }

    pub fn delete(&mut self, name: &TableName) -> Result<(), StoreError> {
        let file = self.live_table_path(name);
        if !self.table_exists(name)? && !file.exists() {
            return Err(StoreError::UnknownTable(name.as_str().to_string()));
        }

        journal::begin(
            &self.data_dir,
            &journal::JournalEntry::Delete {
                table: name.as_str().to_string(),
                started_at: now_rfc3339(),
            },
        )?;
        self.conn
            .execute(&format!("DROP TABLE IF EXISTS {}", name.quoted()), [])?;
        if file.exists() {
            std::fs::remove_file(file)?;
        }
        journal::clear(&self.data_dir)?;
        Ok(())
    }

    /// Catalog entries, sorted by name.
    pub fn list_tables(&self) -> Result<Vec<String>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn table_exists(&self, name: &TableName) -> Result<bool, StoreError> {
        let found = self
            .conn
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
                [name.as_str()],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Ordered column names, the raw material for the NL bridge's column list.
    pub fn table_columns(&self, name: &TableName) -> Result<Vec<String>, StoreError> {
        if !self.table_exists(name)? {
            return Err(StoreError::UnknownTable(name.as_str().to_string()));
        }
        let mut stmt = self
            .conn
            .prepare(&format!("PRAGMA table_info({})", name.quoted()))?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(1))?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Full contents of a table as an in-memory dataset, column order
    /// preserved. Building block for workspace saves and autosave captures.
    pub fn dump(&self, name: &TableName) -> Result<Dataset, StoreError> {
        if !self.table_exists(name)? {
            return Err(StoreError::UnknownTable(name.as_str().to_string()));
        }
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT * FROM {}", name.quoted()))?;
        let columns: Vec<String> = stmt
            .column_names()
            .into_iter()
            .map(|column| column.to_string())
            .collect();
        let count = columns.len();
        let rows = stmt.query_map([], |row| {
            let mut cells = Vec::with_capacity(count);
            for index in 0..count {
                cells.push(query::cell_to_string(row.get_ref(index)?));
            }
            Ok(cells)
        })?;
        let rows = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(Dataset::new(columns, rows)?)
    }

    /// Drops every table and clears the live mirror. Backs the surface's
    /// "reset" action; named workspaces and autosaves are untouched.
    pub fn reset(&mut self) -> Result<(), StoreError> {
        for name in self.list_tables()? {
            self.drop_table_raw(&name)?;
        }
        Ok(())
    }

    /// Drops a table by its raw catalog name. Names arriving from the catalog
    /// can be anything the engine accepts (raw SQL creates them too), so they
    /// are quoted like column identifiers rather than validated. Only
    /// validated names ever get a mirror file; anything else has nothing on
    /// disk to remove.
    pub(crate) fn drop_table_raw(&mut self, raw: &str) -> Result<(), StoreError> {
        self.conn
            .execute(&format!("DROP TABLE IF EXISTS {}", quote_ident(raw)), [])?;
        if let Ok(table) = TableName::try_new(raw) {
            let file = self.live_table_path(&table);
            if file.exists() {
                std::fs::remove_file(file)?;
            }
        }
        Ok(())
    }

    pub(crate) fn create_engine_table(
        &mut self,
        name: &TableName,
        dataset: &Dataset,
    ) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        tx.execute(&format!("DROP TABLE IF EXISTS {}", name.quoted()), [])?;

        let column_defs = dataset
            .columns()
            .iter()
            .map(|column| format!("{} TEXT", quote_ident(column)))
            .collect::<Vec<_>>()
            .join(", ");
        tx.execute(&format!("CREATE TABLE {} ({column_defs})", name.quoted()), [])?;

        let placeholders = (1..=dataset.columns().len())
            .map(|index| format!("?{index}"))
            .collect::<Vec<_>>()
            .join(", ");
        let mut insert = tx.prepare(&format!(
            "INSERT INTO {} VALUES ({placeholders})",
            name.quoted()
        ))?;
        for row in dataset.rows() {
            insert.execute(rusqlite::params_from_iter(row.iter()))?;
        }
        drop(insert);

        tx.commit()?;
        Ok(())
    }
}
