#![forbid(unsafe_code)]

//! Pass-through query façade. User SQL is executed verbatim; the only
//! identifiers this crate ever builds itself come from validated names.

use crate::{Store, StoreError};
use rusqlite::types::ValueRef;

/// An ephemeral tabular result. Every cell is rendered to text the way the
/// CSV mirror renders it (NULL becomes the empty string), so a result can be
/// offered for download or promoted into a snapshot unchanged.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// Rows changed by a statement that returns no result set. Zero for
    /// SELECTs.
    pub rows_affected: usize,
}

impl QueryResult {
    pub fn is_rows(&self) -> bool {
        !self.columns.is_empty()
    }

    /// Serializes the result the way the original tool's "download as CSV"
    /// action did: header row, then data rows.
    pub fn to_csv(&self) -> Result<String, StoreError> {
        if self.columns.is_empty() {
            return Ok(String::new());
        }
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(&self.columns)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|err| StoreError::Io(err.into_error()))?;
        String::from_utf8(bytes)
            .map_err(|_| StoreError::InvalidInput("query result is not valid UTF-8"))
    }
}

pub(crate) fn cell_to_string(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => String::new(),
        ValueRef::Integer(v) => v.to_string(),
        ValueRef::Real(v) => v.to_string(),
        ValueRef::Text(v) => String::from_utf8_lossy(v).into_owned(),
        ValueRef::Blob(v) => String::from_utf8_lossy(v).into_owned(),
    }
}

impl Store {
    /// Executes `sql` verbatim. Statements producing rows come back as a
    /// tabular result; DDL/DML comes back with `rows_affected` set and no
    /// columns. Failures surface as [`StoreError::Sql`] with the engine's own
    /// message, untranslated.
    pub fn query(&mut self, sql: &str) -> Result<QueryResult, StoreError> {
        let mut stmt = self.conn.prepare(sql)?;
        if stmt.column_count() == 0 {
            let rows_affected = stmt.execute([])?;
            return Ok(QueryResult {
                columns: Vec::new(),
                rows: Vec::new(),
                rows_affected,
            });
        }

        let columns: Vec<String> = stmt
            .column_names()
            .into_iter()
            .map(|column| column.to_string())
            .collect();
        let count = columns.len();
        let rows = stmt.query_map([], |row| {
            let mut cells = Vec::with_capacity(count);
            for index in 0..count {
                cells.push(cell_to_string(row.get_ref(index)?));
            }
            Ok(cells)
        })?;
        let rows = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(QueryResult {
            columns,
            rows,
            rows_affected: 0,
        })
    }
}
