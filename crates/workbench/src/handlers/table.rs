#![forbid(unsafe_code)]

use crate::session::Session;
use crate::support::{err, ok, optional_string, optional_usize, require_table_name, store_err};
use cq_core::ids::TableName;
use cq_core::model::Dataset;
use serde_json::{Map, Value, json};
use std::path::Path;

const PREVIEW_ROWS: usize = 5;

fn preview_rows(dataset: &Dataset) -> Vec<Vec<String>> {
    dataset.rows().iter().take(PREVIEW_ROWS).cloned().collect()
}

fn dataset_from_args(cmd: &str, args: &Map<String, Value>) -> Result<Dataset, Value> {
    let csv_text = optional_string(cmd, args, "csv")?;
    let path = optional_string(cmd, args, "path")?;
    match (csv_text, path) {
        (Some(_), Some(_)) => Err(err(
            cmd,
            "INVALID_INPUT",
            "pass either csv or path, not both",
        )),
        (None, None) => Err(err(cmd, "INVALID_INPUT", "csv or path is required")),
        (Some(text), None) => {
            cq_store::dataset_from_csv_text(&text).map_err(|e| store_err(cmd, e))
        }
        (None, Some(path)) => {
            cq_store::dataset_from_csv_path(Path::new(&path)).map_err(|e| store_err(cmd, e))
        }
    }
}

impl Session {
    pub(crate) fn cmd_table_register(&mut self, cmd: &str, args: &Map<String, Value>) -> Value {
        let name = match require_table_name(cmd, args, "name") {
            Ok(v) => v,
            Err(resp) => return resp,
        };
        let dataset = match dataset_from_args(cmd, args) {
            Ok(v) => v,
            Err(resp) => return resp,
        };
        if let Err(e) = self.store.register(&name, &dataset) {
            return store_err(cmd, e);
        }
        ok(
            cmd,
            json!({
                "name": name.as_str(),
                "columns": dataset.columns(),
                "row_count": dataset.row_count(),
                "preview": preview_rows(&dataset),
            }),
        )
    }

    /// Same store semantics as register; the surface keeps them separate so
    /// "upload new data under this existing name" reads as its own action.
    pub(crate) fn cmd_table_replace(&mut self, cmd: &str, args: &Map<String, Value>) -> Value {
        let name = match require_table_name(cmd, args, "name") {
            Ok(v) => v,
            Err(resp) => return resp,
        };
        let dataset = match dataset_from_args(cmd, args) {
            Ok(v) => v,
            Err(resp) => return resp,
        };
        if let Err(e) = self.store.replace(&name, &dataset) {
            return store_err(cmd, e);
        }
        ok(
            cmd,
            json!({
                "name": name.as_str(),
                "columns": dataset.columns(),
                "row_count": dataset.row_count(),
            }),
        )
    }

    pub(crate) fn cmd_table_rename(&mut self, cmd: &str, args: &Map<String, Value>) -> Value {
        let from = match require_table_name(cmd, args, "from") {
            Ok(v) => v,
            Err(resp) => return resp,
        };
        let to = match require_table_name(cmd, args, "to") {
            Ok(v) => v,
            Err(resp) => return resp,
        };
        if let Err(e) = self.store.rename(&from, &to) {
            return store_err(cmd, e);
        }
        ok(cmd, json!({ "from": from.as_str(), "to": to.as_str() }))
    }

    pub(crate) fn cmd_table_delete(&mut self, cmd: &str, args: &Map<String, Value>) -> Value {
        let name = match require_table_name(cmd, args, "name") {
            Ok(v) => v,
            Err(resp) => return resp,
        };
        if let Err(e) = self.store.delete(&name) {
            return store_err(cmd, e);
        }
        ok(cmd, json!({ "deleted": name.as_str() }))
    }

    pub(crate) fn cmd_table_list(&mut self, cmd: &str, _args: &Map<String, Value>) -> Value {
        let names = match self.store.list_tables() {
            Ok(v) => v,
            Err(e) => return store_err(cmd, e),
        };
        let mut tables = Vec::new();
        for raw in names {
            let columns = TableName::try_new(raw.clone())
                .ok()
                .and_then(|name| self.store.table_columns(&name).ok())
                .unwrap_or_default();
            tables.push(json!({ "name": raw, "columns": columns }));
        }
        ok(cmd, json!({ "tables": tables }))
    }

    pub(crate) fn cmd_table_preview(&mut self, cmd: &str, args: &Map<String, Value>) -> Value {
        let name = match require_table_name(cmd, args, "name") {
            Ok(v) => v,
            Err(resp) => return resp,
        };
        let limit = match optional_usize(cmd, args, "limit") {
            Ok(v) => v.unwrap_or(PREVIEW_ROWS),
            Err(resp) => return resp,
        };
        if let Ok(false) = self.store.table_exists(&name) {
            return store_err(
                cmd,
                cq_store::StoreError::UnknownTable(name.as_str().to_string()),
            );
        }
        let sql = format!("SELECT * FROM {} LIMIT {limit}", name.quoted());
        match self.store.query(&sql) {
            Ok(result) => ok(
                cmd,
                json!({
                    "name": name.as_str(),
                    "columns": result.columns,
                    "rows": result.rows,
                }),
            ),
            Err(e) => store_err(cmd, e),
        }
    }
}
