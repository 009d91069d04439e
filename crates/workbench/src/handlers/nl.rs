#![forbid(unsafe_code)]

use crate::nl::QualifiedColumn;
use crate::session::Session;
use crate::support::{err, ok, require_string, store_err};
use cq_core::ids::TableName;
use serde_json::{Map, Value, json};

impl Session {
    /// Sends the question plus the full table.column list to the configured
    /// model and stores the returned draft for the editor. One shot, no
    /// retries; a model that ignores the requested shape still produces a
    /// usable draft through the tolerant parser.
    pub(crate) fn cmd_nl_draft(&mut self, cmd: &str, args: &Map<String, Value>) -> Value {
        let question = match require_string(cmd, args, "question") {
            Ok(v) => v,
            Err(resp) => return resp,
        };
        let Some(drafter) = self.drafter.as_ref() else {
            return err(
                cmd,
                "NL_UNCONFIGURED",
                "no language model is configured for this session",
            );
        };

        let mut columns = Vec::new();
        let names = match self.store.list_tables() {
            Ok(names) => names,
            Err(e) => return store_err(cmd, e),
        };
        for raw in names {
            let Ok(table) = TableName::try_new(raw.clone()) else {
                continue;
            };
            match self.store.table_columns(&table) {
                Ok(table_columns) => {
                    columns.extend(table_columns.into_iter().map(|column| QualifiedColumn {
                        table: raw.clone(),
                        column,
                    }));
                }
                Err(e) => return store_err(cmd, e),
            }
        }
        if columns.is_empty() {
            return err(cmd, "NO_TABLES", "register a table before drafting SQL");
        }

        let draft = match drafter.draft(&question, &columns) {
            Ok(draft) => draft,
            Err(e) => return err(cmd, "NL_ERROR", &e.to_string()),
        };

        self.draft_sql = Some(draft.sql.clone());
        self.last_description = draft.description.clone();
        ok(
            cmd,
            json!({ "sql": draft.sql, "description": draft.description }),
        )
    }
}
