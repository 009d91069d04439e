#![forbid(unsafe_code)]

use crate::session::Session;
use crate::support::{ok, store_err};
use serde_json::{Map, Value, json};

impl Session {
    pub(crate) fn cmd_session_info(&mut self, cmd: &str, _args: &Map<String, Value>) -> Value {
        let tables = match self.store.list_tables() {
            Ok(tables) => tables,
            Err(e) => return store_err(cmd, e),
        };
        ok(
            cmd,
            json!({
                "active_workspace": self.active_workspace.as_ref().map(|w| w.as_str()),
                "table_count": tables.len(),
                "autosave_depth": self.store.autosave_depth(),
                "nl_configured": self.drafter.is_some(),
                "has_result": self.last_result.is_some(),
                "last_query": self.last_query,
                "draft_sql": self.draft_sql,
            }),
        )
    }
}
