#![forbid(unsafe_code)]

use crate::session::Session;
use crate::support::{ok, ok_with_warnings, require_workspace_name, store_err, warning_values};
use serde_json::{Map, Value, json};

impl Session {
    pub(crate) fn cmd_workspace_save(&mut self, cmd: &str, args: &Map<String, Value>) -> Value {
        let name = match require_workspace_name(cmd, args, "name") {
            Ok(v) => v,
            Err(resp) => return resp,
        };
        let warnings =
            match self
                .store
                .workspace_save(&name, &self.last_query, &self.last_description)
            {
                Ok(warnings) => warnings,
                Err(e) => return store_err(cmd, e),
            };
        self.active_workspace = Some(name.clone());
        ok_with_warnings(
            cmd,
            json!({ "workspace": name.as_str() }),
            warning_values(&warnings),
        )
    }

    pub(crate) fn cmd_workspace_load(&mut self, cmd: &str, args: &Map<String, Value>) -> Value {
        let name = match require_workspace_name(cmd, args, "name") {
            Ok(v) => v,
            Err(resp) => return resp,
        };
        let outcome = match self.store.workspace_load(&name) {
            Ok(outcome) => outcome,
            Err(e) => return store_err(cmd, e),
        };
        self.last_query = outcome.last_query.clone();
        self.last_description = outcome.last_description.clone();
        self.draft_sql = Some(outcome.last_query.clone());
        self.last_result = None;
        self.active_workspace = Some(name.clone());
        ok_with_warnings(
            cmd,
            json!({
                "workspace": name.as_str(),
                "tables": outcome.loaded,
                "last_query": outcome.last_query,
                "last_description": outcome.last_description,
            }),
            warning_values(&outcome.warnings),
        )
    }

    pub(crate) fn cmd_workspace_delete(&mut self, cmd: &str, args: &Map<String, Value>) -> Value {
        let name = match require_workspace_name(cmd, args, "name") {
            Ok(v) => v,
            Err(resp) => return resp,
        };
        if let Err(e) = self.store.workspace_delete(&name) {
            return store_err(cmd, e);
        }
        // Deleting the active workspace leaves the session unselected, the
        // way the original dropped back to its default state.
        let was_active = self.active_workspace.as_ref() == Some(&name);
        if was_active {
            self.active_workspace = None;
        }
        ok(
            cmd,
            json!({ "deleted": name.as_str(), "was_active": was_active }),
        )
    }

    pub(crate) fn cmd_workspace_list(&mut self, cmd: &str, _args: &Map<String, Value>) -> Value {
        let summaries = match self.store.workspace_list() {
            Ok(summaries) => summaries,
            Err(e) => return store_err(cmd, e),
        };
        let workspaces: Vec<Value> = summaries
            .iter()
            .map(|summary| {
                json!({
                    "name": summary.name,
                    "table_count": summary.table_count,
                    "saved_at": summary.saved_at,
                })
            })
            .collect();
        ok(cmd, json!({ "workspaces": workspaces }))
    }

    /// Drops every table and clears editor state. Named workspaces and
    /// autosaves survive a reset.
    pub(crate) fn cmd_workspace_reset(&mut self, cmd: &str, _args: &Map<String, Value>) -> Value {
        if let Err(e) = self.store.reset() {
            return store_err(cmd, e);
        }
        self.active_workspace = None;
        self.last_query.clear();
        self.last_description.clear();
        self.last_result = None;
        self.draft_sql = None;
        ok(cmd, json!({ "reset": true }))
    }
}
