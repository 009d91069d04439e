#![forbid(unsafe_code)]

//! One session owns one store (one engine connection) and one
//! active-workspace pointer. All command handlers hang off [`Session`]; there
//! is no ambient state anywhere else.

use crate::nl::{NlConfig, OpenAiDrafter, SqlDrafter};
use crate::support::err;
use cq_core::ids::WorkspaceName;
use cq_store::{QueryResult, Store, StoreError, Warning};
use serde_json::Value;
use std::path::PathBuf;

pub(crate) const DEFAULT_AUTOSAVE_DEPTH: usize = 4;

#[derive(Clone, Debug)]
pub(crate) struct SessionConfig {
    pub data_dir: PathBuf,
    pub autosave_depth: usize,
    /// NL bridge settings; `None` leaves `nl.draft` answering
    /// `NL_UNCONFIGURED` instead of attempting a call without credentials.
    pub nl: Option<NlConfig>,
}

pub(crate) struct Session {
    pub(crate) store: Store,
    pub(crate) active_workspace: Option<WorkspaceName>,
    pub(crate) last_query: String,
    pub(crate) last_description: String,
    pub(crate) last_result: Option<QueryResult>,
    pub(crate) draft_sql: Option<String>,
    pub(crate) drafter: Option<Box<dyn SqlDrafter>>,
}

impl Session {
    pub(crate) fn new(config: SessionConfig) -> Result<(Self, Vec<Warning>), StoreError> {
        let (store, warnings) = Store::open(&config.data_dir, config.autosave_depth)?;
        let drafter = config
            .nl
            .map(|nl| Box::new(OpenAiDrafter::new(nl)) as Box<dyn SqlDrafter>);
        Ok((
            Self {
                store,
                active_workspace: None,
                last_query: String::new(),
                last_description: String::new(),
                last_result: None,
                draft_sql: None,
                drafter,
            },
            warnings,
        ))
    }

    #[cfg(test)]
    pub(crate) fn set_drafter(&mut self, drafter: Box<dyn SqlDrafter>) {
        self.drafter = Some(drafter);
    }

    /// Routes one request to its handler. Anything that is not a well-formed
    /// `{"cmd": ..., "args": {...}}` object answers an `INVALID_INPUT`
    /// envelope; the loop around this never dies on bad input.
    pub(crate) fn dispatch(&mut self, request: &Value) -> Value {
        let Some(obj) = request.as_object() else {
            return err("?", "INVALID_INPUT", "request must be a JSON object");
        };
        let Some(cmd) = obj.get("cmd").and_then(|v| v.as_str()) else {
            return err("?", "INVALID_INPUT", "cmd is required");
        };
        let empty = serde_json::Map::new();
        let args = match obj.get("args") {
            None | Some(Value::Null) => &empty,
            Some(Value::Object(map)) => map,
            Some(_) => return err(cmd, "INVALID_INPUT", "args must be an object"),
        };

        match cmd {
            "table.register" => self.cmd_table_register(cmd, args),
            "table.replace" => self.cmd_table_replace(cmd, args),
            "table.rename" => self.cmd_table_rename(cmd, args),
            "table.delete" => self.cmd_table_delete(cmd, args),
            "table.list" => self.cmd_table_list(cmd, args),
            "table.preview" => self.cmd_table_preview(cmd, args),
            "query.run" => self.cmd_query_run(cmd, args),
            "query.download" => self.cmd_query_download(cmd, args),
            "workspace.save" => self.cmd_workspace_save(cmd, args),
            "workspace.load" => self.cmd_workspace_load(cmd, args),
            "workspace.delete" => self.cmd_workspace_delete(cmd, args),
            "workspace.list" => self.cmd_workspace_list(cmd, args),
            "workspace.reset" => self.cmd_workspace_reset(cmd, args),
            "autosave.list" => self.cmd_autosave_list(cmd, args),
            "autosave.restore" => self.cmd_autosave_restore(cmd, args),
            "nl.draft" => self.cmd_nl_draft(cmd, args),
            "session.info" => self.cmd_session_info(cmd, args),
            _ => err(cmd, "INVALID_INPUT", &format!("unknown command: {cmd}")),
        }
    }
}
