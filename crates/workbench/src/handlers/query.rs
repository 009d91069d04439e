#![forbid(unsafe_code)]

use crate::session::Session;
use crate::support::{
    err, ok, ok_with_warnings, optional_usize, require_string, store_err, warning_values,
};
use serde_json::{Map, Value, json};

impl Session {
    /// Executes user SQL verbatim. On success the text becomes the session's
    /// last query and an autosave capture runs — the original tool snapshots
    /// after every successful run, mutating or not, and that behavior is kept.
    pub(crate) fn cmd_query_run(&mut self, cmd: &str, args: &Map<String, Value>) -> Value {
        let sql = match require_string(cmd, args, "sql") {
            Ok(v) => v,
            Err(resp) => return resp,
        };
        let max_rows = match optional_usize(cmd, args, "max_rows") {
            Ok(v) => v,
            Err(resp) => return resp,
        };

        let result = match self.store.query(&sql) {
            Ok(result) => result,
            Err(e) => return store_err(cmd, e),
        };
        self.last_query = sql;
        self.last_result = Some(result.clone());

        let warnings = match self.store.autosave_capture() {
            Ok(capture_warnings) => warning_values(&capture_warnings),
            Err(e) => vec![json!({
                "code": "AUTOSAVE_FAILED",
                "message": e.to_string(),
            })],
        };

        let total_rows = result.rows.len();
        let (rows, truncated) = match max_rows {
            Some(cap) if total_rows > cap => (result.rows[..cap].to_vec(), true),
            _ => (result.rows, false),
        };
        ok_with_warnings(
            cmd,
            json!({
                "columns": result.columns,
                "rows": rows,
                "total_rows": total_rows,
                "rows_affected": result.rows_affected,
                "truncated": truncated,
            }),
            warnings,
        )
    }

    /// The last result, serialized as CSV for download.
    pub(crate) fn cmd_query_download(&mut self, cmd: &str, _args: &Map<String, Value>) -> Value {
        let Some(result) = self.last_result.as_ref() else {
            return err(cmd, "NO_RESULT", "run a query first");
        };
        match result.to_csv() {
            Ok(csv) => ok(cmd, json!({ "file_name": "query_result.csv", "csv": csv })),
            Err(e) => store_err(cmd, e),
        }
    }
}
