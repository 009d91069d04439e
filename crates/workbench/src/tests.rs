#![forbid(unsafe_code)]

use crate::nl::{NlError, QualifiedColumn, SqlDraft, SqlDrafter};
use crate::session::{Session, SessionConfig};
use serde_json::{Value, json};
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(test_name: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("cq_workbench_{test_name}_{nanos}"));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn session(dir: &PathBuf) -> Session {
    let (session, warnings) = Session::new(SessionConfig {
        data_dir: dir.clone(),
        autosave_depth: 4,
        nl: None,
    })
    .expect("open session");
    assert!(warnings.is_empty());
    session
}

fn req(cmd: &str, args: Value) -> Value {
    json!({ "cmd": cmd, "args": args })
}

fn assert_success(resp: &Value) {
    assert_eq!(
        resp["success"],
        Value::Bool(true),
        "expected success, got: {resp}"
    );
}

fn error_code(resp: &Value) -> String {
    resp["error"]["code"].as_str().unwrap_or_default().to_string()
}

const SALES_CSV: &str = "region,amount\nwest,10\neast,20\nwest,5\n";

#[test]
fn register_run_download_flow() {
    let dir = temp_dir("register_run");
    let mut session = session(&dir);

    let resp = session.dispatch(&req(
        "table.register",
        json!({ "name": "sales", "csv": SALES_CSV }),
    ));
    assert_success(&resp);
    assert_eq!(resp["result"]["row_count"], 3);
    assert_eq!(resp["result"]["columns"], json!(["region", "amount"]));
    assert_eq!(resp["result"]["preview"].as_array().unwrap().len(), 3);

    let resp = session.dispatch(&req(
        "query.run",
        json!({ "sql": "SELECT region, SUM(CAST(amount AS INTEGER)) AS total FROM sales GROUP BY region ORDER BY region" }),
    ));
    assert_success(&resp);
    assert_eq!(resp["result"]["columns"], json!(["region", "total"]));
    assert_eq!(
        resp["result"]["rows"],
        json!([["east", "20"], ["west", "15"]])
    );

    // The run captured an autosave.
    assert!(dir.join("autosaves/workspace_1/sales.csv").exists());

    let resp = session.dispatch(&req("query.download", json!({})));
    assert_success(&resp);
    assert_eq!(resp["result"]["file_name"], "query_result.csv");
    assert_eq!(
        resp["result"]["csv"],
        "region,total\neast,20\nwest,15\n"
    );

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn download_without_a_run_is_an_error() {
    let dir = temp_dir("no_result");
    let mut session = session(&dir);

    let resp = session.dispatch(&req("query.download", json!({})));
    assert_eq!(error_code(&resp), "NO_RESULT");

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn malformed_and_unknown_requests_answer_envelopes() {
    let dir = temp_dir("bad_requests");
    let mut session = session(&dir);

    let resp = session.dispatch(&json!("not an object"));
    assert_eq!(error_code(&resp), "INVALID_INPUT");

    let resp = session.dispatch(&json!({ "args": {} }));
    assert_eq!(error_code(&resp), "INVALID_INPUT");

    let resp = session.dispatch(&req("bogus.cmd", json!({})));
    assert_eq!(error_code(&resp), "INVALID_INPUT");

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn hostile_table_names_never_reach_the_engine() {
    let dir = temp_dir("hostile_names");
    let mut session = session(&dir);

    for bad in ["drop", "1abc", "a;b", "a b", "x\"; DROP TABLE y"] {
        let resp = session.dispatch(&req(
            "table.register",
            json!({ "name": bad, "csv": "a\n1\n" }),
        ));
        assert_eq!(error_code(&resp), "INVALID_INPUT", "name {bad:?} got: {resp}");
    }

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn rename_and_delete_through_the_surface() {
    let dir = temp_dir("rename_delete");
    let mut session = session(&dir);

    assert_success(&session.dispatch(&req(
        "table.register",
        json!({ "name": "a", "csv": "v\n1\n" }),
    )));
    assert_success(&session.dispatch(&req("table.rename", json!({ "from": "a", "to": "b" }))));

    let resp = session.dispatch(&req("query.run", json!({ "sql": "SELECT * FROM a" })));
    assert_eq!(error_code(&resp), "SQL_ERROR");

    let resp = session.dispatch(&req("table.preview", json!({ "name": "b" })));
    assert_success(&resp);
    assert_eq!(resp["result"]["rows"], json!([["1"]]));

    assert_success(&session.dispatch(&req("table.delete", json!({ "name": "b" }))));
    let resp = session.dispatch(&req("table.delete", json!({ "name": "b" })));
    assert_eq!(error_code(&resp), "UNKNOWN_TABLE");

    let resp = session.dispatch(&req("table.list", json!({})));
    assert_success(&resp);
    assert_eq!(resp["result"]["tables"], json!([]));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn workspace_save_load_delete_flow() {
    let dir = temp_dir("workspace_flow");
    let mut session = session(&dir);

    assert_success(&session.dispatch(&req(
        "table.register",
        json!({ "name": "sales", "csv": SALES_CSV }),
    )));
    assert_success(
        &session.dispatch(&req("query.run", json!({ "sql": "SELECT * FROM sales" }))),
    );

    assert_success(&session.dispatch(&req("workspace.save", json!({ "name": "report" }))));
    let info = session.dispatch(&req("session.info", json!({})));
    assert_eq!(info["result"]["active_workspace"], "report");

    // Mutate, then load the snapshot back.
    assert_success(&session.dispatch(&req(
        "table.register",
        json!({ "name": "extra", "csv": "v\n9\n" }),
    )));
    let resp = session.dispatch(&req("workspace.load", json!({ "name": "report" })));
    assert_success(&resp);
    assert_eq!(resp["result"]["tables"], json!(["sales"]));
    assert_eq!(resp["result"]["last_query"], "SELECT * FROM sales");

    let resp = session.dispatch(&req("table.list", json!({})));
    assert_eq!(resp["result"]["tables"].as_array().unwrap().len(), 1);

    // Deleting the active workspace clears the pointer.
    let resp = session.dispatch(&req("workspace.delete", json!({ "name": "report" })));
    assert_success(&resp);
    assert_eq!(resp["result"]["was_active"], Value::Bool(true));
    let info = session.dispatch(&req("session.info", json!({})));
    assert_eq!(info["result"]["active_workspace"], Value::Null);

    let resp = session.dispatch(&req("workspace.load", json!({ "name": "report" })));
    assert_eq!(error_code(&resp), "UNKNOWN_WORKSPACE");

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn reset_clears_tables_and_editor_state() {
    let dir = temp_dir("reset");
    let mut session = session(&dir);

    assert_success(&session.dispatch(&req(
        "table.register",
        json!({ "name": "t", "csv": "v\n1\n" }),
    )));
    assert_success(&session.dispatch(&req("query.run", json!({ "sql": "SELECT * FROM t" }))));

    assert_success(&session.dispatch(&req("workspace.reset", json!({}))));
    let info = session.dispatch(&req("session.info", json!({})));
    assert_eq!(info["result"]["table_count"], 0);
    assert_eq!(info["result"]["has_result"], Value::Bool(false));
    assert_eq!(info["result"]["last_query"], "");

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn autosave_list_and_restore_through_the_surface() {
    let dir = temp_dir("autosave_surface");
    let mut session = session(&dir);

    assert_success(&session.dispatch(&req(
        "table.register",
        json!({ "name": "t", "csv": "v\nold\n" }),
    )));
    assert_success(&session.dispatch(&req("query.run", json!({ "sql": "SELECT * FROM t" }))));

    assert_success(&session.dispatch(&req(
        "table.replace",
        json!({ "name": "t", "csv": "v\nnew\n" }),
    )));

    let resp = session.dispatch(&req("autosave.list", json!({})));
    assert_success(&resp);
    assert_eq!(resp["result"]["slots"][0]["slot"], 1);

    let resp = session.dispatch(&req("autosave.restore", json!({ "slot": 1 })));
    assert_success(&resp);
    let resp = session.dispatch(&req("table.preview", json!({ "name": "t" })));
    assert_eq!(resp["result"]["rows"], json!([["old"]]));

    let resp = session.dispatch(&req("autosave.restore", json!({ "slot": 4 })));
    assert_eq!(error_code(&resp), "UNKNOWN_SLOT");

    let _ = std::fs::remove_dir_all(&dir);
}

struct StubDrafter {
    answer: SqlDraft,
    fail: bool,
}

impl SqlDrafter for StubDrafter {
    fn draft(&self, question: &str, columns: &[QualifiedColumn]) -> Result<SqlDraft, NlError> {
        if self.fail {
            return Err(NlError::BadStatus(500));
        }
        assert!(!question.is_empty());
        assert!(
            columns
                .iter()
                .any(|qc| qc.table == "sales" && qc.column == "amount")
        );
        Ok(self.answer.clone())
    }
}

#[test]
fn nl_draft_uses_the_drafter_and_stores_the_draft() {
    let dir = temp_dir("nl_draft");
    let mut session = session(&dir);

    let resp = session.dispatch(&req("nl.draft", json!({ "question": "total per region" })));
    assert_eq!(error_code(&resp), "NL_UNCONFIGURED");

    session.set_drafter(Box::new(StubDrafter {
        answer: SqlDraft {
            sql: "SELECT region, SUM(amount) FROM sales GROUP BY region".to_string(),
            description: "totals per region".to_string(),
        },
        fail: false,
    }));

    let resp = session.dispatch(&req("nl.draft", json!({ "question": "total per region" })));
    assert_eq!(error_code(&resp), "NO_TABLES");

    assert_success(&session.dispatch(&req(
        "table.register",
        json!({ "name": "sales", "csv": SALES_CSV }),
    )));
    let resp = session.dispatch(&req("nl.draft", json!({ "question": "total per region" })));
    assert_success(&resp);
    assert_eq!(resp["result"]["description"], "totals per region");

    let info = session.dispatch(&req("session.info", json!({})));
    assert_eq!(
        info["result"]["draft_sql"],
        "SELECT region, SUM(amount) FROM sales GROUP BY region"
    );

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn nl_errors_surface_as_envelopes() {
    let dir = temp_dir("nl_error");
    let mut session = session(&dir);
    session.set_drafter(Box::new(StubDrafter {
        answer: SqlDraft {
            sql: String::new(),
            description: String::new(),
        },
        fail: true,
    }));

    assert_success(&session.dispatch(&req(
        "table.register",
        json!({ "name": "sales", "csv": SALES_CSV }),
    )));
    let resp = session.dispatch(&req("nl.draft", json!({ "question": "anything" })));
    assert_eq!(error_code(&resp), "NL_ERROR");

    let _ = std::fs::remove_dir_all(&dir);
}
