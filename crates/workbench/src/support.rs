#![forbid(unsafe_code)]

//! Response envelopes and argument extraction. Every command answers with the
//! same shape; failures become structured errors, never process exits.

use cq_core::ids::{TableName, WorkspaceName};
use cq_store::{StoreError, Warning};
use serde_json::{Map, Value, json};

pub(crate) fn ok(cmd: &str, result: Value) -> Value {
    ok_with_warnings(cmd, result, Vec::new())
}

pub(crate) fn ok_with_warnings(cmd: &str, result: Value, warnings: Vec<Value>) -> Value {
    json!({
        "success": true,
        "cmd": cmd,
        "result": result,
        "warnings": warnings,
        "error": null
    })
}

pub(crate) fn err(cmd: &str, code: &str, message: &str) -> Value {
    json!({
        "success": false,
        "cmd": cmd,
        "result": null,
        "warnings": [],
        "error": { "code": code, "message": message }
    })
}

pub(crate) fn warning_value(warning: &Warning) -> Value {
    json!({ "code": warning.code, "message": warning.message })
}

pub(crate) fn warning_values(warnings: &[Warning]) -> Vec<Value> {
    warnings.iter().map(warning_value).collect()
}

/// Maps a store failure onto a stable error code so callers can react to
/// "unknown table" without parsing prose. The message keeps the underlying
/// engine/OS text untranslated.
pub(crate) fn store_err(cmd: &str, error: StoreError) -> Value {
    let code = match &error {
        StoreError::Io(_) => "IO_ERROR",
        StoreError::Sql(_) => "SQL_ERROR",
        StoreError::Csv(_) => "CSV_ERROR",
        StoreError::Json(_) => "META_ERROR",
        StoreError::InvalidInput(_) | StoreError::BadName(_) | StoreError::BadDataset(_) => {
            "INVALID_INPUT"
        }
        StoreError::UnknownTable(_) => "UNKNOWN_TABLE",
        StoreError::TableExists(_) => "TABLE_EXISTS",
        StoreError::UnknownWorkspace(_) => "UNKNOWN_WORKSPACE",
        StoreError::UnknownSlot(_) => "UNKNOWN_SLOT",
    };
    err(cmd, code, &error.to_string())
}

pub(crate) fn require_string(
    cmd: &str,
    args: &Map<String, Value>,
    key: &str,
) -> Result<String, Value> {
    let Some(v) = args.get(key).and_then(|v| v.as_str()) else {
        return Err(err(cmd, "INVALID_INPUT", &format!("{key} is required")));
    };
    Ok(v.to_string())
}

pub(crate) fn optional_string(
    cmd: &str,
    args: &Map<String, Value>,
    key: &str,
) -> Result<Option<String>, Value> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(v)) => Ok(Some(v.to_string())),
        Some(_) => Err(err(
            cmd,
            "INVALID_INPUT",
            &format!("{key} must be a string"),
        )),
    }
}

pub(crate) fn optional_usize(
    cmd: &str,
    args: &Map<String, Value>,
    key: &str,
) -> Result<Option<usize>, Value> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => match value.as_u64() {
            Some(v) => Ok(Some(v as usize)),
            None => Err(err(
                cmd,
                "INVALID_INPUT",
                &format!("{key} must be a non-negative integer"),
            )),
        },
    }
}

pub(crate) fn require_table_name(
    cmd: &str,
    args: &Map<String, Value>,
    key: &str,
) -> Result<TableName, Value> {
    let raw = require_string(cmd, args, key)?;
    TableName::try_new(raw).map_err(|e| err(cmd, "INVALID_INPUT", &format!("{key}: {e}")))
}

pub(crate) fn require_workspace_name(
    cmd: &str,
    args: &Map<String, Value>,
    key: &str,
) -> Result<WorkspaceName, Value> {
    let raw = require_string(cmd, args, key)?;
    WorkspaceName::try_new(raw).map_err(|e| err(cmd, "INVALID_INPUT", &format!("{key}: {e}")))
}
