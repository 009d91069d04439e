#![forbid(unsafe_code)]

use crate::session::Session;
use crate::support::{err, ok, ok_with_warnings, optional_usize, store_err, warning_values};
use serde_json::{Map, Value, json};

impl Session {
    pub(crate) fn cmd_autosave_list(&mut self, cmd: &str, _args: &Map<String, Value>) -> Value {
        let slots = match self.store.autosave_slots() {
            Ok(slots) => slots,
            Err(e) => return store_err(cmd, e),
        };
        let slots: Vec<Value> = slots
            .iter()
            .map(|slot| json!({ "slot": slot.slot, "tables": slot.tables }))
            .collect();
        ok(cmd, json!({ "slots": slots }))
    }

    /// Re-registers every table CSV in the slot. Autosaves carry no metadata,
    /// so unlike a workspace load this never restores last-query state.
    pub(crate) fn cmd_autosave_restore(&mut self, cmd: &str, args: &Map<String, Value>) -> Value {
        let slot = match optional_usize(cmd, args, "slot") {
            Ok(Some(slot)) => slot,
            Ok(None) => return err(cmd, "INVALID_INPUT", "slot is required"),
            Err(resp) => return resp,
        };
        match self.store.autosave_restore(slot) {
            Ok((restored, warnings)) => ok_with_warnings(
                cmd,
                json!({ "slot": slot, "tables": restored }),
                warning_values(&warnings),
            ),
            Err(e) => store_err(cmd, e),
        }
    }
}
