#![forbid(unsafe_code)]

//! Autosave ring: `autosaves/workspace_1` is the newest snapshot and
//! `workspace_N` the oldest. A capture rotates every slot up one and dumps the
//! current catalog into slot 1. Slots are bare table CSVs with no metadata —
//! restoring one recovers tables, never last-query state.

use crate::{AUTOSAVES_DIR, Store, StoreError, Warning, csvio};
use cq_core::ids::TableName;
use std::path::PathBuf;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AutosaveSlot {
    pub slot: usize,
    pub tables: Vec<String>,
}

impl Store {
    fn slot_dir(&self, slot: usize) -> PathBuf {
        self.data_dir()
            .join(AUTOSAVES_DIR)
            .join(format!("workspace_{slot}"))
    }

    /// Shifts slots `1..N-1` to `2..N`; whatever occupied slot `N` is evicted.
    fn rotate(&self) -> Result<(), StoreError> {
        for slot in (1..self.autosave_depth()).rev() {
            let src = self.slot_dir(slot);
            if !src.exists() {
                continue;
            }
            let dst = self.slot_dir(slot + 1);
            if dst.exists() {
                std::fs::remove_dir_all(&dst)?;
            }
            std::fs::rename(src, dst)?;
        }
        Ok(())
    }

    /// Rotates, then dumps every catalog table into slot 1. Invoked after
    /// every successful query run; an empty catalog is skipped entirely so a
    /// run against nothing does not churn the ring.
    pub fn autosave_capture(&mut self) -> Result<Vec<Warning>, StoreError> {
        let tables = self.list_tables()?;
        if tables.is_empty() {
            return Ok(Vec::new());
        }

        self.rotate()?;
        let slot = self.slot_dir(1);
        // Rotation leaves slot 1 vacant except at depth 1, where the old
        // snapshot is still sitting there and must not leak into the new one.
        if slot.exists() {
            std::fs::remove_dir_all(&slot)?;
        }
        std::fs::create_dir_all(&slot)?;

        let mut warnings = Vec::new();
        for raw in tables {
            let result = TableName::try_new(raw.clone())
                .map_err(StoreError::from)
                .and_then(|table| {
                    let dataset = self.dump(&table)?;
                    csvio::write_dataset(&slot.join(table.file_name()), &dataset)
                });
            if let Err(err) = result {
                warnings.push(Warning::new(
                    "SKIPPED_TABLE",
                    format!("could not autosave table {raw}: {err}"),
                ));
            }
        }
        Ok(warnings)
    }

    /// Populated slots in ring order, newest first.
    pub fn autosave_slots(&self) -> Result<Vec<AutosaveSlot>, StoreError> {
        let mut out = Vec::new();
        for slot in 1..=self.autosave_depth() {
            let dir = self.slot_dir(slot);
            if !dir.exists() {
                continue;
            }
            let tables = csvio::csv_files_in(&dir)?
                .into_iter()
                .map(|(stem, _)| stem)
                .collect();
            out.push(AutosaveSlot { slot, tables });
        }
        Ok(out)
    }

    /// Registers every table CSV in the slot into the live catalog. Tables
    /// not present in the slot are left alone; an autosave carries no
    /// metadata, so there is no table list to diff against.
    pub fn autosave_restore(
        &mut self,
        slot: usize,
    ) -> Result<(Vec<String>, Vec<Warning>), StoreError> {
        if slot == 0 || slot > self.autosave_depth() {
            return Err(StoreError::UnknownSlot(slot));
        }
        let dir = self.slot_dir(slot);
        if !dir.exists() {
            return Err(StoreError::UnknownSlot(slot));
        }

        let mut restored = Vec::new();
        let mut warnings = Vec::new();
        for (stem, path) in csvio::csv_files_in(&dir)? {
            let result = TableName::try_new(stem.clone())
                .map_err(StoreError::from)
                .and_then(|table| {
                    let dataset = csvio::read_dataset(&path)?;
                    self.register(&table, &dataset)
                });
            match result {
                Ok(()) => restored.push(stem),
                Err(err) => warnings.push(Warning::new(
                    "SKIPPED_TABLE",
                    format!("could not restore table {stem}: {err}"),
                )),
            }
        }
        Ok((restored, warnings))
    }
}
