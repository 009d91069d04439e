#![forbid(unsafe_code)]

//! CSV reading/writing for table mirrors. All cells travel as strings; typing
//! is the engine's business.

use crate::StoreError;
use cq_core::model::Dataset;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Parses a CSV file (header row required) into a dataset.
pub fn dataset_from_csv_path(path: &Path) -> Result<Dataset, StoreError> {
    let file = std::fs::File::open(path)?;
    read_dataset_from(file)
}

/// Parses inline CSV text (header row required) into a dataset.
pub fn dataset_from_csv_text(text: &str) -> Result<Dataset, StoreError> {
    read_dataset_from(text.as_bytes())
}

pub(crate) fn read_dataset(path: &Path) -> Result<Dataset, StoreError> {
    dataset_from_csv_path(path)
}

fn read_dataset_from(input: impl Read) -> Result<Dataset, StoreError> {
    let mut reader = csv::ReaderBuilder::new().has_headers(true).from_reader(input);
    let columns: Vec<String> = reader
        .headers()?
        .iter()
        .map(|field| field.to_string())
        .collect();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(|field| field.to_string()).collect());
    }
    Ok(Dataset::new(columns, rows)?)
}

pub(crate) fn dataset_to_csv_bytes(dataset: &Dataset) -> Result<Vec<u8>, StoreError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(dataset.columns())?;
    for row in dataset.rows() {
        writer.write_record(row)?;
    }
    writer
        .into_inner()
        .map_err(|err| StoreError::Io(err.into_error()))
}

pub(crate) fn write_dataset(path: &Path, dataset: &Dataset) -> Result<(), StoreError> {
    let bytes = dataset_to_csv_bytes(dataset)?;
    std::fs::write(path, bytes)?;
    Ok(())
}

/// Writes `dataset` to `path` only when the serialized bytes differ from what
/// is already there. Returns whether a write happened. Repeat snapshots of an
/// unchanged catalog stay byte-identical this way.
pub(crate) fn write_dataset_if_changed(
    path: &Path,
    dataset: &Dataset,
) -> Result<bool, StoreError> {
    let bytes = dataset_to_csv_bytes(dataset)?;
    if let Ok(existing) = std::fs::read(path)
        && existing == bytes
    {
        return Ok(false);
    }
    std::fs::write(path, bytes)?;
    Ok(true)
}

/// `(stem, path)` for every `*.csv` directly under `dir`, sorted by stem so
/// callers behave deterministically. A missing dir reads as empty.
pub(crate) fn csv_files_in(dir: &Path) -> Result<Vec<(String, PathBuf)>, StoreError> {
    let mut out = Vec::new();
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(out),
        Err(err) => return Err(err.into()),
    };
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some("csv") {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) else {
            continue;
        };
        out.push((stem.to_string(), path));
    }
    out.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(out)
}
