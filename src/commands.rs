//! Command interface
//!
//! The operations a front end (the CLI or the interactive shell) performs
//! against a [`PatientStore`]. Every function takes the store explicitly and
//! returns owned copies of records, so callers never hold references into the
//! store across mutations.

use chrono::Local;
use std::path::Path;
use tracing::info;

use crate::csv_handler::{LoadStats, PatientRecord, WriteStats};
use crate::error::PatientStoreError;
use crate::store::{PatientStore, RecordPatch, SearchField, DEFAULT_FIRST_ID};

/// Loads the store from `path`.
pub fn load(path: &Path) -> Result<(PatientStore, LoadStats), PatientStoreError> {
    load_with_first_id(path, DEFAULT_FIRST_ID)
}

/// Loads the store from `path`, using `first_id` for inserts into an empty store.
pub fn load_with_first_id(
    path: &Path,
    first_id: i64,
) -> Result<(PatientStore, LoadStats), PatientStoreError> {
    PatientStore::load_with_first_id(path, first_id)
}

/// Returns every record in insertion order.
pub fn list(store: &PatientStore) -> Vec<PatientRecord> {
    store.iter().cloned().collect()
}

/// Returns the records whose `field` starts with `query`, in insertion order.
pub fn search(store: &PatientStore, query: &str, field: SearchField) -> Vec<PatientRecord> {
    store.search(query, field).cloned().collect()
}

/// Inserts a new patient with the next free id and returns the stored record.
pub fn insert(
    store: &mut PatientStore,
    national_id: &str,
    name: &str,
    age: u8,
    registration_date: &str,
) -> Result<PatientRecord, PatientStoreError> {
    let handle = store.insert(national_id, name, age, registration_date)?;
    let record = store
        .get(handle)
        .cloned()
        .ok_or(PatientStoreError::StaleHandle)?;
    info!(id = record.id, "Inserted patient");
    Ok(record)
}

/// Applies `patch` to the patient with `id` and returns the updated record.
pub fn update(
    store: &mut PatientStore,
    id: i64,
    patch: &RecordPatch,
) -> Result<PatientRecord, PatientStoreError> {
    let handle = store.find_by_id(id).ok_or(PatientStoreError::NotFound(id))?;
    let record = store.update(handle, patch)?.clone();
    info!(id, "Updated patient");
    Ok(record)
}

/// Removes the patient with `id` and returns the removed record.
pub fn remove(store: &mut PatientStore, id: i64) -> Result<PatientRecord, PatientStoreError> {
    let handle = store.find_by_id(id).ok_or(PatientStoreError::NotFound(id))?;
    let record = store.remove(handle)?;
    info!(id, "Removed patient");
    Ok(record)
}

/// Rewrites the data file at `path` with the current records.
pub fn save(store: &PatientStore, path: &Path) -> Result<WriteStats, PatientStoreError> {
    store.save(path)
}

/// Today's local date as `YYYY-MM-DD`, the default registration date.
pub fn today() -> String {
    Local::now().format("%Y-%m-%d").to_string()
}
