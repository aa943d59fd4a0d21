//! Error module
//!
//! Defines custom error types using `thiserror` for the patient record store.
//! This module provides a unified error type that wraps all possible error sources
//! and implements the `From` trait for automatic conversion from underlying error types.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for the patient record store.
///
/// # Error Categories
///
/// - **File errors**: the data file cannot be opened, is empty, or cannot be rewritten
/// - **Store errors**: id lookups that miss, stale handles, duplicate ids and
///   allocation failures
/// - **Input errors**: field values or CLI arguments that cannot be used
///
/// Malformed trailing CSV rows are not an error: they end the read loop and are
/// reported through [`LoadStats`](crate::csv_handler::LoadStats).
///
/// # Example
///
/// ```rust,ignore
/// use patient_records::error::PatientStoreError;
///
/// fn example() -> Result<(), PatientStoreError> {
///     let (store, _stats) = patient_records::commands::load("dados.csv".as_ref())?;
///     Ok(())
/// }
/// ```
#[derive(Error, Debug)]
pub enum PatientStoreError {
    /// The data file could not be opened for reading.
    #[error("Cannot open {}: {source}", .path.display())]
    FileNotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The data file has no header line.
    #[error("Empty file {}: missing header line", .0.display())]
    EmptyFile(PathBuf),

    /// The data file could not be rewritten.
    ///
    /// The previous contents are left in place when this is returned.
    #[error("Cannot write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No live record has the requested id.
    #[error("Patient {0} not found")]
    NotFound(i64),

    /// A handle refers to a record that has since been removed.
    #[error("Record handle is no longer valid")]
    StaleHandle,

    /// A record with the same id is already in the store.
    #[error("Duplicate patient id {0}")]
    DuplicateId(i64),

    /// Capacity could not be reserved or the id space is exhausted.
    #[error("Allocation error: {0}")]
    Allocation(String),

    /// A field value could not be parsed.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Invalid command-line argument combination.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// CSV encoding or decoding error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// General I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON output error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PatientStoreError {
    /// Returns true for errors raised while reading or writing the data file.
    pub fn is_file_error(&self) -> bool {
        matches!(
            self,
            PatientStoreError::FileNotFound { .. }
                | PatientStoreError::EmptyFile(_)
                | PatientStoreError::Write { .. }
                | PatientStoreError::Csv(_)
                | PatientStoreError::Io(_)
        )
    }
}
