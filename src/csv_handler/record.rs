//! Patient record types for CSV serialization.
//!
//! Defines [`PatientRecord`], the field length limits it enforces, and the
//! [`LoadStats`] / [`WriteStats`] reported by the reader and writer.

use serde::{Deserialize, Serialize};

/// Maximum length in bytes of [`PatientRecord::national_id`].
pub const NATIONAL_ID_MAX_LEN: usize = 14;
/// Maximum length in bytes of [`PatientRecord::name`].
pub const NAME_MAX_LEN: usize = 99;
/// Maximum length in bytes of [`PatientRecord::registration_date`].
pub const REGISTRATION_DATE_MAX_LEN: usize = 10;

/// A single patient entry.
///
/// Field order matches the CSV column order:
/// `ID,CPF,Nome,Idade,Data_Cadastro`.
///
/// # Example
///
/// ```
/// use patient_records::csv_handler::PatientRecord;
///
/// let record = PatientRecord::new(1, "12345678901", "Ana Silva", 34, "2023-01-10");
/// assert_eq!(record.name, "Ana Silva");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientRecord {
    /// Identifier, unique within a store.
    pub id: i64,

    /// National identifier (CPF). Kept verbatim, never validated numerically.
    pub national_id: String,

    /// Full name.
    pub name: String,

    /// Age in years.
    pub age: u8,

    /// Registration date. Free-form text, usually `YYYY-MM-DD`.
    pub registration_date: String,
}

impl PatientRecord {
    /// Creates a record, truncating string fields to their limits.
    pub fn new(
        id: i64,
        national_id: impl Into<String>,
        name: impl Into<String>,
        age: u8,
        registration_date: impl Into<String>,
    ) -> Self {
        let mut record = Self {
            id,
            national_id: national_id.into(),
            name: name.into(),
            age,
            registration_date: registration_date.into(),
        };
        record.truncate_fields();
        record
    }

    /// Truncates every string field to its maximum length.
    pub fn truncate_fields(&mut self) {
        truncate_field(&mut self.national_id, NATIONAL_ID_MAX_LEN);
        truncate_field(&mut self.name, NAME_MAX_LEN);
        truncate_field(&mut self.registration_date, REGISTRATION_DATE_MAX_LEN);
    }
}

/// Truncates `value` to at most `max_len` bytes without splitting a character.
///
/// ```
/// use patient_records::csv_handler::truncate_field;
///
/// let mut value = String::from("João da Silva");
/// truncate_field(&mut value, 3);
/// assert_eq!(value, "Jo");
/// ```
pub fn truncate_field(value: &mut String, max_len: usize) {
    if value.len() <= max_len {
        return;
    }
    let mut end = max_len;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    value.truncate(end);
}

/// Statistics collected while loading a CSV file.
///
/// The read loop stops at the first row that does not parse. That row and
/// every row after it are counted in `skipped_rows`.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LoadStats {
    /// Number of records loaded into the store.
    pub loaded_rows: u64,
    /// Number of data rows ignored after the first malformed one (inclusive).
    pub skipped_rows: u64,
    /// Physical line where the first malformed row starts (1-indexed, header
    /// is line 1, blank lines included).
    pub first_skipped_line: Option<u64>,
}

/// Statistics collected while writing a CSV file.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WriteStats {
    /// Number of records written, excluding the header.
    pub total_records: u64,
    /// Number of bytes written, including the header.
    pub bytes_written: u64,
}
