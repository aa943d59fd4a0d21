//! CSV handler module
//!
//! Handles reading and writing patient records to CSV files.
//!
//! # CSV File Format
//!
//! ```csv
//! ID,CPF,Nome,Idade,Data_Cadastro
//! 1,12345678901,Ana Silva,34,2023-01-10
//! 2,98765432100,Bruno,41,2023-02-11
//! ```
//!
//! The header line is mandatory and the column order is fixed. Reading stops
//! at the first row that does not parse; see [`CsvReader`].

pub mod reader;
pub mod record;
pub mod writer;

pub use reader::CsvReader;
pub use record::{
    truncate_field, LoadStats, PatientRecord, WriteStats, NAME_MAX_LEN, NATIONAL_ID_MAX_LEN,
    REGISTRATION_DATE_MAX_LEN,
};
pub use writer::{persist, serialize, CsvWriter};

/// Header row written at the top of every data file.
pub const CSV_HEADER: [&str; 5] = ["ID", "CPF", "Nome", "Idade", "Data_Cadastro"];

/// Number of columns in every data row.
pub const EXPECTED_FIELDS: usize = CSV_HEADER.len();
