//! Output rendering for list and search results.

use clap::ValueEnum;
use std::io::Write;

use crate::csv_handler::PatientRecord;
use crate::error::PatientStoreError;

/// Column header for table output.
pub const TABLE_HEADER: &str = "ID\tCPF\tNOME\tIDADE\tDATA_CADASTRO";

/// Message printed when a search matches nothing.
pub const NO_MATCHES: &str = "No patients found";

/// How records are written to the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Tab-separated columns with a header line
    Table,
    /// Pretty-printed JSON array
    Json,
}

/// Writes one record as a table row.
pub fn write_row<W: Write>(out: &mut W, record: &PatientRecord) -> std::io::Result<()> {
    writeln!(
        out,
        "{}\t{}\t{}\t{}\t{}",
        record.id, record.national_id, record.name, record.age, record.registration_date
    )
}

/// Writes records in the requested format.
pub fn write_records<W: Write>(
    out: &mut W,
    records: &[PatientRecord],
    format: OutputFormat,
) -> Result<(), PatientStoreError> {
    match format {
        OutputFormat::Table => {
            writeln!(out, "{}", TABLE_HEADER)?;
            for record in records {
                write_row(out, record)?;
            }
        }
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, records)?;
            writeln!(out)?;
        }
    }
    Ok(())
}

/// Writes search results, reporting an empty result explicitly in table form.
pub fn write_search_results<W: Write>(
    out: &mut W,
    records: &[PatientRecord],
    format: OutputFormat,
) -> Result<(), PatientStoreError> {
    write_records(out, records, format)?;
    if records.is_empty() && format == OutputFormat::Table {
        writeln!(out, "{}", NO_MATCHES)?;
    }
    Ok(())
}
