use csv::{QuoteStyle, Terminator, Writer, WriterBuilder};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

use super::record::{PatientRecord, WriteStats};
use super::CSV_HEADER;
use crate::error::PatientStoreError;

/// CSV writer for serializing patient records.
///
/// The `CsvWriter` writes the fixed header on creation and one line per
/// record afterwards, in the order records are given. Lines end with `\n`.
///
/// Fields are only quoted when they contain a comma, a double quote or a line
/// break; every other field is written verbatim, so well-formed records produce
/// the plain `ID,CPF,Nome,Idade,Data_Cadastro` layout.
pub struct CsvWriter<W: Write> {
    /// The underlying CSV writer.
    writer: Writer<W>,
    /// Statistics for written records.
    stats: WriteStats,
}

impl<W: Write> CsvWriter<W> {
    /// Creates a new CSV writer, writing the header row.
    pub fn new(inner: W) -> Result<Self, PatientStoreError> {
        let mut writer = WriterBuilder::new()
            .has_headers(false)
            .quote_style(QuoteStyle::Necessary)
            .terminator(Terminator::Any(b'\n'))
            .from_writer(inner);

        writer.write_record(CSV_HEADER)?;

        Ok(Self {
            writer,
            stats: WriteStats::default(),
        })
    }

    /// Writes a patient record.
    pub fn write(&mut self, record: &PatientRecord) -> Result<(), PatientStoreError> {
        self.writer.serialize(record)?;
        self.stats.total_records += 1;
        Ok(())
    }

    /// Flushes buffered rows and returns the inner writer with the statistics.
    pub fn finish(self) -> Result<(W, WriteStats), PatientStoreError> {
        let inner = self
            .writer
            .into_inner()
            .map_err(|e| PatientStoreError::Io(e.into_error()))?;
        Ok((inner, self.stats))
    }
}

/// Serializes records to CSV bytes, header first.
///
/// Identical input always produces byte-identical output.
pub fn serialize<'a, I>(records: I) -> Result<(Vec<u8>, WriteStats), PatientStoreError>
where
    I: IntoIterator<Item = &'a PatientRecord>,
{
    let mut writer = CsvWriter::new(Vec::new())?;
    for record in records {
        writer.write(record)?;
    }

    let (bytes, mut stats) = writer.finish()?;
    stats.bytes_written = bytes.len() as u64;
    Ok((bytes, stats))
}

/// Rewrites the CSV file at `path` with the given records.
///
/// The data is written to a temporary file in the same directory and then
/// renamed over `path`, so a failure leaves the previous file untouched.
///
/// # Errors
///
/// Returns [`PatientStoreError::Write`] if the temporary file cannot be
/// created, written or renamed into place.
pub fn persist<'a, I>(path: &Path, records: I) -> Result<WriteStats, PatientStoreError>
where
    I: IntoIterator<Item = &'a PatientRecord>,
{
    let (bytes, stats) = serialize(records)?;

    let write_error = |source: std::io::Error| PatientStoreError::Write {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp = NamedTempFile::new_in(dir).map_err(write_error)?;
    temp.write_all(&bytes).map_err(write_error)?;
    temp.as_file().sync_all().map_err(write_error)?;
    temp.persist(path).map_err(|e| write_error(e.error))?;

    debug!(
        path = %path.display(),
        records = stats.total_records,
        bytes = stats.bytes_written,
        "Persisted CSV file"
    );

    Ok(stats)
}
