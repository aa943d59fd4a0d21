use csv::{ByteRecord, ReaderBuilder, StringRecord};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::record::{LoadStats, PatientRecord};
use super::EXPECTED_FIELDS;
use crate::error::PatientStoreError;

/// CSV reader for loading patient records from a file.
///
/// The first line of the file is the header and is discarded by
/// [`CsvReader::open`], whatever it contains. Data rows are then yielded in
/// file order until the end of the file or the first row that does not parse
/// as `id,national_id,name,age,registration_date`. That row and everything
/// after it are skipped and counted in [`LoadStats`].
///
/// # Features
///
/// - Tolerates a malformed tail instead of failing the whole load
/// - Skips blank lines between data rows
/// - Accepts quoted fields that span several lines
/// - Truncates over-long string fields instead of rejecting them
/// - Implements `Iterator` for convenient sequential reading
///
/// The file handle is released when the reader is dropped.
pub struct CsvReader {
    /// Buffered file handle, positioned after the last consumed line.
    input: BufReader<File>,
    /// Path to the CSV file, for log context.
    path: PathBuf,
    /// Physical line where the most recent row starts (1-indexed, header is line 1).
    current_line: u64,
    /// Physical lines consumed so far, header included.
    lines_read: u64,
    /// Counters for loaded and skipped rows.
    stats: LoadStats,
    /// Set once the end of the file or a malformed row has been reached.
    exhausted: bool,
}

impl CsvReader {
    /// Opens the CSV file and discards its first line.
    ///
    /// # Errors
    ///
    /// - [`PatientStoreError::FileNotFound`] if the file cannot be opened
    /// - [`PatientStoreError::EmptyFile`] if not even one line can be read
    pub fn open(path: &Path) -> Result<Self, PatientStoreError> {
        let file = File::open(path).map_err(|source| PatientStoreError::FileNotFound {
            path: path.to_path_buf(),
            source,
        })?;

        let mut input = BufReader::new(file);
        let mut header = Vec::new();
        if input.read_until(b'\n', &mut header)? == 0 {
            return Err(PatientStoreError::EmptyFile(path.to_path_buf()));
        }

        debug!(path = %path.display(), "Opened CSV file");

        Ok(Self {
            input,
            path: path.to_path_buf(),
            current_line: 1,
            lines_read: 1,
            stats: LoadStats::default(),
            exhausted: false,
        })
    }

    /// Reads the next well-formed record.
    ///
    /// Returns `None` at the end of the file, and also at the first malformed
    /// row, after which every remaining row is counted as skipped.
    pub fn read_next(&mut self) -> Option<PatientRecord> {
        if self.exhausted {
            return None;
        }

        match self.next_row() {
            Ok(None) => {
                self.exhausted = true;
                None
            }
            Ok(Some(row)) => match parse_row(&row) {
                Ok(record) => {
                    self.stats.loaded_rows += 1;
                    Some(record)
                }
                Err(reason) => {
                    self.skip_remaining(&reason);
                    None
                }
            },
            Err(e) => {
                self.current_line = self.lines_read + 1;
                self.skip_remaining(&e.to_string());
                None
            }
        }
    }

    /// Marks the most recently returned record as rejected.
    ///
    /// Used when a row parses but cannot be accepted by the caller (e.g. its id
    /// is already taken). The row is moved from the loaded count to the skipped
    /// count, and reading stops as it would for a malformed row.
    pub fn reject_last(&mut self, reason: &str) {
        if self.exhausted || self.stats.loaded_rows == 0 {
            return;
        }
        self.stats.loaded_rows -= 1;
        self.skip_remaining(reason);
    }

    /// Returns the statistics for the rows read so far.
    pub fn stats(&self) -> &LoadStats {
        &self.stats
    }

    /// Consumes the reader and returns the final statistics.
    pub fn finish(self) -> LoadStats {
        self.stats
    }

    /// Returns the raw bytes of the next non-blank row, or `None` at the end
    /// of the file.
    ///
    /// A row whose quotes are still open at the end of a line continues on the
    /// next one.
    fn next_row(&mut self) -> io::Result<Option<Vec<u8>>> {
        let mut row = Vec::new();
        loop {
            let start = row.len();
            if self.input.read_until(b'\n', &mut row)? == 0 {
                return Ok((!row.is_empty()).then_some(row));
            }
            self.lines_read += 1;

            if start == 0 {
                if row.trim_ascii().is_empty() {
                    row.clear();
                    continue;
                }
                self.current_line = self.lines_read;
            }

            if row.iter().filter(|&&b| b == b'"').count() % 2 == 0 {
                return Ok(Some(row));
            }
        }
    }

    /// Counts the current row and every row after it as skipped.
    fn skip_remaining(&mut self, reason: &str) {
        let first_line = self.current_line;
        let mut skipped = 1;
        // A read error past this point is just another unusable row.
        while let Ok(Some(_)) = self.next_row() {
            skipped += 1;
        }

        self.stats.skipped_rows += skipped;
        self.stats.first_skipped_line = Some(first_line);
        self.exhausted = true;

        warn!(
            path = %self.path.display(),
            line = first_line,
            skipped,
            "Stopped reading at malformed row: {}",
            reason
        );
    }
}

impl Iterator for CsvReader {
    type Item = PatientRecord;

    /// Returns the next well-formed record from the CSV file.
    fn next(&mut self) -> Option<Self::Item> {
        self.read_next()
    }
}

/// Parses one data row, returning a description of the problem on failure.
fn parse_row(row: &[u8]) -> Result<PatientRecord, String> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        // Row length is checked below so a short row ends the loop instead
        // of failing the read.
        .flexible(true)
        .from_reader(row);

    let mut raw = ByteRecord::new();
    if !reader.read_byte_record(&mut raw).map_err(|e| e.to_string())? {
        return Err("empty row".to_string());
    }
    if reader
        .read_byte_record(&mut ByteRecord::new())
        .map_err(|e| e.to_string())?
    {
        return Err("stray record terminator inside row".to_string());
    }

    if raw.len() != EXPECTED_FIELDS {
        return Err(format!(
            "expected {} fields but got {}",
            EXPECTED_FIELDS,
            raw.len()
        ));
    }

    let row = StringRecord::from_byte_record(raw).map_err(|e| e.to_string())?;
    let mut record: PatientRecord = row.deserialize(None).map_err(|e| e.to_string())?;
    record.truncate_fields();
    Ok(record)
}
