//! Interactive shell
//!
//! A numbered-menu loop over any line-based input and output. The shell
//! borrows the store for its whole lifetime and rewrites the data file when the
//! user chooses to save and quit, or when the input ends.

use std::io::{BufRead, Write};
use std::path::Path;
use tracing::{debug, warn};

use crate::commands;
use crate::csv_handler::WriteStats;
use crate::error::PatientStoreError;
use crate::render::{self, OutputFormat};
use crate::store::{parse_age, PatientStore, RecordPatch, SearchField, KEEP_SENTINEL};

const MENU: &str = "\nWhat would you like to do?\n\
1 - Search patients\n\
2 - List patients\n\
3 - Insert patient\n\
4 - Update patient\n\
5 - Remove patient\n\
6 - Save and quit\n\
7 - Quit without saving";

const SEARCH_MENU: &str = "\nSearch by\n\
1 - Name\n\
2 - National ID (CPF)\n\
3 - Back to main menu";

/// How the shell ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellExit {
    /// The data file was rewritten.
    Saved(WriteStats),
    /// The user quit without saving.
    Discarded,
}

/// Interactive menu over a [`PatientStore`].
pub struct Shell<'a, R, W> {
    store: &'a mut PatientStore,
    path: &'a Path,
    input: R,
    output: W,
}

impl<'a, R: BufRead, W: Write> Shell<'a, R, W> {
    pub fn new(store: &'a mut PatientStore, path: &'a Path, input: R, output: W) -> Self {
        Self {
            store,
            path,
            input,
            output,
        }
    }

    /// Runs the menu loop until the user quits or the input ends.
    ///
    /// Operation failures (unknown ids, bad ages, a failed save) are reported
    /// to the output and the loop continues. Only I/O errors on the shell's
    /// own input or output end the loop with an error.
    pub fn run(&mut self) -> Result<ShellExit, PatientStoreError> {
        loop {
            writeln!(self.output, "{}", MENU)?;
            let choice = match self.read_line()? {
                Some(line) => line,
                None => {
                    debug!("Input closed, saving");
                    return self.save_and_quit();
                }
            };

            match choice.as_str() {
                "1" => self.search()?,
                "2" => render::write_records(
                    &mut self.output,
                    &commands::list(self.store),
                    OutputFormat::Table,
                )?,
                "3" => self.insert()?,
                "4" => self.update()?,
                "5" => self.remove()?,
                "6" => match self.save_and_quit() {
                    Ok(exit) => return Ok(exit),
                    Err(e) if !is_shell_io_error(&e) => {
                        warn!("Save failed: {}", e);
                        writeln!(self.output, "Error: {}", e)?;
                    }
                    Err(e) => return Err(e),
                },
                "7" => {
                    writeln!(self.output, "Quitting without saving")?;
                    return Ok(ShellExit::Discarded);
                }
                _ => writeln!(self.output, "Unrecognised option")?,
            }
        }
    }

    fn save_and_quit(&mut self) -> Result<ShellExit, PatientStoreError> {
        let stats = commands::save(self.store, self.path)?;
        writeln!(
            self.output,
            "Saved {} patient(s) to {}",
            stats.total_records,
            self.path.display()
        )?;
        Ok(ShellExit::Saved(stats))
    }

    fn search(&mut self) -> Result<(), PatientStoreError> {
        writeln!(self.output, "{}", SEARCH_MENU)?;
        let (field, label) = match self.read_line()?.as_deref() {
            Some("1") => (SearchField::Name, "Name: "),
            Some("2") => (SearchField::NationalId, "National ID: "),
            Some("3") | None => return Ok(()),
            Some(_) => {
                writeln!(self.output, "Unrecognised option")?;
                return Ok(());
            }
        };

        let query = match self.prompt(label)? {
            Some(query) if !query.is_empty() => query,
            _ => {
                writeln!(self.output, "Empty query")?;
                return Ok(());
            }
        };

        let found = commands::search(self.store, &query, field);
        render::write_search_results(&mut self.output, &found, OutputFormat::Table)
    }

    fn insert(&mut self) -> Result<(), PatientStoreError> {
        let Some(national_id) = self.prompt("National ID: ")? else {
            return Ok(());
        };
        let Some(name) = self.prompt("Name: ")? else {
            return Ok(());
        };
        let Some(age) = self.prompt("Age: ")? else {
            return Ok(());
        };
        let age = match parse_age(&age) {
            Ok(age) => age,
            Err(e) => return self.report(e),
        };
        let date = match self.prompt("Registration date (empty for today): ")? {
            Some(date) if !date.is_empty() => date,
            Some(_) => commands::today(),
            None => return Ok(()),
        };

        match commands::insert(&mut *self.store, &national_id, &name, age, &date) {
            Ok(record) => writeln!(self.output, "Inserted patient {}", record.id)?,
            Err(e) => self.report(e)?,
        }
        Ok(())
    }

    fn update(&mut self) -> Result<(), PatientStoreError> {
        let Some(id) = self.prompt_id()? else {
            return Ok(());
        };
        if !self.store.contains_id(id) {
            return self.report(PatientStoreError::NotFound(id));
        }

        let hint = format!(" ('{}' keeps current): ", KEEP_SENTINEL);
        let mut answers = Vec::with_capacity(4);
        for field in ["Name", "National ID", "Age", "Registration date"] {
            match self.prompt(&format!("{}{}", field, hint))? {
                Some(answer) => answers.push(answer),
                None => return Ok(()),
            }
        }

        let patch = match RecordPatch::from_inputs(
            Some(answers[0].as_str()),
            Some(answers[1].as_str()),
            Some(answers[2].as_str()),
            Some(answers[3].as_str()),
        ) {
            Ok(patch) => patch,
            Err(e) => return self.report(e),
        };

        match commands::update(&mut *self.store, id, &patch) {
            Ok(record) => writeln!(self.output, "Updated patient {}", record.id)?,
            Err(e) => self.report(e)?,
        }
        Ok(())
    }

    fn remove(&mut self) -> Result<(), PatientStoreError> {
        let Some(id) = self.prompt_id()? else {
            return Ok(());
        };
        match commands::remove(&mut *self.store, id) {
            Ok(record) => writeln!(self.output, "Removed patient {} ({})", record.id, record.name)?,
            Err(e) => self.report(e)?,
        }
        Ok(())
    }

    /// Prompts for an id, reporting unparsable input. `None` means no id.
    fn prompt_id(&mut self) -> Result<Option<i64>, PatientStoreError> {
        let Some(raw) = self.prompt("Patient ID: ")? else {
            return Ok(None);
        };
        match raw.parse() {
            Ok(id) => Ok(Some(id)),
            Err(_) => {
                writeln!(self.output, "Invalid id '{}'", raw)?;
                Ok(None)
            }
        }
    }

    fn prompt(&mut self, label: &str) -> Result<Option<String>, PatientStoreError> {
        write!(self.output, "{}", label)?;
        self.output.flush()?;
        self.read_line()
    }

    /// Reads one line without its terminator. `None` at end of input.
    fn read_line(&mut self) -> Result<Option<String>, PatientStoreError> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let trimmed = line.trim_end_matches(['\r', '\n']).len();
        line.truncate(trimmed);
        Ok(Some(line))
    }

    fn report(&mut self, error: PatientStoreError) -> Result<(), PatientStoreError> {
        writeln!(self.output, "Error: {}", error)?;
        Ok(())
    }
}

/// Plain I/O errors come from the shell's own streams; the rest are reportable.
fn is_shell_io_error(error: &PatientStoreError) -> bool {
    matches!(error, PatientStoreError::Io(_))
}
