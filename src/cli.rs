//! CLI argument parsing module
//!
//! Handles command-line argument parsing using `clap` derive macros.
//! This module defines the `Command` enum for the available operations, the
//! `Args` struct with validation logic, and [`run`], which dispatches a parsed
//! command against the store.

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use tracing::{info, Level};

use crate::commands;
use crate::error::PatientStoreError;
use crate::render::{self, OutputFormat};
use crate::shell::{Shell, ShellExit};
use crate::store::{parse_age, PatientStore, RecordPatch, SearchField};

/// Field selector for `search`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SearchBy {
    /// Match on the patient name
    Name,
    /// Match on the national id (CPF)
    NationalId,
}

impl From<SearchBy> for SearchField {
    fn from(by: SearchBy) -> Self {
        match by {
            SearchBy::Name => SearchField::Name,
            SearchBy::NationalId => SearchField::NationalId,
        }
    }
}

/// Operations available from the command line.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// List every patient in file order
    List,

    /// Find patients whose name or national id starts with QUERY
    Search {
        /// Field to match against
        #[arg(long, value_enum, default_value = "name")]
        by: SearchBy,

        /// Case-sensitive prefix
        query: String,
    },

    /// Add a patient with the next free id
    Insert {
        /// National id (CPF), at most 14 bytes
        #[arg(long)]
        national_id: String,

        /// Full name, at most 99 bytes
        #[arg(long)]
        name: String,

        /// Age in years (0-255)
        #[arg(long)]
        age: String,

        /// Registration date (default: today)
        #[arg(long)]
        date: Option<String>,
    },

    /// Change fields of an existing patient ("-" keeps the current value)
    Update {
        /// Patient id
        id: i64,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        national_id: Option<String>,

        #[arg(long)]
        age: Option<String>,

        #[arg(long)]
        date: Option<String>,
    },

    /// Delete a patient
    Remove {
        /// Patient id
        id: i64,
    },

    /// Interactive menu; the file is rewritten on exit
    Shell,
}

impl Command {
    /// Returns true if the command changes the store and must be saved.
    pub fn is_mutating(&self) -> bool {
        matches!(
            self,
            Command::Insert { .. } | Command::Update { .. } | Command::Remove { .. }
        )
    }
}

/// Command-line arguments for the patient record store.
///
/// Use the `validate()` method after parsing to ensure argument combinations are valid.
///
/// # Example
///
/// ```rust,ignore
/// use clap::Parser;
/// use patient_records::cli::Args;
///
/// let args = Args::parse();
/// args.validate()?;
/// ```
#[derive(Parser, Debug)]
#[command(name = "patient-records")]
#[command(about = "Manage patient records stored in a CSV file")]
#[command(version)]
pub struct Args {
    /// CSV data file
    #[arg(long, env = "PATIENT_RECORDS_FILE", default_value = "dados.csv")]
    pub file: PathBuf,

    /// Start with an empty store if the data file does not exist
    #[arg(long, default_value = "false")]
    pub create: bool,

    /// Id given to the first patient inserted into an empty store
    #[arg(long, default_value = "1")]
    pub first_id: i64,

    /// Output format for list and search results
    #[arg(long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

impl Args {
    /// Validate argument combinations.
    ///
    /// - `--format json` is not available in the interactive shell
    /// - `update` needs at least one field that is not `-`
    /// - `insert` needs a non-empty name and national id and a valid age
    pub fn validate(&self) -> Result<(), String> {
        if self.format == OutputFormat::Json && self.command == Command::Shell {
            return Err("--format json cannot be used with shell".to_string());
        }

        match &self.command {
            Command::Insert {
                national_id,
                name,
                age,
                ..
            } => {
                if national_id.is_empty() {
                    return Err("--national-id must not be empty".to_string());
                }
                if name.is_empty() {
                    return Err("--name must not be empty".to_string());
                }
                parse_age(age).map_err(|e| e.to_string())?;
            }
            Command::Update {
                name,
                national_id,
                age,
                date,
                ..
            } => {
                let patch = RecordPatch::from_inputs(
                    name.as_deref(),
                    national_id.as_deref(),
                    age.as_deref(),
                    date.as_deref(),
                )
                .map_err(|e| e.to_string())?;
                if patch.is_empty() {
                    return Err(
                        "update requires at least one of --name, --national-id, --age, --date"
                            .to_string(),
                    );
                }
            }
            _ => {}
        }

        Ok(())
    }

    /// Maximum log level selected by `-v`.
    pub fn log_level(&self) -> Level {
        match self.verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            _ => Level::DEBUG,
        }
    }
}

/// Opens the store named by `args`.
///
/// A missing file is an error unless `--create` was given.
pub fn open_store(args: &Args) -> Result<PatientStore, PatientStoreError> {
    match commands::load_with_first_id(&args.file, args.first_id) {
        Ok((store, _stats)) => Ok(store),
        Err(PatientStoreError::FileNotFound { ref source, .. })
            if args.create && source.kind() == std::io::ErrorKind::NotFound =>
        {
            let store = PatientStore::with_first_id(args.first_id);
            info!(
                path = %args.file.display(),
                first_id = store.first_id(),
                "Data file missing, starting empty"
            );
            Ok(store)
        }
        Err(e) => Err(e),
    }
}

/// Runs the parsed command.
///
/// `input` is only read by the interactive shell. Results go to `output`.
/// Mutating commands rewrite the data file once they succeed.
pub fn run<R: BufRead, W: Write>(
    args: &Args,
    input: R,
    output: &mut W,
) -> Result<(), PatientStoreError> {
    args.validate().map_err(PatientStoreError::InvalidArgument)?;
    let mut store = open_store(args)?;

    match &args.command {
        Command::List => {
            render::write_records(output, &commands::list(&store), args.format)?;
        }
        Command::Search { by, query } => {
            let found = commands::search(&store, query, (*by).into());
            render::write_search_results(output, &found, args.format)?;
        }
        Command::Insert {
            national_id,
            name,
            age,
            date,
        } => {
            let date = date.clone().unwrap_or_else(commands::today);
            let record =
                commands::insert(&mut store, national_id, name, parse_age(age)?, &date)?;
            writeln!(output, "Inserted patient {}", record.id)?;
        }
        Command::Update {
            id,
            name,
            national_id,
            age,
            date,
        } => {
            let patch = RecordPatch::from_inputs(
                name.as_deref(),
                national_id.as_deref(),
                age.as_deref(),
                date.as_deref(),
            )?;
            let record = commands::update(&mut store, *id, &patch)?;
            writeln!(output, "Updated patient {}", record.id)?;
        }
        Command::Remove { id } => {
            let record = commands::remove(&mut store, *id)?;
            writeln!(output, "Removed patient {} ({})", record.id, record.name)?;
        }
        Command::Shell => {
            let mut shell = Shell::new(&mut store, &args.file, input, &mut *output);
            if let ShellExit::Discarded = shell.run()? {
                info!("Shell exited without saving");
            }
            return Ok(());
        }
    }

    if args.command.is_mutating() {
        commands::save(&store, &args.file)?;
    }
    Ok(())
}
