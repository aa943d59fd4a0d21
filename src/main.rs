//! Patient Records - manage patient records stored in a CSV file
//!
//! Loads the data file, runs one command (or the interactive shell) against
//! the in-memory store, and rewrites the file after any change.
//!
//! # Exit Codes
//!
//! | Code | Meaning |
//! |------|---------|
//! | 0 | Success |
//! | 1 | Configuration/argument error |
//! | 3 | File I/O error (load or save) |
//! | 4 | Runtime error (unknown id, invalid value) |

use clap::Parser;
use std::io;
use std::process::ExitCode;

use patient_records::cli::{self, Args};
use patient_records::error::PatientStoreError;

/// Exit code for success
const EXIT_SUCCESS: u8 = 0;
/// Exit code for configuration/argument errors
const EXIT_CONFIG_ERROR: u8 = 1;
/// Exit code for file I/O errors
const EXIT_IO_ERROR: u8 = 3;
/// Exit code for runtime errors
const EXIT_RUNTIME_ERROR: u8 = 4;

fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(args.log_level())
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    if let Err(e) = args.validate() {
        eprintln!("Error: Configuration error: {}", e);
        eprintln!("  Hint: Use --help for usage information");
        return ExitCode::from(EXIT_CONFIG_ERROR);
    }

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    match cli::run(&args, stdin.lock(), &mut stdout) {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(error_to_exit_code(&e))
        }
    }
}

/// Maps an error to the process exit code.
fn error_to_exit_code(error: &PatientStoreError) -> u8 {
    match error {
        PatientStoreError::InvalidArgument(_) => EXIT_CONFIG_ERROR,
        e if e.is_file_error() => EXIT_IO_ERROR,
        _ => EXIT_RUNTIME_ERROR,
    }
}
