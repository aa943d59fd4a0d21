//! Integration tests for command-line dispatch against a data file

use clap::Parser;
use patient_records::cli::{self, Args};
use patient_records::csv_handler::PatientRecord;
use patient_records::error::PatientStoreError;

use std::io::Cursor;
use std::path::{Path, PathBuf};
use tempfile::{tempdir, TempDir};

const SEED: &str = "ID,CPF,Nome,Idade,Data_Cadastro\n\
1,12345678901,Ana Silva,34,2023-01-10\n\
2,98765432100,Bruno,41,2023-02-11\n";

/// Helper: a temp dir holding a seeded data file
fn seeded() -> (TempDir, PathBuf) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("dados.csv");
    std::fs::write(&path, SEED).unwrap();
    (dir, path)
}

/// Helper: run the CLI with `--file path` prepended, returning stdout
fn run(path: &Path, argv: &[&str]) -> Result<String, PatientStoreError> {
    let file = path.to_str().unwrap();
    let mut full = vec!["patient-records", "--file", file];
    full.extend_from_slice(argv);
    let args = Args::try_parse_from(full).unwrap();

    let mut output = Vec::new();
    cli::run(&args, Cursor::new(Vec::new()), &mut output)?;
    Ok(String::from_utf8(output).unwrap())
}

#[test]
fn test_list_prints_table() {
    let (_dir, path) = seeded();
    let output = run(&path, &["list"]).unwrap();

    assert_eq!(
        output,
        "ID\tCPF\tNOME\tIDADE\tDATA_CADASTRO\n\
         1\t12345678901\tAna Silva\t34\t2023-01-10\n\
         2\t98765432100\tBruno\t41\t2023-02-11\n"
    );
    // Read-only commands leave the file alone
    assert_eq!(std::fs::read_to_string(&path).unwrap(), SEED);
}

#[test]
fn test_search_json_output() {
    let (_dir, path) = seeded();
    let output = run(&path, &["--format", "json", "search", "An"]).unwrap();

    let found: Vec<PatientRecord> = serde_json::from_str(&output).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, 1);
}

#[test]
fn test_search_without_matches_reports_it() {
    let (_dir, path) = seeded();
    let output = run(&path, &["search", "--by", "national-id", "000"]).unwrap();
    assert!(output.ends_with("No patients found\n"));
}

#[test]
fn test_insert_saves_with_next_id() {
    let (_dir, path) = seeded();
    let output = run(
        &path,
        &[
            "insert",
            "--national-id",
            "111",
            "--name",
            "Bob",
            "--age",
            "40",
            "--date",
            "2024-05-01",
        ],
    )
    .unwrap();
    assert_eq!(output, "Inserted patient 3\n");

    let content = std::fs::read_to_string(&path).unwrap();
    assert!(content.ends_with("2,98765432100,Bruno,41,2023-02-11\n3,111,Bob,40,2024-05-01\n"));
}

#[test]
fn test_update_keeps_sentinel_fields() {
    let (_dir, path) = seeded();
    run(&path, &["update", "2", "--name", "-", "--age", "42"]).unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    assert!(content.contains("2,98765432100,Bruno,42,2023-02-11\n"));
}

#[test]
fn test_remove_unknown_id_is_not_found_and_file_unchanged() {
    let (_dir, path) = seeded();
    let result = run(&path, &["remove", "9"]);

    assert!(matches!(result, Err(PatientStoreError::NotFound(9))));
    assert_eq!(std::fs::read_to_string(&path).unwrap(), SEED);
}

#[test]
fn test_remove_rewrites_file() {
    let (_dir, path) = seeded();
    let output = run(&path, &["remove", "1"]).unwrap();
    assert_eq!(output, "Removed patient 1 (Ana Silva)\n");

    assert_eq!(
        std::fs::read_to_string(&path).unwrap(),
        "ID,CPF,Nome,Idade,Data_Cadastro\n2,98765432100,Bruno,41,2023-02-11\n"
    );
}

#[test]
fn test_missing_file_requires_create() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("new.csv");

    let result = run(&path, &["list"]);
    assert!(matches!(result, Err(PatientStoreError::FileNotFound { .. })));

    run(
        &path,
        &[
            "--create",
            "--first-id",
            "100",
            "insert",
            "--national-id",
            "111",
            "--name",
            "Bob",
            "--age",
            "40",
            "--date",
            "2024-05-01",
        ],
    )
    .unwrap();

    assert_eq!(
        std::fs::read_to_string(&path).unwrap(),
        "ID,CPF,Nome,Idade,Data_Cadastro\n100,111,Bob,40,2024-05-01\n"
    );
}

#[test]
fn test_invalid_combination_is_invalid_argument() {
    let (_dir, path) = seeded();
    let result = run(&path, &["update", "1", "--name", "-"]);
    assert!(matches!(result, Err(PatientStoreError::InvalidArgument(_))));
}
