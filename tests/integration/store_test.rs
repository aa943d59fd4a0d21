//! Integration tests for loading and saving the store through real files

use patient_records::commands;
use patient_records::csv_handler::PatientRecord;
use patient_records::error::PatientStoreError;
use patient_records::store::{PatientStore, RecordPatch, SearchField};

use std::path::{Path, PathBuf};
use tempfile::{tempdir, TempDir};

const HEADER: &str = "ID,CPF,Nome,Idade,Data_Cadastro\n";

/// Helper: write `content` to a fresh data file
fn data_file(dir: &TempDir, content: &str) -> PathBuf {
    let path = dir.path().join("dados.csv");
    std::fs::write(&path, content).unwrap();
    path
}

fn read(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap()
}

#[test]
fn test_load_single_row_scenario() {
    let dir = tempdir().unwrap();
    let path = data_file(
        &dir,
        &format!("{}1,12345678901,Ana Silva,34,2023-01-10\n", HEADER),
    );

    let (store, stats) = commands::load(&path).unwrap();

    assert_eq!(stats.loaded_rows, 1);
    assert_eq!(stats.skipped_rows, 0);
    assert_eq!(
        commands::list(&store),
        vec![PatientRecord {
            id: 1,
            national_id: "12345678901".to_string(),
            name: "Ana Silva".to_string(),
            age: 34,
            registration_date: "2023-01-10".to_string(),
        }]
    );
}

#[test]
fn test_load_preserves_file_ids_and_order() {
    let dir = tempdir().unwrap();
    let path = data_file(
        &dir,
        &format!(
            "{}7,111,Carla,50,2023-03-01\n3,222,Ana,34,2023-01-10\n5,333,Bruno,41,2023-02-11\n",
            HEADER
        ),
    );

    let (store, _) = commands::load(&path).unwrap();
    let ids: Vec<i64> = store.iter().map(|r| r.id).collect();
    assert_eq!(ids, [7, 3, 5]);

    // Insert continues from the tail, not the maximum id
    let mut store = store;
    let record = commands::insert(&mut store, "444", "Davi", 9, "2024-01-01").unwrap();
    assert_eq!(record.id, 6);
}

#[test]
fn test_missing_file_and_empty_file() {
    let dir = tempdir().unwrap();

    let missing = commands::load(&dir.path().join("nope.csv"));
    assert!(matches!(missing, Err(PatientStoreError::FileNotFound { .. })));

    let empty = data_file(&dir, "");
    assert!(matches!(
        commands::load(&empty),
        Err(PatientStoreError::EmptyFile(_))
    ));
}

#[test]
fn test_header_only_file_loads_empty_store() {
    let dir = tempdir().unwrap();
    let path = data_file(&dir, HEADER);

    let (mut store, stats) = commands::load(&path).unwrap();
    assert!(store.is_empty());
    assert_eq!(stats.loaded_rows, 0);

    let record = commands::insert(&mut store, "111", "Bob", 40, "2024-05-01").unwrap();
    assert_eq!(record.id, 1);
}

#[test]
fn test_malformed_tail_is_skipped_and_counted() {
    let dir = tempdir().unwrap();
    let path = data_file(
        &dir,
        &format!(
            "{}1,111,Ana,34,2023-01-10\n2,222,Bruno,41,2023-02-11\nbroken line\n4,444,Davi,9,2024-01-01\n",
            HEADER
        ),
    );

    let (store, stats) = commands::load(&path).unwrap();
    assert_eq!(store.len(), 2);
    assert_eq!(stats.loaded_rows, 2);
    assert_eq!(stats.skipped_rows, 2);
    assert_eq!(stats.first_skipped_line, Some(4));
}

#[test]
fn test_duplicate_id_row_ends_load() {
    let dir = tempdir().unwrap();
    let path = data_file(
        &dir,
        &format!(
            "{}1,111,Ana,34,2023-01-10\n1,222,Bruno,41,2023-02-11\n",
            HEADER
        ),
    );

    let (store, stats) = commands::load(&path).unwrap();
    assert_eq!(store.len(), 1);
    assert_eq!(store.first().unwrap().name, "Ana");
    assert_eq!(stats.skipped_rows, 1);
}

#[test]
fn test_crud_session_rewrites_file() {
    let dir = tempdir().unwrap();
    let path = data_file(
        &dir,
        &format!(
            "{}1,12345678901,Ana Silva,34,2023-01-10\n2,98765432100,Bruno,41,2023-02-11\n3,55555555555,Carla,29,2023-03-12\n",
            HEADER
        ),
    );

    let (mut store, _) = commands::load(&path).unwrap();

    commands::remove(&mut store, 2).unwrap();
    let patch = RecordPatch::from_inputs(Some("-"), None, Some("35"), None).unwrap();
    commands::update(&mut store, 1, &patch).unwrap();
    let inserted = commands::insert(&mut store, "111", "Bob", 40, "2024-05-01").unwrap();
    assert_eq!(inserted.id, 4);

    commands::save(&store, &path).unwrap();

    assert_eq!(
        read(&path),
        format!(
            "{}1,12345678901,Ana Silva,35,2023-01-10\n3,55555555555,Carla,29,2023-03-12\n4,111,Bob,40,2024-05-01\n",
            HEADER
        )
    );
}

#[test]
fn test_save_then_load_round_trip_with_quoted_field() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("dados.csv");

    let mut store = PatientStore::new();
    commands::insert(&mut store, "111", "Silva, Ana", 34, "2023-01-10").unwrap();
    commands::insert(&mut store, "222", "Bruno \"Bebeto\"", 41, "2023-02-11").unwrap();
    commands::save(&store, &path).unwrap();

    let (loaded, stats) = commands::load(&path).unwrap();
    assert_eq!(stats.skipped_rows, 0);
    assert_eq!(commands::list(&loaded), commands::list(&store));
}

#[cfg(unix)]
#[test]
fn test_failed_save_keeps_previous_file() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempdir().unwrap();
    let original = format!("{}1,111,Ana,34,2023-01-10\n", HEADER);
    let path = data_file(&dir, &original);

    let (mut store, _) = commands::load(&path).unwrap();
    commands::insert(&mut store, "222", "Bruno", 41, "2023-02-11").unwrap();

    // With the directory read-only the replacement file cannot be created.
    std::fs::set_permissions(dir.path(), std::fs::Permissions::from_mode(0o555)).unwrap();
    let writable = std::fs::File::create(dir.path().join("check")).is_ok();
    if writable {
        // Privileged users ignore directory permissions.
        std::fs::remove_file(dir.path().join("check")).unwrap();
    } else {
        let result = commands::save(&store, &path);
        assert!(matches!(result, Err(PatientStoreError::Write { .. })));
    }
    std::fs::set_permissions(dir.path(), std::fs::Permissions::from_mode(0o755)).unwrap();

    if !writable {
        assert_eq!(read(&path), original);
        let leftovers = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }
}

#[test]
fn test_blank_header_line_keeps_first_row() {
    let dir = tempdir().unwrap();
    let path = data_file(
        &dir,
        "\n1,111,Ana,34,2023-01-10\n2,222,Bia,20,2023-01-11\n",
    );

    let (store, stats) = commands::load(&path).unwrap();
    assert_eq!(store.len(), 2);
    assert_eq!(store.first().map(|r| r.id), Some(1));
    assert_eq!(stats.skipped_rows, 0);

    let only_newline = data_file(&dir, "\n");
    let (store, stats) = commands::load(&only_newline).unwrap();
    assert!(store.is_empty());
    assert_eq!(stats.loaded_rows, 0);
}

#[test]
fn test_search_after_load() {
    let dir = tempdir().unwrap();
    let path = data_file(
        &dir,
        &format!(
            "{}1,12345678901,Ana Silva,34,2023-01-10\n2,12399999999,Bruno,41,2023-02-11\n",
            HEADER
        ),
    );
    let (store, _) = commands::load(&path).unwrap();

    let by_name = commands::search(&store, "An", SearchField::Name);
    assert_eq!(by_name.len(), 1);
    assert_eq!(by_name[0].name, "Ana Silva");

    let by_cpf = commands::search(&store, "123", SearchField::NationalId);
    assert_eq!(by_cpf.len(), 2);

    assert!(commands::search(&store, "9", SearchField::NationalId).is_empty());
}
