use chrono::NaiveDate;
use std::fs;
use tempfile::tempdir;

use hrvtrack::error::{HrvTrackError, ImportExportError};
use hrvtrack::import::ImportManager;
use hrvtrack::{parse_whoop_csv, validate_whoop_csv, ReadingSource};

/// Import tests for WHOOP cycle exports

const HEADER: &str = "Cycle start time,Heart rate variability (ms),Resting heart rate (bpm)";

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn full_export() -> String {
    [
        "Cycle start time,Cycle end time,Cycle timezone,Recovery score %,Resting heart rate (bpm),Heart rate variability (ms),Skin temp (celsius)",
        "2024-03-03 22:41:00,2024-03-04 23:02:00,UTC+01:00,71,54,62,33.4",
        "2024-03-01 23:10:00,2024-03-02 22:55:00,UTC+01:00,45,58,41,33.1",
        "2024-03-02 22:55:00,2024-03-03 22:41:00,UTC+01:00,,57,,33.0",
        "2024-03-04 23:02:00,,UTC+01:00,88,52,70,",
    ]
    .join("\n")
}

#[test]
fn test_parse_is_idempotent() {
    let content = full_export();
    let first = parse_whoop_csv(&content);
    let second = parse_whoop_csv(&content);

    assert_eq!(first.skipped_rows, second.skipped_rows);
    assert_eq!(first.errors, second.errors);
    assert_eq!(first.readings.len(), second.readings.len());

    for (a, b) in first.readings.iter().zip(second.readings.iter()) {
        assert_ne!(a.id, b.id);
        assert_eq!(a.date, b.date);
        assert_eq!(a.hrv_ms, b.hrv_ms);
        assert_eq!(a.resting_hr, b.resting_hr);
        assert_eq!(a.recovery_score, b.recovery_score);
        assert_eq!(a.raw_data, b.raw_data);
    }
}

#[test]
fn test_same_day_rows_keep_first() {
    let content = format!(
        "{}\n2024-01-01T00:00:00.000Z,45.5,58\n2024-01-01T01:00:00.000Z,50.0,60\n",
        HEADER
    );
    let outcome = parse_whoop_csv(&content);

    assert_eq!(outcome.readings.len(), 1);
    assert_eq!(outcome.skipped_rows, 1);
    assert!(outcome.errors.is_empty());
    assert_eq!(outcome.readings[0].hrv_ms, 45.5);
    assert_eq!(outcome.readings[0].resting_hr, 58.0);
}

#[test]
fn test_missing_hrv_is_skipped() {
    let content = format!(
        "{}\n2024-01-01T00:00:00.000Z,,58\n2024-01-02T00:00:00.000Z,47,57\n",
        HEADER
    );
    let outcome = parse_whoop_csv(&content);

    assert_eq!(outcome.readings.len(), 1);
    assert_eq!(outcome.readings[0].date, date(2024, 1, 2));
    assert_eq!(outcome.skipped_rows, 1);
    assert!(outcome.errors.is_empty());
}

#[test]
fn test_full_export_columns() {
    let outcome = parse_whoop_csv(&full_export());

    assert_eq!(outcome.readings.len(), 3);
    assert_eq!(outcome.skipped_rows, 1);

    let dates: Vec<NaiveDate> = outcome.readings.iter().map(|r| r.date).collect();
    assert_eq!(dates, vec![date(2024, 3, 1), date(2024, 3, 3), date(2024, 3, 4)]);

    let first = &outcome.readings[0];
    assert_eq!(first.hrv_ms, 41.0);
    assert_eq!(first.resting_hr, 58.0);
    // the export labels the score "Recovery score %", which only lands in raw data
    assert_eq!(first.recovery_score, None);
    assert_eq!(first.source, ReadingSource::WhoopCsv);

    let raw = first.raw_data.as_ref().unwrap();
    assert_eq!(raw.get("Recovery score %").map(String::as_str), Some("45"));
    assert_eq!(raw.get("Cycle timezone").map(String::as_str), Some("UTC+01:00"));
    assert_eq!(raw.get("Skin temp (celsius)").map(String::as_str), Some("33.1"));
}

#[test]
fn test_validator_rejects_wrong_headers() {
    let result = validate_whoop_csv("Date,Value\n2024-01-01,45");
    assert!(!result.valid);
    assert!(result.error.unwrap().contains("Cycle start time"));

    let result = validate_whoop_csv("Cycle start time,HRV\n2024-01-01,45");
    assert!(!result.valid);
    assert!(result.error.unwrap().contains("Heart rate variability (ms)"));

    assert!(validate_whoop_csv(&full_export()).valid);
}

#[test]
fn test_empty_input() {
    let outcome = parse_whoop_csv("");
    assert!(outcome.readings.is_empty());
    assert_eq!(outcome.skipped_rows, 0);
    assert!(outcome.errors.is_empty());

    assert!(!validate_whoop_csv("").valid);
}

#[test]
fn test_import_directory_combines_files() {
    let dir = tempdir().unwrap();
    fs::write(
        dir.path().join("january.csv"),
        format!("{}\n2024-01-01T06:00:00Z,45,58\n2024-01-02T06:00:00Z,47,57\n", HEADER),
    )
    .unwrap();
    fs::write(
        dir.path().join("overlap.csv"),
        format!("{}\n2024-01-02T07:00:00Z,52,56\n", HEADER),
    )
    .unwrap();
    fs::write(dir.path().join("broken.csv"), "Date,Value\n2024-01-01,45\n").unwrap();
    fs::write(dir.path().join("notes.txt"), "not an export").unwrap();

    let manager = ImportManager::new();
    let outcome = manager.import_directory(dir.path()).unwrap();

    // the overlapping date is kept twice, the repository resolves it
    assert_eq!(outcome.readings.len(), 3);
    assert_eq!(outcome.skipped_rows, 0);
    assert!(outcome.readings.windows(2).all(|w| w[0].date <= w[1].date));
}

#[test]
fn test_import_file_errors() {
    let dir = tempdir().unwrap();
    let manager = ImportManager::new();

    let wrong_headers = dir.path().join("wrong.csv");
    fs::write(&wrong_headers, "Date,Value\n2024-01-01,45\n").unwrap();
    match manager.import_file(&wrong_headers) {
        Err(HrvTrackError::ImportExport(ImportExportError::MissingColumn { column })) => {
            assert_eq!(column, "Cycle start time");
        }
        other => panic!("expected missing column error, got {:?}", other),
    }

    let unsupported = dir.path().join("data.fit");
    fs::write(&unsupported, "binary").unwrap();
    assert!(matches!(
        manager.import_file(&unsupported),
        Err(HrvTrackError::ImportExport(ImportExportError::UnsupportedFormat { .. }))
    ));
    assert!(!manager.can_import_file(&unsupported));

    let missing = dir.path().join("missing.csv");
    assert!(matches!(manager.import_file(&missing), Err(HrvTrackError::Io(_))));
}

#[test]
fn test_validate_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("cycles.csv");
    fs::write(&path, format!("{}\n2024-01-01T06:00:00Z,45,58\n", HEADER)).unwrap();

    let manager = ImportManager::new();
    assert!(manager.validate_file(&path).is_ok());
}
