//! WHOOP `physiological_cycles.csv` import
//!
//! One export row per physiological cycle. Rows are reduced to one
//! [`Reading`] per UTC calendar day of the cycle start; rows without a
//! usable date or HRV value are counted as skipped rather than reported
//! as errors, since gaps are routine in these exports.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use csv::{ReaderBuilder, StringRecord, Trim};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::error::{ImportExportError, Result};
use crate::import::ImportFormat;
use crate::models::{RawRow, Reading, ReadingSource};

pub const CYCLE_START_COLUMN: &str = "Cycle start time";
pub const HRV_COLUMN: &str = "Heart rate variability (ms)";
pub const RESTING_HR_COLUMN: &str = "Resting heart rate (bpm)";
pub const RECOVERY_SCORE_COLUMN: &str = "Recovery score";

/// Columns that must appear in the header line, checked in this order
pub const REQUIRED_COLUMNS: [&str; 2] = [CYCLE_START_COLUMN, HRV_COLUMN];

/// Outcome of a header check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsvValidation {
    pub valid: bool,
    pub error: Option<String>,
}

impl CsvValidation {
    fn ok() -> Self {
        Self {
            valid: true,
            error: None,
        }
    }

    fn failed(message: impl Into<String>) -> Self {
        Self {
            valid: false,
            error: Some(message.into()),
        }
    }
}

/// Readings extracted from one CSV blob
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParseOutcome {
    /// Accepted readings, ascending by date
    pub readings: Vec<Reading>,

    /// Structural problems reported by the CSV reader
    pub errors: Vec<String>,

    /// Rows dropped for a missing date, missing HRV or a repeated date
    pub skipped_rows: usize,
}

impl ParseOutcome {
    /// Append another outcome, keeping readings sorted by date
    pub fn merge(&mut self, other: ParseOutcome) {
        self.readings.extend(other.readings);
        self.readings.sort_by(|a, b| a.date.cmp(&b.date));
        self.errors.extend(other.errors);
        self.skipped_rows += other.skipped_rows;
    }
}

fn header_line(content: &str) -> Option<&str> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    content.lines().next().filter(|line| !line.trim().is_empty())
}

/// First required column absent from the header line, if any
fn find_missing_column(header: &str) -> Option<&'static str> {
    REQUIRED_COLUMNS
        .iter()
        .copied()
        .find(|column| !header.contains(column))
}

/// Check that the header line mentions every required column.
///
/// Matching is by substring against the raw first line, so extra columns,
/// reordering and trailing whitespace are tolerated while renamed headers
/// are not.
pub fn validate_whoop_csv(content: &str) -> CsvValidation {
    let Some(header) = header_line(content) else {
        return CsvValidation::failed(
            "File is empty. Please upload a WHOOP physiological_cycles.csv export",
        );
    };

    match find_missing_column(header) {
        Some(column) => {
            let error = ImportExportError::MissingColumn {
                column: column.to_string(),
            };
            warn!(column, "CSV header validation failed");
            CsvValidation::failed(error.to_string())
        }
        None => CsvValidation::ok(),
    }
}

/// Header positions of the columns the parser reads
struct ColumnIndex {
    cycle_start: Option<usize>,
    hrv: Option<usize>,
    resting_hr: Option<usize>,
    recovery_score: Option<usize>,
}

impl ColumnIndex {
    fn from_headers(headers: &StringRecord) -> Self {
        Self {
            cycle_start: Self::exact(headers, CYCLE_START_COLUMN),
            hrv: Self::exact(headers, HRV_COLUMN),
            resting_hr: Self::exact(headers, RESTING_HR_COLUMN),
            recovery_score: Self::exact(headers, RECOVERY_SCORE_COLUMN),
        }
    }

    /// Headers are already trimmed by the reader; names must match in full
    fn exact(headers: &StringRecord, name: &str) -> Option<usize> {
        headers.iter().position(|header| header == name)
    }
}

fn field<'r>(record: &'r StringRecord, index: Option<usize>) -> Option<&'r str> {
    index.and_then(|i| record.get(i))
}

/// Parse a cycle start timestamp and truncate it to its UTC calendar date.
///
/// Accepts a space or `T` between date and time. Timestamps without an
/// offset are taken as UTC.
pub fn parse_cycle_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    let normalized = value.replacen(' ', "T", 1);

    if let Ok(dt) = DateTime::parse_from_rfc3339(&normalized) {
        return Some(dt.with_timezone(&Utc).date_naive());
    }

    let offset_formats = ["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%dT%H:%M%z"];
    for format in &offset_formats {
        if let Ok(dt) = DateTime::parse_from_str(&normalized, format) {
            return Some(dt.with_timezone(&Utc).date_naive());
        }
    }

    let naive_formats = [
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
    ];
    for format in &naive_formats {
        if let Ok(naive_dt) = NaiveDateTime::parse_from_str(&normalized, format) {
            return Some(naive_dt.and_utc().date_naive());
        }
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}

/// Parse a decimal cell; empty or non-numeric cells yield `None`
fn parse_number(value: Option<&str>) -> Option<f64> {
    let value = value?.trim();
    if value.is_empty() {
        return None;
    }

    value.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn raw_row(headers: &StringRecord, record: &StringRecord) -> RawRow {
    headers
        .iter()
        .zip(record.iter())
        .map(|(header, value)| (header.to_string(), value.to_string()))
        .collect()
}

/// Parse a WHOOP export into readings.
///
/// Pure with respect to its input: the same text always produces the same
/// readings (apart from their ids), error strings and skip count. Only
/// duplicate dates within this one blob are dropped, first row wins.
pub fn parse_whoop_csv(content: &str) -> ParseOutcome {
    let mut outcome = ParseOutcome::default();

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::Headers)
        .from_reader(content.as_bytes());

    let headers = match reader.headers() {
        Ok(headers) => headers.clone(),
        Err(e) => {
            outcome.errors.push(format!("Header row: {}", e));
            return outcome;
        }
    };

    let columns = ColumnIndex::from_headers(&headers);
    let mut seen_dates: HashSet<NaiveDate> = HashSet::new();

    for (index, result) in reader.records().enumerate() {
        let row_number = index + 1;

        let record = match result {
            Ok(record) => record,
            Err(e) => {
                outcome.errors.push(format!("Row {}: {}", row_number, e));
                continue;
            }
        };

        // An unbalanced quote makes the reader fold the following lines
        // into one field, so those rows never reach the loop on their own
        if record.iter().any(|value| value.contains('\n') || value.contains('\r')) {
            outcome.errors.push(format!(
                "Row {}: field spans several lines, likely an unterminated quote; following rows may have been absorbed",
                row_number
            ));
        } else if record.len() != headers.len() {
            outcome.errors.push(format!(
                "Row {}: expected {} fields but parsed {}",
                row_number,
                headers.len(),
                record.len()
            ));
        }

        let date = field(&record, columns.cycle_start).and_then(parse_cycle_date);
        let hrv_ms = parse_number(field(&record, columns.hrv)).filter(|hrv| *hrv >= 0.0);

        let (date, hrv_ms) = match (date, hrv_ms) {
            (Some(date), Some(hrv_ms)) => (date, hrv_ms),
            _ => {
                debug!(row = row_number, "Skipping row without a valid date or HRV");
                outcome.skipped_rows += 1;
                continue;
            }
        };

        if !seen_dates.insert(date) {
            debug!(row = row_number, %date, "Skipping repeated date");
            outcome.skipped_rows += 1;
            continue;
        }

        let mut reading = Reading::new(date, hrv_ms, ReadingSource::WhoopCsv);
        reading.resting_hr = parse_number(field(&record, columns.resting_hr)).unwrap_or(0.0);
        reading.recovery_score = parse_number(field(&record, columns.recovery_score));
        reading.raw_data = Some(raw_row(&headers, &record));

        outcome.readings.push(reading);
    }

    outcome.readings.sort_by(|a, b| a.date.cmp(&b.date));

    info!(
        readings = outcome.readings.len(),
        skipped = outcome.skipped_rows,
        errors = outcome.errors.len(),
        "Parsed WHOOP CSV"
    );

    outcome
}

/// File importer for WHOOP cycle exports
pub struct WhoopCsvImporter;

impl WhoopCsvImporter {
    pub fn new() -> Self {
        Self
    }

    /// Validate then parse an in-memory export
    pub fn import_content(&self, content: &str) -> Result<ParseOutcome> {
        let Some(header) = header_line(content) else {
            return Err(ImportExportError::InvalidStructure {
                reason: "file is empty".to_string(),
            }
            .into());
        };

        if let Some(column) = find_missing_column(header) {
            return Err(ImportExportError::MissingColumn {
                column: column.to_string(),
            }
            .into());
        }

        Ok(parse_whoop_csv(content))
    }
}

impl Default for WhoopCsvImporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ImportFormat for WhoopCsvImporter {
    fn can_import(&self, file_path: &Path) -> bool {
        file_path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("csv"))
            .unwrap_or(false)
    }

    fn import_file(&self, file_path: &Path) -> Result<ParseOutcome> {
        let content = fs::read_to_string(file_path)?;
        self.import_content(&content)
    }

    fn get_format_name(&self) -> &'static str {
        "WHOOP CSV"
    }
}
