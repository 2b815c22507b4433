use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::Result;
use crate::import::validation::ReadingValidator;

/// Original source row, header name to cell text.
///
/// Kept separate from the typed reading fields so that arbitrary export
/// columns survive import without widening the canonical model.
pub type RawRow = BTreeMap<String, String>;

/// Origin of a reading. Informational only, merge logic ignores it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadingSource {
    Manual,
    WhoopCsv,
    WhoopApi,
}

impl fmt::Display for ReadingSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadingSource::Manual => write!(f, "manual"),
            ReadingSource::WhoopCsv => write!(f, "whoop_csv"),
            ReadingSource::WhoopApi => write!(f, "whoop_api"),
        }
    }
}

/// One calendar day's HRV measurement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Opaque unique identifier, generated at creation
    pub id: String,

    /// Calendar day, unique within a collection
    pub date: NaiveDate,

    /// HRV (RMSSD) in milliseconds, finite and non-negative
    pub hrv_ms: f64,

    /// Resting heart rate in bpm, 0 when the source had none
    pub resting_hr: f64,

    /// Recovery score (0-100)
    pub recovery_score: Option<f64>,

    pub source: ReadingSource,

    /// Original source row, retained for diagnostics
    pub raw_data: Option<RawRow>,
}

impl Reading {
    /// Create a reading with a fresh id
    pub fn new(date: NaiveDate, hrv_ms: f64, source: ReadingSource) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            date,
            hrv_ms,
            resting_hr: 0.0,
            recovery_score: None,
            source,
            raw_data: None,
        }
    }

    /// Build a validated, manually entered reading
    pub fn manual(
        date: NaiveDate,
        hrv_ms: f64,
        resting_hr: Option<f64>,
        recovery_score: Option<f64>,
    ) -> Result<Self> {
        let mut reading = Reading::new(date, hrv_ms, ReadingSource::Manual);
        reading.resting_hr = resting_hr.unwrap_or(0.0);
        reading.recovery_score = recovery_score;

        ReadingValidator::validate_reading(&reading)?;
        Ok(reading)
    }

    pub fn with_resting_hr(mut self, resting_hr: f64) -> Self {
        self.resting_hr = resting_hr;
        self
    }

    pub fn with_recovery_score(mut self, recovery_score: f64) -> Self {
        self.recovery_score = Some(recovery_score);
        self
    }
}

/// Gender category used for benchmark lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Gender::Male => write!(f, "male"),
            Gender::Female => write!(f, "female"),
            Gender::Other => write!(f, "other"),
        }
    }
}

impl std::str::FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "male" | "m" => Ok(Gender::Male),
            "female" | "f" => Ok(Gender::Female),
            "other" | "o" => Ok(Gender::Other),
            _ => Err(format!("Invalid gender: {}", s)),
        }
    }
}

/// Demographics and goal settings for the tracked user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Age in years
    pub age: u32,

    pub gender: Gender,

    /// Goal expressed as a population percentile (1-99)
    pub target_percentile: Option<u8>,
}

impl Default for UserProfile {
    fn default() -> Self {
        Self {
            age: 30,
            gender: Gender::Other,
            target_percentile: None,
        }
    }
}

/// Direction of recent HRV relative to the two-week baseline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Improving,
    Declining,
    Stable,
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trend::Improving => write!(f, "improving"),
            Trend::Declining => write!(f, "declining"),
            Trend::Stable => write!(f, "stable"),
        }
    }
}

/// Derived statistics, recomputed on demand and never persisted
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatisticsSnapshot {
    /// HRV of the most recent calendar day present
    pub current: Option<f64>,

    /// Mean over the last 7 days, rounded to whole milliseconds
    pub average_7_day: Option<f64>,

    /// Mean over the last 30 days, rounded to whole milliseconds
    pub average_30_day: Option<f64>,

    /// Minimum over all readings
    pub min: Option<f64>,

    /// Maximum over all readings
    pub max: Option<f64>,

    pub trend: Option<Trend>,
}

/// One point of a rolling-average series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollingPoint {
    pub date: NaiveDate,
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeDirection {
    Up,
    Down,
    Same,
}

/// Percent change between two values
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Change {
    /// Absolute rounded percent change
    pub value: f64,
    pub direction: ChangeDirection,
}

/// Position of a value relative to the population median
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Comparison {
    Above,
    Below,
    At,
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Comparison::Above => write!(f, "above"),
            Comparison::Below => write!(f, "below"),
            Comparison::At => write!(f, "at"),
        }
    }
}

/// Goal attainment derived from recent readings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalProgress {
    /// 7-day average HRV, rounded to whole milliseconds
    pub current_hrv: f64,

    /// HRV matching the target percentile
    pub target_hrv: f64,

    /// Percent of target reached (0-100)
    pub progress: u8,

    /// Consecutive most-recent readings at or above target
    pub days_at_goal: u32,

    pub trend: Option<Trend>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reading_ids_are_unique() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let a = Reading::new(date, 45.0, ReadingSource::WhoopCsv);
        let b = Reading::new(date, 45.0, ReadingSource::WhoopCsv);

        assert_ne!(a.id, b.id);
        assert_eq!(a.resting_hr, 0.0);
        assert!(a.recovery_score.is_none());
    }

    #[test]
    fn test_manual_reading() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        let reading = Reading::manual(date, 52.5, Some(58.0), Some(71.0)).unwrap();

        assert_eq!(reading.source, ReadingSource::Manual);
        assert_eq!(reading.resting_hr, 58.0);
        assert_eq!(reading.recovery_score, Some(71.0));
        assert!(reading.raw_data.is_none());
    }

    #[test]
    fn test_manual_reading_rejects_negative_hrv() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        assert!(Reading::manual(date, -1.0, None, None).is_err());
        assert!(Reading::manual(date, f64::NAN, None, None).is_err());
    }

    #[test]
    fn test_reading_serialization() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let reading = Reading::new(date, 48.2, ReadingSource::WhoopCsv).with_resting_hr(60.0);

        let json = serde_json::to_string(&reading).unwrap();
        assert!(json.contains("\"date\":\"2024-01-02\""));
        assert!(json.contains("\"source\":\"whoop_csv\""));

        let back: Reading = serde_json::from_str(&json).unwrap();
        assert_eq!(back, reading);
    }

    #[test]
    fn test_gender_parsing() {
        assert_eq!("Male".parse::<Gender>().unwrap(), Gender::Male);
        assert_eq!("f".parse::<Gender>().unwrap(), Gender::Female);
        assert_eq!("other".parse::<Gender>().unwrap(), Gender::Other);
        assert!("unknown".parse::<Gender>().is_err());
    }
}
