//! Daily training recommendation
//!
//! Compares the most recent reading with the personal 7-day baseline,
//! using deviation bands similar to common HRV-guided training schemes:
//!
//! - at least 5% above baseline: push
//! - within -15%..+5%: maintain
//! - -30%..-15%: keep it easy
//! - more than 30% below: rest
//!
//! A recovery score in the red zone (below 34) overrides the HRV band.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::Reading;
use crate::statistics::{mean, values_in_window};

/// Recovery scores below this are treated as a rest day
pub const LOW_RECOVERY_SCORE: f64 = 34.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrainingIntensity {
    Rest,
    Easy,
    Maintain,
    Push,
}

impl fmt::Display for TrainingIntensity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrainingIntensity::Rest => write!(f, "Rest"),
            TrainingIntensity::Easy => write!(f, "Easy"),
            TrainingIntensity::Maintain => write!(f, "Maintain"),
            TrainingIntensity::Push => write!(f, "Push"),
        }
    }
}

impl TrainingIntensity {
    /// Band for a percent deviation from baseline
    pub fn from_deviation(deviation_pct: f64) -> Self {
        if deviation_pct >= 5.0 {
            TrainingIntensity::Push
        } else if deviation_pct >= -15.0 {
            TrainingIntensity::Maintain
        } else if deviation_pct >= -30.0 {
            TrainingIntensity::Easy
        } else {
            TrainingIntensity::Rest
        }
    }

    fn message(&self) -> &'static str {
        match self {
            TrainingIntensity::Rest => {
                "Your body is under strain. Prioritise sleep, hydration and light movement today."
            }
            TrainingIntensity::Easy => {
                "HRV is below your baseline. Keep training easy and aerobic."
            }
            TrainingIntensity::Maintain => {
                "HRV is in your normal range. Train as planned."
            }
            TrainingIntensity::Push => {
                "HRV is above your baseline. A good day for a harder session."
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    /// Date of the reading the advice is based on
    pub date: NaiveDate,
    pub intensity: TrainingIntensity,

    /// Percent deviation of the latest HRV from the 7-day mean
    pub deviation_pct: f64,
    pub message: String,
}

/// Recommendation relative to the current UTC date
pub fn recommend(readings: &[Reading]) -> Option<Recommendation> {
    recommend_as_of(readings, Utc::now().date_naive())
}

/// Recommendation for the most recent reading, `None` with no readings.
///
/// With no readings in the 7-day window the latest value is its own
/// baseline.
pub fn recommend_as_of(readings: &[Reading], today: NaiveDate) -> Option<Recommendation> {
    let latest = readings.iter().max_by_key(|r| r.date)?;

    let baseline = mean(&values_in_window(readings, today, 7)).unwrap_or(latest.hrv_ms);
    let deviation_pct = if baseline > 0.0 {
        (latest.hrv_ms - baseline) / baseline * 100.0
    } else {
        0.0
    };

    let mut intensity = TrainingIntensity::from_deviation(deviation_pct);
    if latest
        .recovery_score
        .map(|score| score < LOW_RECOVERY_SCORE)
        .unwrap_or(false)
    {
        intensity = TrainingIntensity::Rest;
    }

    Some(Recommendation {
        date: latest.date,
        intensity,
        deviation_pct,
        message: intensity.message().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ReadingSource;
    use chrono::Duration;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 30).unwrap()
    }

    fn reading(days_ago: i64, hrv_ms: f64) -> Reading {
        Reading::new(today() - Duration::days(days_ago), hrv_ms, ReadingSource::WhoopCsv)
    }

    #[test]
    fn test_deviation_bands() {
        assert_eq!(TrainingIntensity::from_deviation(10.0), TrainingIntensity::Push);
        assert_eq!(TrainingIntensity::from_deviation(0.0), TrainingIntensity::Maintain);
        assert_eq!(TrainingIntensity::from_deviation(-15.0), TrainingIntensity::Maintain);
        assert_eq!(TrainingIntensity::from_deviation(-20.0), TrainingIntensity::Easy);
        assert_eq!(TrainingIntensity::from_deviation(-31.0), TrainingIntensity::Rest);
    }

    #[test]
    fn test_no_readings() {
        assert!(recommend_as_of(&[], today()).is_none());
    }

    #[test]
    fn test_low_hrv_day() {
        let readings = vec![reading(3, 60.0), reading(2, 60.0), reading(1, 60.0), reading(0, 30.0)];
        let rec = recommend_as_of(&readings, today()).unwrap();

        // baseline 52.5, latest 30 -> -42.9%
        assert_eq!(rec.intensity, TrainingIntensity::Rest);
        assert_eq!(rec.date, today());
        assert!(rec.deviation_pct < -30.0);
    }

    #[test]
    fn test_recovery_score_override() {
        let readings = vec![
            reading(1, 50.0),
            reading(0, 60.0).with_recovery_score(20.0),
        ];
        let rec = recommend_as_of(&readings, today()).unwrap();
        assert_eq!(rec.intensity, TrainingIntensity::Rest);
    }

    #[test]
    fn test_stale_readings_use_latest_as_baseline() {
        let readings = vec![reading(30, 40.0), reading(20, 45.0)];
        let rec = recommend_as_of(&readings, today()).unwrap();
        assert_eq!(rec.intensity, TrainingIntensity::Maintain);
        assert_eq!(rec.deviation_pct, 0.0);
    }
}
