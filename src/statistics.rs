//! HRV statistics over a daily reading series
//!
//! Windows are calendar based: a reading is "in the last N days" when its
//! date is on or after `today - N days`. All functions are pure; the
//! `*_as_of` variants take `today` explicitly and the plain variants use
//! the current UTC date.

use chrono::{Duration, NaiveDate, Utc};

use crate::models::{
    Change, ChangeDirection, Reading, RollingPoint, StatisticsSnapshot, Trend,
};

/// Percent change between the 7- and 14-day means that counts as a trend
pub const TREND_THRESHOLD_PCT: f64 = 5.0;

/// Round half up, so -2.5 becomes -2 and 2.5 becomes 3
pub(crate) fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}

pub(crate) fn round_to_tenth(value: f64) -> f64 {
    round_half_up(value * 10.0) / 10.0
}

pub(crate) fn mean<'a, I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = &'a f64>,
{
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));

    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

/// HRV values of readings dated within the last `days` days
pub(crate) fn values_in_window(readings: &[Reading], today: NaiveDate, days: i64) -> Vec<f64> {
    let cutoff = today - Duration::days(days);
    readings
        .iter()
        .filter(|r| r.date >= cutoff)
        .map(|r| r.hrv_ms)
        .collect()
}

/// Classify the 7-day mean against the 14-day mean.
///
/// A zero 14-day mean can only come with a zero 7-day mean, which is
/// reported as stable.
pub fn classify_trend(avg_7_day: f64, avg_14_day: f64) -> Trend {
    if avg_14_day == 0.0 {
        return Trend::Stable;
    }

    let percent_change = (avg_7_day - avg_14_day) / avg_14_day * 100.0;

    if percent_change >= TREND_THRESHOLD_PCT {
        Trend::Improving
    } else if percent_change <= -TREND_THRESHOLD_PCT {
        Trend::Declining
    } else {
        Trend::Stable
    }
}

/// Statistics calculator for HRV series
pub struct StatisticsEngine;

impl StatisticsEngine {
    /// Snapshot relative to the current UTC date
    pub fn calculate_statistics(readings: &[Reading]) -> StatisticsSnapshot {
        Self::calculate_statistics_as_of(readings, Utc::now().date_naive())
    }

    /// Snapshot relative to `today`.
    ///
    /// Empty input yields an all-`None` snapshot. `min`/`max` cover every
    /// reading; the averages only their windows. The trend is `None`
    /// unless the 7-day window has data.
    pub fn calculate_statistics_as_of(readings: &[Reading], today: NaiveDate) -> StatisticsSnapshot {
        if readings.is_empty() {
            return StatisticsSnapshot::default();
        }

        let current = readings
            .iter()
            .max_by_key(|r| r.date)
            .map(|r| r.hrv_ms);

        let avg_7 = mean(&values_in_window(readings, today, 7));
        let avg_14 = mean(&values_in_window(readings, today, 14));
        let avg_30 = mean(&values_in_window(readings, today, 30));

        let min = readings.iter().map(|r| r.hrv_ms).reduce(f64::min);
        let max = readings.iter().map(|r| r.hrv_ms).reduce(f64::max);

        let trend = match (avg_7, avg_14) {
            (Some(avg_7), Some(avg_14)) => Some(classify_trend(avg_7, avg_14)),
            _ => None,
        };

        StatisticsSnapshot {
            current,
            average_7_day: avg_7.map(round_half_up),
            average_30_day: avg_30.map(round_half_up),
            min,
            max,
            trend,
        }
    }

    /// Trailing moving average, one point per input reading.
    ///
    /// Input must already be sorted ascending by date; this function does
    /// not sort. The window grows over the first entries until it holds
    /// `window_days` readings. A window of zero is treated as one.
    pub fn calculate_rolling_average(readings: &[Reading], window_days: usize) -> Vec<RollingPoint> {
        let window = window_days.max(1);

        readings
            .iter()
            .enumerate()
            .map(|(i, reading)| {
                let start = (i + 1).saturating_sub(window);
                let slice = &readings[start..=i];
                let sum: f64 = slice.iter().map(|r| r.hrv_ms).sum();

                RollingPoint {
                    date: reading.date,
                    value: round_to_tenth(sum / slice.len() as f64),
                }
            })
            .collect()
    }

    /// Rounded absolute percent change from `previous` to `current`.
    ///
    /// A zero `previous` yields `{0, Same}` instead of dividing by zero.
    pub fn calculate_change(current: f64, previous: f64) -> Change {
        if previous == 0.0 {
            return Change {
                value: 0.0,
                direction: ChangeDirection::Same,
            };
        }

        let percent = (current - previous) / previous * 100.0;

        let direction = if percent > 0.0 {
            ChangeDirection::Up
        } else if percent < 0.0 {
            ChangeDirection::Down
        } else {
            ChangeDirection::Same
        };

        Change {
            value: round_half_up(percent).abs(),
            direction,
        }
    }
}
