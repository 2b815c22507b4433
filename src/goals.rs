use chrono::{NaiveDate, Utc};

use crate::models::{GoalProgress, Reading, Trend, UserProfile};
use crate::percentile::PercentileEngine;
use crate::statistics::{classify_trend, mean, round_half_up, values_in_window};

/// Readings needed in the last 14 days before a goal trend is reported
pub const MIN_TREND_READINGS: usize = 7;

/// Tracks progress toward a percentile-based HRV goal
pub struct GoalTracker;

impl GoalTracker {
    /// Progress relative to the current UTC date
    pub fn calculate_goal_progress(readings: &[Reading], profile: &UserProfile) -> Option<GoalProgress> {
        Self::calculate_goal_progress_as_of(readings, profile, Utc::now().date_naive())
    }

    /// Progress relative to `today`.
    ///
    /// `None` when there are no readings, no target percentile, or no
    /// reading in the last 7 days. The streak counts back from the most
    /// recent reading and stops at the first one below target.
    pub fn calculate_goal_progress_as_of(
        readings: &[Reading],
        profile: &UserProfile,
        today: NaiveDate,
    ) -> Option<GoalProgress> {
        if readings.is_empty() {
            return None;
        }
        let target_percentile = profile.target_percentile?;

        let target_hrv = PercentileEngine::percentile_to_target_hrv(
            f64::from(target_percentile),
            profile.age,
            profile.gender,
        );

        let current_hrv = round_half_up(mean(&values_in_window(readings, today, 7))?);

        let progress = if target_hrv > 0.0 {
            round_half_up((current_hrv / target_hrv * 100.0).min(100.0)) as u8
        } else {
            100
        };

        Some(GoalProgress {
            current_hrv,
            target_hrv,
            progress,
            days_at_goal: Self::days_at_goal(readings, target_hrv),
            trend: Self::goal_trend(readings, today),
        })
    }

    /// Unbroken run of most-recent readings at or above `target_hrv`
    pub fn days_at_goal(readings: &[Reading], target_hrv: f64) -> u32 {
        let mut sorted: Vec<&Reading> = readings.iter().collect();
        sorted.sort_by(|a, b| b.date.cmp(&a.date));

        sorted
            .iter()
            .take_while(|r| r.hrv_ms >= target_hrv)
            .count() as u32
    }

    fn goal_trend(readings: &[Reading], today: NaiveDate) -> Option<Trend> {
        let last_14 = values_in_window(readings, today, 14);
        if last_14.len() < MIN_TREND_READINGS {
            return None;
        }

        let avg_7 = mean(&values_in_window(readings, today, 7))?;
        let avg_14 = mean(&last_14)?;
        Some(classify_trend(avg_7, avg_14))
    }
}
