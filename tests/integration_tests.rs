use chrono::{Duration, NaiveDate};
use tempfile::tempdir;

use hrvtrack::goals::GoalTracker;
use hrvtrack::recommendation::{recommend_as_of, TrainingIntensity};
use hrvtrack::{
    parse_whoop_csv, FileStore, Gender, HydratedRepository, PercentileEngine, Reading,
    ReadingRepository, ReadingSource, StatisticsEngine, Trend, UserProfile,
};

/// Integration tests that run the complete import and analysis workflows

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Three weeks of daily cycles ending on `end`, HRV rising in the last week
fn three_week_export(end: NaiveDate) -> String {
    let mut lines = vec![
        "Cycle start time,Cycle end time,Recovery score %,Resting heart rate (bpm),Heart rate variability (ms)"
            .to_string(),
    ];

    for days_ago in (0..21).rev() {
        let day = end - Duration::days(days_ago);
        let hrv = if days_ago <= 6 { 60 } else { 45 };
        lines.push(format!(
            "{} 06:30:00,{} 22:00:00,66,55,{}",
            day.format("%Y-%m-%d"),
            day.format("%Y-%m-%d"),
            hrv
        ));
    }

    lines.join("\n")
}

#[test]
fn test_merge_last_write_wins() {
    let mut repository = ReadingRepository::new();

    let first = repository.import_readings(vec![Reading::new(
        date(2024, 1, 1),
        45.5,
        ReadingSource::WhoopCsv,
    )]);
    let second = repository.import_readings(vec![Reading::new(
        date(2024, 1, 1),
        50.0,
        ReadingSource::Manual,
    )]);

    assert_eq!(first, 1);
    assert_eq!(second, 0);
    assert_eq!(repository.len(), 1);

    let stored = repository.get_reading_by_date(date(2024, 1, 1)).unwrap();
    assert_eq!(stored.hrv_ms, 50.0);
    assert_eq!(stored.source, ReadingSource::Manual);
    assert!(repository.get_reading_by_date(date(2024, 1, 2)).is_none());
}

#[test]
fn test_statistics_on_known_series() {
    let readings = vec![
        Reading::new(date(2024, 1, 1), 45.5, ReadingSource::Manual),
        Reading::new(date(2024, 1, 2), 48.2, ReadingSource::Manual),
    ];

    let snapshot = StatisticsEngine::calculate_statistics_as_of(&readings, date(2024, 1, 2));
    assert_eq!(snapshot.current, Some(48.2));
    assert_eq!(snapshot.average_7_day, Some(47.0));

    let empty = StatisticsEngine::calculate_statistics(&[]);
    assert!(empty.current.is_none());
    assert!(empty.average_7_day.is_none());
    assert!(empty.average_30_day.is_none());
    assert!(empty.min.is_none());
    assert!(empty.max.is_none());
    assert!(empty.trend.is_none());
}

#[test]
fn test_complete_import_and_analysis_workflow() {
    let today = date(2024, 5, 21);
    let outcome = parse_whoop_csv(&three_week_export(today));
    assert_eq!(outcome.readings.len(), 21);
    assert_eq!(outcome.skipped_rows, 0);

    let mut repository = ReadingRepository::new();
    assert_eq!(repository.import_readings(outcome.readings), 21);
    let readings = repository.readings();

    // Statistics
    let snapshot = StatisticsEngine::calculate_statistics_as_of(&readings, today);
    assert_eq!(snapshot.current, Some(60.0));
    assert_eq!(snapshot.min, Some(45.0));
    assert_eq!(snapshot.max, Some(60.0));
    // 7-day window holds 8 calendar days: 7 at 60 and 1 at 45
    assert_eq!(snapshot.average_7_day, Some(58.0));
    assert_eq!(snapshot.trend, Some(Trend::Improving));

    let rolling = StatisticsEngine::calculate_rolling_average(&readings, 7);
    assert_eq!(rolling.len(), 21);
    assert_eq!(rolling.last().map(|p| p.value), Some(60.0));

    // Percentile for a 30-year-old male: 60ms sits between p50 (53) and p75 (72)
    let percentile = PercentileEngine::get_percentile(60.0, 30, Gender::Male);
    assert!(percentile.percentile > 50 && percentile.percentile < 75);

    // Goal at the median
    let profile = UserProfile {
        age: 30,
        gender: Gender::Male,
        target_percentile: Some(50),
    };
    let progress = GoalTracker::calculate_goal_progress_as_of(&readings, &profile, today).unwrap();
    assert_eq!(progress.target_hrv, 53.0);
    assert_eq!(progress.progress, 100);
    assert_eq!(progress.days_at_goal, 7);
    assert_eq!(progress.trend, Some(Trend::Improving));

    // Latest reading sits at the top of the baseline
    let rec = recommend_as_of(&readings, today).unwrap();
    assert_eq!(rec.date, today);
    assert_eq!(rec.intensity, TrainingIntensity::Maintain);
}

#[test]
fn test_reimport_overwrites_with_newer_export() {
    let mut repository = ReadingRepository::new();

    let original = parse_whoop_csv(
        "Cycle start time,Heart rate variability (ms)\n2024-01-01T06:00:00Z,45\n2024-01-02T06:00:00Z,47\n",
    );
    let corrected = parse_whoop_csv(
        "Cycle start time,Heart rate variability (ms)\n2024-01-02T06:00:00Z,49\n2024-01-03T06:00:00Z,51\n",
    );

    assert_eq!(repository.import_readings(original.readings), 2);
    assert_eq!(repository.import_readings(corrected.readings), 1);

    let values: Vec<f64> = repository.iter().map(|r| r.hrv_ms).collect();
    assert_eq!(values, vec![45.0, 49.0, 51.0]);
}

#[test]
fn test_file_store_persists_collection() {
    let dir = tempdir().unwrap();
    let today = date(2024, 5, 21);

    {
        let mut repository = HydratedRepository::new(FileStore::new(dir.path()));
        repository.hydrate().unwrap();

        let outcome = parse_whoop_csv(&three_week_export(today));
        repository.import_readings(outcome.readings).unwrap();

        let manual = Reading::manual(today, 64.0, Some(50.0), Some(80.0)).unwrap();
        assert_eq!(repository.import_readings(vec![manual]).unwrap(), 0);
    }

    let mut reopened = HydratedRepository::new(FileStore::new(dir.path()));
    assert!(reopened.repository().is_err());
    reopened.hydrate().unwrap();

    let stored = reopened.repository().unwrap();
    assert_eq!(stored.len(), 21);

    let latest = reopened.get_reading_by_date(today).unwrap().unwrap();
    assert_eq!(latest.hrv_ms, 64.0);
    assert_eq!(latest.source, ReadingSource::Manual);
    assert!(latest.raw_data.is_none());

    let earlier = reopened
        .get_reading_by_date(today - Duration::days(10))
        .unwrap()
        .unwrap();
    assert_eq!(
        earlier
            .raw_data
            .as_ref()
            .and_then(|raw| raw.get("Recovery score %"))
            .map(String::as_str),
        Some("66")
    );
}
