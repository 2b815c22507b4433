use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use tabled::{settings::Style, Table, Tabled};
use tracing::{error, info, warn, Level};

use hrvtrack::config::AppConfig;
use hrvtrack::goals::GoalTracker;
use hrvtrack::import::validation::ReadingValidator;
use hrvtrack::import::ImportManager;
use hrvtrack::logging::{init_logging, LogLevel};
use hrvtrack::percentile::PercentileEngine;
use hrvtrack::recommendation::{recommend, TrainingIntensity};
use hrvtrack::repository::HydratedRepository;
use hrvtrack::statistics::StatisticsEngine;
use hrvtrack::store::FileStore;
use hrvtrack::{
    ChangeDirection, Comparison, Gender, HrvTrackError, ParseOutcome, Reading, Trend, UserProfile,
};

/// hrvtrack - HRV tracking CLI
///
/// Imports WHOOP physiological cycle exports and manual readings, then
/// reports rolling statistics, population percentiles and goal progress.
#[derive(Parser)]
#[command(name = "hrvtrack")]
#[command(version)]
#[command(about = "Heart rate variability tracking CLI", long_about = None)]
struct Cli {
    /// Sets a custom config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase verbosity of output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import WHOOP CSV exports (files or directories)
    Import {
        /// Files or directories to import
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Only validate, do not store anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Add a manual reading
    Add {
        /// Calendar date (YYYY-MM-DD)
        #[arg(short, long)]
        date: NaiveDate,

        /// HRV (RMSSD) in milliseconds
        #[arg(long)]
        hrv: f64,

        /// Resting heart rate in bpm
        #[arg(long)]
        resting_hr: Option<f64>,

        /// Recovery score (0-100)
        #[arg(long)]
        recovery: Option<f64>,
    },

    /// Show summary statistics and a rolling average
    Stats {
        /// Rolling average window in readings
        #[arg(short, long, default_value = "7")]
        window: usize,

        /// Number of recent rolling points to show
        #[arg(short, long, default_value = "14")]
        limit: usize,
    },

    /// Rank an HRV value against population benchmarks
    Percentile {
        /// HRV to rank (defaults to the latest reading)
        #[arg(long)]
        hrv: Option<f64>,

        /// Age override
        #[arg(long)]
        age: Option<u32>,

        /// Gender override (male, female, other)
        #[arg(long)]
        gender: Option<Gender>,
    },

    /// Show progress toward the target percentile
    Goal {
        /// Target percentile override (1-99)
        #[arg(short, long)]
        target: Option<u8>,
    },

    /// Daily training recommendation
    Recommend,

    /// Show or update the profile
    Config {
        /// Age in years
        #[arg(long)]
        age: Option<u32>,

        /// Gender (male, female, other)
        #[arg(long)]
        gender: Option<Gender>,

        /// Target percentile (1-99)
        #[arg(long)]
        target: Option<u8>,

        /// Remove the target percentile
        #[arg(long, conflicts_with = "target")]
        clear_target: bool,
    },
}

/// One row of the rolling average table
#[derive(Tabled)]
struct RollingRow {
    #[tabled(rename = "Date")]
    date: NaiveDate,
    #[tabled(rename = "HRV (ms)")]
    hrv: String,
    #[tabled(rename = "Rolling avg")]
    rolling: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(AppConfig::default_config_path);
    let (mut config, load_error) = AppConfig::load_or_fallback(&config_path);

    // Set up logging based on verbosity
    let mut log_config = config.logging.clone();
    log_config.level = LogLevel::from_verbosity(log_config.level, cli.verbose);
    init_logging(&log_config)?;

    if let Some(e) = &load_error {
        if config_path.exists() {
            warn!(path = %config_path.display(), "Using default configuration: {:#}", e);
        } else {
            info!(path = %config_path.display(), "No config file, using defaults");
        }
    }

    if cli.verbose > 0 {
        eprintln!("{}", format!("Log level: {:?}", log_config.level).dimmed());
    }

    let result = match cli.command {
        Commands::Import { paths, dry_run } => run_import(&config, &paths, dry_run),
        Commands::Add {
            date,
            hrv,
            resting_hr,
            recovery,
        } => run_add(&config, date, hrv, resting_hr, recovery),
        Commands::Stats { window, limit } => run_stats(&config, window, limit),
        Commands::Percentile { hrv, age, gender } => run_percentile(&config, hrv, age, gender),
        Commands::Goal { target } => run_goal(&config, target),
        Commands::Recommend => run_recommend(&config),
        Commands::Config {
            age,
            gender,
            target,
            clear_target,
        } => run_config(&mut config, &config_path, age, gender, target, clear_target),
    };

    if let Err(e) = &result {
        match e.downcast_ref::<HrvTrackError>() {
            Some(error) => log_failure(error),
            None => error!("{:#}", e),
        }
    }
    result
}

/// Log a failed operation at the level its severity maps to
fn log_failure(error: &HrvTrackError) {
    let retryable = error.is_retryable();
    let level = error.severity().to_tracing_level();

    if level == Level::ERROR {
        error!(retryable, "{}", error);
    } else if level == Level::WARN {
        warn!(retryable, "{}", error);
    } else {
        info!(retryable, "{}", error);
    }
}

fn open_repository(config: &AppConfig) -> Result<HydratedRepository<FileStore>> {
    let mut repository =
        HydratedRepository::with_key(config.open_store(), &config.import.collection_key);
    repository
        .hydrate()
        .with_context(|| format!("Failed to load readings from {}", config.settings.data_dir.display()))?;
    Ok(repository)
}

fn load_readings(config: &AppConfig) -> Result<Vec<Reading>> {
    let repository = open_repository(config)?;
    Ok(repository.repository()?.readings())
}

fn run_import(config: &AppConfig, paths: &[PathBuf], dry_run: bool) -> Result<()> {
    println!("{}", "Importing HRV data...".green().bold());

    let manager = ImportManager::new();
    let mut combined = ParseOutcome::default();

    for path in paths {
        let result = if path.is_dir() {
            manager.import_directory(path)
        } else if config.import.accepts(path) {
            manager.import_file(path)
        } else {
            println!(
                "  {} {} (unsupported extension)",
                "skipped".yellow(),
                path.display()
            );
            continue;
        };

        match result {
            Ok(outcome) => {
                println!(
                    "  {} {}: {} readings, {} rows skipped",
                    "✓".green(),
                    path.display(),
                    outcome.readings.len(),
                    outcome.skipped_rows
                );
                combined.merge(outcome);
            }
            Err(e) => {
                log_failure(&e);
                println!("  {} {}: {}", "✗".red(), path.display(), e.user_message());
            }
        }
    }

    for error in combined.errors.iter().take(10) {
        println!("  {} {}", "warning:".yellow(), error);
    }
    if combined.errors.len() > 10 {
        println!("  ... and {} more parse errors", combined.errors.len() - 10);
    }

    if dry_run {
        println!(
            "{}",
            format!("✓ Validated {} readings (dry run)", combined.readings.len()).green()
        );
        return Ok(());
    }

    let mut repository = open_repository(config)?;
    let candidates = combined.readings.len();
    let added = repository.import_readings(combined.readings)?;

    println!(
        "{}",
        format!(
            "✓ Import completed: {} candidates, {} new days, {} rows skipped",
            candidates,
            added,
            combined.skipped_rows
        )
        .green()
    );
    Ok(())
}

fn run_add(
    config: &AppConfig,
    date: NaiveDate,
    hrv: f64,
    resting_hr: Option<f64>,
    recovery: Option<f64>,
) -> Result<()> {
    let reading = match Reading::manual(date, hrv, resting_hr, recovery) {
        Ok(reading) => reading,
        Err(e @ HrvTrackError::Validation(_)) => anyhow::bail!(e.user_message()),
        Err(e) => return Err(e.into()),
    };

    let mut repository = open_repository(config)?;
    let replaced = repository.get_reading_by_date(date)?.is_some();
    repository.import_readings(vec![reading])?;

    if replaced {
        println!("{}", format!("✓ Replaced reading for {}", date).green());
    } else {
        println!("{}", format!("✓ Added reading for {}", date).green());
    }
    Ok(())
}

fn format_ms(value: Option<f64>) -> String {
    value
        .map(|v| format!("{} ms", v))
        .unwrap_or_else(|| "-".to_string())
}

fn format_trend(trend: Option<Trend>) -> ColoredString {
    match trend {
        Some(Trend::Improving) => "improving".green(),
        Some(Trend::Declining) => "declining".red(),
        Some(Trend::Stable) => "stable".normal(),
        None => "-".dimmed(),
    }
}

fn run_stats(config: &AppConfig, window: usize, limit: usize) -> Result<()> {
    let readings = load_readings(config)?;
    if readings.is_empty() {
        println!("{}", "No readings yet. Import a WHOOP export first.".yellow());
        return Ok(());
    }

    let snapshot = StatisticsEngine::calculate_statistics(&readings);

    println!("{}", "HRV statistics".cyan().bold());
    println!("  Readings:    {}", readings.len());
    println!("  Current:     {}", format_ms(snapshot.current));
    println!("  7-day avg:   {}", format_ms(snapshot.average_7_day));
    println!("  30-day avg:  {}", format_ms(snapshot.average_30_day));
    println!("  Min / Max:   {} / {}", format_ms(snapshot.min), format_ms(snapshot.max));
    println!("  Trend:       {}", format_trend(snapshot.trend));

    if let (Some(current), Some(avg_30)) = (snapshot.current, snapshot.average_30_day) {
        let change = StatisticsEngine::calculate_change(current, avg_30);
        let arrow = match change.direction {
            ChangeDirection::Up => "▲".green(),
            ChangeDirection::Down => "▼".red(),
            ChangeDirection::Same => "=".normal(),
        };
        println!("  vs 30-day:   {} {}%", arrow, change.value);
    }

    let rolling = StatisticsEngine::calculate_rolling_average(&readings, window);
    let skip = readings.len().saturating_sub(limit);
    let rows: Vec<RollingRow> = readings
        .iter()
        .zip(rolling.iter())
        .skip(skip)
        .map(|(reading, point)| RollingRow {
            date: reading.date,
            hrv: format!("{:.1}", reading.hrv_ms),
            rolling: format!("{:.1}", point.value),
        })
        .collect();

    println!();
    println!("{}", format!("Rolling {}-reading average", window.max(1)).cyan().bold());
    println!("{}", Table::new(rows).with(Style::rounded()));
    Ok(())
}

fn run_percentile(
    config: &AppConfig,
    hrv: Option<f64>,
    age: Option<u32>,
    gender: Option<Gender>,
) -> Result<()> {
    let hrv = match hrv {
        Some(hrv) => {
            ReadingValidator::validate_hrv(hrv)?;
            hrv
        }
        None => {
            let readings = load_readings(config)?;
            match StatisticsEngine::calculate_statistics(&readings).current {
                Some(current) => current,
                None => {
                    println!("{}", "No readings yet. Pass --hrv to rank a value.".yellow());
                    return Ok(());
                }
            }
        }
    };

    let age = age.unwrap_or(config.profile.age);
    let gender = gender.unwrap_or(config.profile.gender);
    let result = PercentileEngine::get_percentile(hrv, age, gender);

    let comparison = match result.comparison {
        Comparison::Above => "above".green(),
        Comparison::Below => "below".yellow(),
        Comparison::At => "at".normal(),
    };

    println!("{}", "Population percentile".cyan().bold());
    println!("  HRV:         {} ms", hrv);
    println!("  Group:       {} {}", result.bracket, gender);
    println!("  Percentile:  {}", result.percentile.to_string().bold());
    println!(
        "  Median:      {} ms ({} median)",
        result.benchmark_p50, comparison
    );
    Ok(())
}

fn run_goal(config: &AppConfig, target: Option<u8>) -> Result<()> {
    let profile = UserProfile {
        target_percentile: target.or(config.profile.target_percentile),
        ..config.profile.clone()
    };

    if profile.target_percentile.is_none() {
        println!(
            "{}",
            "No target percentile set. Use `hrvtrack config --target <1-99>`.".yellow()
        );
        return Ok(());
    }

    let readings = load_readings(config)?;
    let Some(progress) = GoalTracker::calculate_goal_progress(&readings, &profile) else {
        println!("{}", "No readings in the last 7 days.".yellow());
        return Ok(());
    };

    println!("{}", "Goal progress".cyan().bold());
    println!("  Target:       {} ms", progress.target_hrv);
    println!("  7-day avg:    {} ms", progress.current_hrv);
    println!("  Progress:     {}%", progress.progress.to_string().bold());
    println!("  Days at goal: {}", progress.days_at_goal);
    println!("  Trend:        {}", format_trend(progress.trend));
    Ok(())
}

fn run_recommend(config: &AppConfig) -> Result<()> {
    let readings = load_readings(config)?;
    let Some(rec) = recommend(&readings) else {
        println!("{}", "No readings yet.".yellow());
        return Ok(());
    };

    let intensity = match rec.intensity {
        TrainingIntensity::Push => rec.intensity.to_string().green().bold(),
        TrainingIntensity::Maintain => rec.intensity.to_string().cyan().bold(),
        TrainingIntensity::Easy => rec.intensity.to_string().yellow().bold(),
        TrainingIntensity::Rest => rec.intensity.to_string().red().bold(),
    };

    println!("{} ({})", intensity, rec.date);
    println!("  {:+.1}% vs 7-day baseline", rec.deviation_pct);
    println!("  {}", rec.message);
    Ok(())
}

fn run_config(
    config: &mut AppConfig,
    config_path: &Path,
    age: Option<u32>,
    gender: Option<Gender>,
    target: Option<u8>,
    clear_target: bool,
) -> Result<()> {
    let changed = age.is_some() || gender.is_some() || target.is_some() || clear_target;

    if changed {
        let mut profile = config.profile.clone();
        if let Some(age) = age {
            profile.age = age;
        }
        if let Some(gender) = gender {
            profile.gender = gender;
        }
        if target.is_some() {
            profile.target_percentile = target;
        }
        if clear_target {
            profile.target_percentile = None;
        }

        config.set_profile(profile)?;
        config.save_to_file(config_path)?;
        println!("{}", "✓ Configuration updated".green());
    }

    println!("{}", "Configuration".white().bold());
    println!("  File:        {}", config_path.display());
    println!("  Data dir:    {}", config.settings.data_dir.display());
    println!("  Age:         {}", config.profile.age);
    println!("  Gender:      {}", config.profile.gender);
    println!(
        "  Target:      {}",
        config
            .profile
            .target_percentile
            .map(|t| format!("p{}", t))
            .unwrap_or_else(|| "-".to_string())
    );
    Ok(())
}
