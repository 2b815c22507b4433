// Library interface for hrvtrack modules
// This allows integration tests and the CLI to access the core functionality

pub mod benchmarks;
pub mod config;
pub mod error;
pub mod goals;
pub mod import;
pub mod logging;
pub mod models;
pub mod percentile;
pub mod recommendation;
pub mod repository;
pub mod statistics;
pub mod store;

// Re-export commonly used types for convenience
pub use models::*;
pub use benchmarks::{AgeBracket, Benchmark};
pub use statistics::StatisticsEngine;
pub use percentile::{PercentileEngine, PercentileResult};
pub use goals::GoalTracker;
pub use recommendation::{Recommendation, TrainingIntensity};
pub use repository::{HydratedRepository, ReadingRepository, RepositoryState};
pub use store::{FileStore, KeyValueStore, MemoryStore};
pub use import::{parse_whoop_csv, validate_whoop_csv, CsvValidation, ImportManager, ParseOutcome};
pub use error::{HrvTrackError, Result};
pub use logging::{LogConfig, LogLevel, LogFormat};
