//! Unified error hierarchy for hrvtrack
//!
//! Expected data-quality conditions (skipped rows, missing preconditions,
//! degenerate arithmetic) are modelled as values elsewhere in the crate.
//! The types here cover the genuinely exceptional paths: unreadable files,
//! broken stores and invalid manual input.

use thiserror::Error;

/// Top-level error type for all hrvtrack operations
#[derive(Debug, Error)]
pub enum HrvTrackError {
    /// Data validation errors (manual entry, profile values)
    #[error("Validation error: {0}")]
    Validation(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Import/export errors
    #[error("Import/Export error: {0}")]
    ImportExport(#[from] ImportExportError),

    /// Key-value store and repository lifecycle errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// JSON (de)serialization of persisted collections
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Import and export errors
#[derive(Debug, Error)]
pub enum ImportExportError {
    /// Unsupported format
    #[error("Unsupported format: {format}")]
    UnsupportedFormat { format: String },

    /// Header row lacks a required column
    #[error("Missing required column \"{column}\". Please upload a WHOOP physiological_cycles.csv export")]
    MissingColumn { column: String },

    /// Invalid data structure
    #[error("Invalid data structure: {reason}")]
    InvalidStructure { reason: String },
}

/// Store and repository lifecycle errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// Repository accessed before hydration completed
    #[error("Repository not ready (state: {state})")]
    NotReady { state: String },

    /// Underlying storage backend failed
    #[error("Storage backend failure: {reason}")]
    Backend { reason: String },

    /// Persisted value could not be decoded
    #[error("Corrupt value for key {key}: {reason}")]
    Corrupt { key: String, reason: String },
}

/// Result type alias for hrvtrack operations
pub type Result<T> = std::result::Result<T, HrvTrackError>;

impl HrvTrackError {
    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            HrvTrackError::Store(StoreError::Backend { .. })
                | HrvTrackError::Store(StoreError::NotReady { .. })
                | HrvTrackError::Io(_)
        )
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            HrvTrackError::Validation(_) => ErrorSeverity::Warning,
            HrvTrackError::ImportExport(ImportExportError::MissingColumn { .. }) => {
                ErrorSeverity::Warning
            }
            HrvTrackError::Store(StoreError::NotReady { .. }) => ErrorSeverity::Info,
            HrvTrackError::Store(StoreError::Corrupt { .. }) => ErrorSeverity::Critical,
            _ => ErrorSeverity::Error,
        }
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            HrvTrackError::ImportExport(ImportExportError::MissingColumn { column }) => {
                format!(
                    "This file is missing the \"{}\" column. Export physiological_cycles.csv from the WHOOP app and try again.",
                    column
                )
            }
            HrvTrackError::ImportExport(ImportExportError::UnsupportedFormat { format }) => {
                format!("Files of type \"{}\" cannot be imported", format)
            }
            HrvTrackError::Store(StoreError::NotReady { .. }) => {
                "Your readings are still loading. Please try again in a moment.".to_string()
            }
            HrvTrackError::Store(StoreError::Corrupt { .. }) => {
                "Saved readings could not be read. Re-import your data to rebuild them."
                    .to_string()
            }
            _ => self.to_string(),
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Critical error, persisted data may be unusable
    Critical,
    /// Error that prevents operation but system can continue
    Error,
    /// Warning that doesn't prevent operation
    Warning,
    /// Informational message
    Info,
}

impl ErrorSeverity {
    /// Convert to tracing level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            ErrorSeverity::Critical => tracing::Level::ERROR,
            ErrorSeverity::Error => tracing::Level::ERROR,
            ErrorSeverity::Warning => tracing::Level::WARN,
            ErrorSeverity::Info => tracing::Level::INFO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_severity() {
        let err = HrvTrackError::ImportExport(ImportExportError::MissingColumn {
            column: "Cycle start time".to_string(),
        });
        assert_eq!(err.severity(), ErrorSeverity::Warning);

        assert_eq!(err.severity().to_tracing_level(), tracing::Level::WARN);

        let err = HrvTrackError::Store(StoreError::Corrupt {
            key: "hrv-readings".to_string(),
            reason: "expected value".to_string(),
        });
        assert_eq!(err.severity(), ErrorSeverity::Critical);
        assert_eq!(err.severity().to_tracing_level(), tracing::Level::ERROR);
        assert!(!err.is_retryable());

        let err = HrvTrackError::Store(StoreError::NotReady {
            state: "loading".to_string(),
        });
        assert_eq!(err.severity().to_tracing_level(), tracing::Level::INFO);
    }

    #[test]
    fn test_error_retryable() {
        let err = HrvTrackError::Store(StoreError::NotReady {
            state: "loading".to_string(),
        });
        assert!(err.is_retryable());

        let err = HrvTrackError::Validation("test".to_string());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_user_messages() {
        let err = HrvTrackError::ImportExport(ImportExportError::MissingColumn {
            column: "Heart rate variability (ms)".to_string(),
        });
        let message = err.user_message();
        assert!(message.contains("Heart rate variability (ms)"));
        assert!(message.contains("physiological_cycles.csv"));
    }

    #[test]
    fn test_missing_column_display_names_export() {
        let err = ImportExportError::MissingColumn {
            column: "Cycle start time".to_string(),
        };
        assert!(err.to_string().contains("Cycle start time"));
        assert!(err.to_string().contains("WHOOP"));
    }
}
