use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::logging::LogConfig;
use crate::models::UserProfile;
use crate::repository::DEFAULT_COLLECTION_KEY;
use crate::store::FileStore;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application metadata
    pub metadata: ConfigMetadata,

    /// General application settings
    pub settings: AppSettings,

    /// Profile used for percentile and goal calculations
    #[serde(default)]
    pub profile: UserProfile,

    /// Data import preferences
    #[serde(default)]
    pub import: ImportSettings,

    /// Logging output
    #[serde(default)]
    pub logging: LogConfig,
}

/// Configuration metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigMetadata {
    /// Configuration format version
    pub version: String,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last modification timestamp
    pub updated_at: DateTime<Utc>,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    /// Directory holding the persisted collections
    pub data_dir: PathBuf,
}

/// Data import preferences
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportSettings {
    /// File extensions picked up by directory imports
    pub supported_formats: Vec<String>,

    /// Store key of the reading collection
    pub collection_key: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        let now = Utc::now();

        AppConfig {
            metadata: ConfigMetadata {
                version: "1.0".to_string(),
                created_at: now,
                updated_at: now,
            },
            settings: AppSettings::default(),
            profile: UserProfile::default(),
            import: ImportSettings::default(),
            logging: LogConfig::default(),
        }
    }
}

impl Default for AppSettings {
    fn default() -> Self {
        AppSettings {
            data_dir: FileStore::default_root(),
        }
    }
}

impl Default for ImportSettings {
    fn default() -> Self {
        ImportSettings {
            supported_formats: vec!["csv".to_string()],
            collection_key: DEFAULT_COLLECTION_KEY.to_string(),
        }
    }
}

impl ImportSettings {
    /// Whether `path` has one of the configured extensions
    pub fn accepts(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                self.supported_formats
                    .iter()
                    .any(|f| f.eq_ignore_ascii_case(ext))
            })
            .unwrap_or(false)
    }
}

/// Configuration management implementation
impl AppConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: AppConfig = toml::from_str(&content)
            .with_context(|| "Failed to parse TOML configuration")?;

        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.metadata.updated_at = Utc::now();

        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
        }

        let toml_content = toml::to_string_pretty(self)
            .with_context(|| "Failed to serialize configuration to TOML")?;

        fs::write(&path, toml_content)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        Ok(())
    }

    /// Get default configuration file path
    pub fn default_config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".hrvtrack")
            .join("config.toml")
    }

    /// Load configuration from `path`, or defaults plus the load error.
    ///
    /// Nothing is logged here, so the caller can report the error after
    /// the subscriber is installed.
    pub fn load_or_fallback<P: AsRef<Path>>(path: P) -> (Self, Option<anyhow::Error>) {
        match Self::load_from_file(&path) {
            Ok(config) => (config, None),
            Err(e) => (Self::default(), Some(e)),
        }
    }

    /// Load configuration from `path`, falling back to defaults when it
    /// is missing or unreadable
    pub fn load_or_default_from<P: AsRef<Path>>(path: P) -> Self {
        let (config, error) = Self::load_or_fallback(&path);
        if let Some(e) = error {
            tracing::warn!(
                path = %path.as_ref().display(),
                error = %e,
                "Config file not loaded, using defaults"
            );
        }
        config
    }

    /// Load configuration with fallback to defaults
    pub fn load_or_default() -> Self {
        Self::load_or_default_from(Self::default_config_path())
    }

    /// Replace the profile, validating the target percentile range
    pub fn set_profile(&mut self, profile: UserProfile) -> Result<()> {
        if let Some(target) = profile.target_percentile {
            if !(1..=99).contains(&target) {
                anyhow::bail!("Target percentile must be between 1 and 99, got {}", target);
            }
        }

        self.profile = profile;
        self.metadata.updated_at = Utc::now();
        Ok(())
    }

    /// File-backed store rooted at the configured data directory
    pub fn open_store(&self) -> FileStore {
        FileStore::new(&self.settings.data_dir)
    }
}
