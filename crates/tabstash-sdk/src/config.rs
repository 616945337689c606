//! SDK Configuration
//!
//! Configuration is loaded from (in order of precedence):
//! 1. The file named by `TABSTASH_CONFIG`
//! 2. `<config dir>/tabstash/config.toml`
//! 3. Built-in defaults
//!
//! Every section and field is optional in the file.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use tabstash_core::placement::{LOCAL_TOTAL_QUOTA, SYNC_ITEM_QUOTA, SYNC_TOTAL_QUOTA};
use tabstash_core::recycle::RETENTION_DAYS;
use tabstash_core::PlacementLimits;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "TABSTASH_CONFIG";

/// SDK configuration options
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StashConfig {
    /// Tier quota budgets
    pub placement: PlacementConfig,

    /// Recycle bin retention and undo
    pub recycle_bin: RecycleBinConfig,

    /// Background promotion scheduling
    pub promotion: PromotionConfig,

    /// Backing store selection
    pub storage: StorageConfig,

    /// Log output
    pub logging: LoggingConfig,
}

/// Quota budgets used when the storage areas don't report their own
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementConfig {
    /// Largest collection placed in sync (default: 8000)
    pub sync_item_quota_bytes: u64,

    /// Sync tier total (default: 102400)
    pub sync_total_quota_bytes: u64,

    /// Local tier total (default: 5242880)
    pub local_total_quota_bytes: u64,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            sync_item_quota_bytes: SYNC_ITEM_QUOTA,
            sync_total_quota_bytes: SYNC_TOTAL_QUOTA,
            local_total_quota_bytes: LOCAL_TOTAL_QUOTA,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecycleBinConfig {
    /// Days a deleted item is kept (default: 7)
    pub retention_days: i64,

    /// Seconds an undo notice stays open (default: 30)
    pub undo_window_secs: u64,
}

impl Default for RecycleBinConfig {
    fn default() -> Self {
        Self {
            retention_days: RETENTION_DAYS,
            undo_window_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromotionConfig {
    /// Seconds between promotion rounds (default: 300 = 5 minutes)
    pub interval_secs: u64,

    /// Delay of the extra round after a local save (default: 2000)
    pub post_save_delay_ms: u64,

    /// Schedule the extra round at all (default: true)
    pub trigger_after_local_save: bool,
}

impl Default for PromotionConfig {
    fn default() -> Self {
        Self {
            interval_secs: 300, // 5 minutes
            post_save_delay_ms: 2000,
            trigger_after_local_save: true,
        }
    }
}

/// Backing store kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// In-process, lost on exit
    Memory,
    /// SQLite file at `storage.database_path`
    #[default]
    Sqlite,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,

    /// Database file for the sqlite backend
    pub database_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            database_path: default_data_dir().join("tabstash.db"),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset (default: "tabstash=info")
    pub directive: String,

    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directive: "tabstash=info".to_string(),
            format: LogFormat::default(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("tabstash"))
        .unwrap_or_else(|| PathBuf::from(".tabstash"))
}

impl StashConfig {
    /// Load configuration from the config file, falling back to defaults
    /// when there is none.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = toml::from_str(&content).context("Failed to parse config file")?;
        config.validate()?;
        Ok(config)
    }

    /// Get the config file path.
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            PathBuf::from(path)
        } else {
            dirs::config_dir()
                .map(|dir| dir.join("tabstash"))
                .unwrap_or_else(default_data_dir)
                .join("config.toml")
        }
    }

    /// In-memory storage, for tests and ephemeral hosts
    pub fn in_memory() -> Self {
        Self {
            storage: StorageConfig {
                backend: StorageBackend::Memory,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Set the sqlite database path
    pub fn with_database(mut self, path: impl Into<PathBuf>) -> Self {
        self.storage = StorageConfig {
            backend: StorageBackend::Sqlite,
            database_path: path.into(),
        };
        self
    }

    /// Set promotion configuration
    pub fn with_promotion(mut self, promotion: PromotionConfig) -> Self {
        self.promotion = promotion;
        self
    }

    /// Set placement configuration
    pub fn with_placement(mut self, placement: PlacementConfig) -> Self {
        self.placement = placement;
        self
    }

    pub fn placement_limits(&self) -> PlacementLimits {
        PlacementLimits {
            sync_item_quota: self.placement.sync_item_quota_bytes,
            sync_total_quota: self.placement.sync_total_quota_bytes,
            local_total_quota: self.placement.local_total_quota_bytes,
        }
    }

    pub fn promotion_interval(&self) -> Duration {
        Duration::from_secs(self.promotion.interval_secs)
    }

    pub fn post_save_delay(&self) -> Duration {
        Duration::from_millis(self.promotion.post_save_delay_ms)
    }

    pub fn undo_window(&self) -> Duration {
        Duration::from_secs(self.recycle_bin.undo_window_secs)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        let placement = &self.placement;
        for (field, value) in [
            ("placement.sync_item_quota_bytes", placement.sync_item_quota_bytes),
            ("placement.sync_total_quota_bytes", placement.sync_total_quota_bytes),
            ("placement.local_total_quota_bytes", placement.local_total_quota_bytes),
        ] {
            if value == 0 {
                return Err(ConfigValidationError::InvalidValue {
                    field: field.into(),
                    message: "must be greater than 0".into(),
                });
            }
        }

        if placement.sync_item_quota_bytes > placement.sync_total_quota_bytes {
            return Err(ConfigValidationError::InvalidValue {
                field: "placement.sync_item_quota_bytes".into(),
                message: "must not exceed placement.sync_total_quota_bytes".into(),
            });
        }

        if self.recycle_bin.retention_days <= 0 {
            return Err(ConfigValidationError::InvalidValue {
                field: "recycle_bin.retention_days".into(),
                message: "must be greater than 0".into(),
            });
        }

        if self.recycle_bin.undo_window_secs == 0 {
            return Err(ConfigValidationError::InvalidValue {
                field: "recycle_bin.undo_window_secs".into(),
                message: "must be greater than 0".into(),
            });
        }

        if self.promotion.interval_secs == 0 {
            return Err(ConfigValidationError::InvalidValue {
                field: "promotion.interval_secs".into(),
                message: "must be greater than 0".into(),
            });
        }

        if self.storage.backend == StorageBackend::Sqlite
            && self.storage.database_path.as_os_str().is_empty()
        {
            return Err(ConfigValidationError::MissingDatabasePath);
        }

        Ok(())
    }
}

/// Configuration validation errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("storage.database_path is required for the sqlite backend")]
    MissingDatabasePath,

    #[error("invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = StashConfig::default();
        assert_eq!(config.placement.sync_item_quota_bytes, 8000);
        assert_eq!(config.placement.sync_total_quota_bytes, 102_400);
        assert_eq!(config.placement.local_total_quota_bytes, 5_242_880);
        assert_eq!(config.recycle_bin.retention_days, 7);
        assert_eq!(config.undo_window(), Duration::from_secs(30));
        assert_eq!(config.promotion_interval(), Duration::from_secs(300));
        assert_eq!(config.post_save_delay(), Duration::from_secs(2));
        assert!(config.promotion.trigger_after_local_save);
        assert_eq!(config.logging.directive, "tabstash=info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: StashConfig = toml::from_str(
            r#"
            [promotion]
            interval_secs = 60
            trigger_after_local_save = false

            [storage]
            backend = "memory"
            "#,
        )
        .unwrap();

        assert_eq!(config.promotion.interval_secs, 60);
        assert!(!config.promotion.trigger_after_local_save);
        assert_eq!(config.promotion.post_save_delay_ms, 2000);
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert_eq!(config.placement, PlacementConfig::default());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[placement]\nsync_total_quota_bytes = 50000\n\n[logging]\nformat = \"json\""
        )
        .unwrap();

        let config = StashConfig::load_from(file.path()).unwrap();
        assert_eq!(config.placement_limits().sync_total_quota, 50_000);
        assert_eq!(config.placement_limits().sync_item_quota, 8000);
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[recycle_bin]\nretention_days = 0").unwrap();
        let err = StashConfig::load_from(file.path()).unwrap_err();
        assert!(err.to_string().contains("recycle_bin.retention_days"));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[promotion\ninterval_secs = 1").unwrap();
        assert!(StashConfig::load_from(file.path()).is_err());
    }

    #[test]
    fn test_config_validation() {
        let mut config = StashConfig::in_memory();
        assert!(config.validate().is_ok());

        config.placement.sync_item_quota_bytes = 200_000;
        assert!(config.validate().is_err());
        config.placement.sync_item_quota_bytes = 8000;

        config.promotion.interval_secs = 0;
        assert!(config.validate().is_err());
        config.promotion.interval_secs = 300;

        config.recycle_bin.undo_window_secs = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("recycle_bin.undo_window_secs"));
        config.recycle_bin.undo_window_secs = 30;

        let config = config.with_database("");
        assert!(matches!(
            config.validate(),
            Err(ConfigValidationError::MissingDatabasePath)
        ));
    }

    #[test]
    fn test_config_builder() {
        let config = StashConfig::default()
            .with_database("/tmp/stash.db")
            .with_promotion(PromotionConfig {
                interval_secs: 10,
                ..Default::default()
            });

        assert_eq!(config.storage.backend, StorageBackend::Sqlite);
        assert_eq!(config.storage.database_path, PathBuf::from("/tmp/stash.db"));
        assert_eq!(config.promotion_interval(), Duration::from_secs(10));
    }
}
