//! Configuration management for flashdeck.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "flashdeck";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "flashdeck.db";

/// Prefix for environment overrides.
const ENV_PREFIX: &str = "FLASHDECK_";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `FLASHDECK_`, `__` between levels)
/// 2. TOML config file at `~/.config/flashdeck/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Facade behaviour.
    pub service: ServiceConfig,
}

/// Which persistence backend the store is constructed with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Transactional `SQLite` database file.
    #[default]
    Sqlite,
    /// Process-local memory; nothing survives exit.
    Memory,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite => write!(f, "sqlite"),
            Self::Memory => write!(f, "memory"),
        }
    }
}

/// Storage-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Backend to use.
    pub backend: BackendKind,
    /// Path to the database file.
    /// Defaults to `~/.local/share/flashdeck/flashdeck.db`
    pub database_path: Option<PathBuf>,
    /// How long a writer waits for another writer's lock, in milliseconds.
    pub busy_timeout_ms: u64,
}

/// Access facade configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Report deletes of unknown ids as not-found instead of succeeding.
    pub strict_deletes: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Sqlite,
            database_path: None, // Will be resolved to default at runtime
            busy_timeout_ms: 5_000,
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.storage.busy_timeout_ms == 0 {
            return Err(Error::ConfigValidation {
                message: "busy_timeout_ms must be greater than 0".to_string(),
            });
        }

        if let Some(path) = &self.storage.database_path {
            if path.as_os_str().is_empty() {
                return Err(Error::ConfigValidation {
                    message: "database_path must not be empty".to_string(),
                });
            }
        }

        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// Get the busy timeout as a Duration.
    #[must_use]
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.storage.busy_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use figment::Jail;

    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.storage.backend, BackendKind::Sqlite);
        assert!(config.storage.database_path.is_none());
        assert_eq!(config.storage.busy_timeout_ms, 5_000);
        assert!(!config.service.strict_deletes);
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_zero_busy_timeout() {
        let mut config = Config::default();
        config.storage.busy_timeout_ms = 0;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("busy_timeout_ms"));
    }

    #[test]
    fn test_validate_empty_database_path() {
        let mut config = Config::default();
        config.storage.database_path = Some(PathBuf::new());

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("database_path"));
    }

    #[test]
    fn test_database_path_default() {
        let path = Config::default().database_path();
        assert!(path.to_string_lossy().contains("flashdeck.db"));
    }

    #[test]
    fn test_database_path_custom() {
        let mut config = Config::default();
        config.storage.database_path = Some(PathBuf::from("/custom/path/db.sqlite"));

        assert_eq!(
            config.database_path(),
            PathBuf::from("/custom/path/db.sqlite")
        );
    }

    #[test]
    fn test_busy_timeout() {
        assert_eq!(Config::default().busy_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_default_config_path() {
        let path = Config::default_config_path();
        assert!(path.to_string_lossy().contains("flashdeck"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }

    #[test]
    fn test_load_nonexistent_config() {
        Jail::expect_with(|_jail| {
            let config = Config::load_from(Some(PathBuf::from("/nonexistent/config.toml")))
                .expect("defaults should load");
            assert_eq!(config, Config::default());
            Ok(())
        });
    }

    #[test]
    fn test_load_from_toml_file() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "flashdeck.toml",
                r#"
                [storage]
                backend = "memory"
                busy_timeout_ms = 250

                [service]
                strict_deletes = true
                "#,
            )?;

            let config = Config::load_from(Some(PathBuf::from("flashdeck.toml")))
                .expect("config should load");
            assert_eq!(config.storage.backend, BackendKind::Memory);
            assert_eq!(config.storage.busy_timeout_ms, 250);
            assert!(config.service.strict_deletes);
            Ok(())
        });
    }

    #[test]
    fn test_env_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file("flashdeck.toml", "[storage]\nbackend = \"memory\"\n")?;
            jail.set_env("FLASHDECK_STORAGE__BACKEND", "sqlite");
            jail.set_env("FLASHDECK_STORAGE__DATABASE_PATH", "/tmp/decks.db");

            let config = Config::load_from(Some(PathBuf::from("flashdeck.toml")))
                .expect("config should load");
            assert_eq!(config.storage.backend, BackendKind::Sqlite);
            assert_eq!(config.database_path(), PathBuf::from("/tmp/decks.db"));
            Ok(())
        });
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        Jail::expect_with(|jail| {
            jail.create_file("flashdeck.toml", "[storage]\nbusy_timeout_ms = 0\n")?;
            let err = Config::load_from(Some(PathBuf::from("flashdeck.toml"))).unwrap_err();
            assert!(matches!(err, Error::ConfigValidation { .. }));
            Ok(())
        });
    }

    #[test]
    fn test_load_rejects_unknown_backend() {
        Jail::expect_with(|jail| {
            jail.create_file("flashdeck.toml", "[storage]\nbackend = \"postgres\"\n")?;
            let err = Config::load_from(Some(PathBuf::from("flashdeck.toml"))).unwrap_err();
            assert!(matches!(err, Error::ConfigLoad(_)));
            Ok(())
        });
    }

    #[test]
    fn test_backend_kind_display() {
        assert_eq!(BackendKind::Sqlite.to_string(), "sqlite");
        assert_eq!(BackendKind::Memory.to_string(), "memory");
    }

    #[test]
    fn test_config_serialize() {
        let json = serde_json::to_string(&Config::default()).unwrap();
        assert!(json.contains("\"backend\":\"sqlite\""));
        assert!(json.contains("strict_deletes"));
    }
}
