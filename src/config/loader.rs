//! Configuration Loader
//!
//! Environment-aware configuration loading. Sources are layered with the `config`
//! crate so later sources override earlier ones.

use super::error::{ConfigResult, ConfigurationError};
use super::BoardConfig;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

const ENV_PREFIX: &str = "BOARD";
const ENV_SEPARATOR: &str = "__";
const BASE_FILE: &str = "board.toml";

/// Loaded configuration together with where it came from
#[derive(Debug)]
pub struct ConfigManager {
    config: BoardConfig,
    environment: String,
    config_directory: PathBuf,
}

impl ConfigManager {
    /// Load configuration with environment auto-detection
    pub fn load() -> ConfigResult<Arc<ConfigManager>> {
        Self::load_from_directory(None)
    }

    /// Load configuration from a specific directory
    pub fn load_from_directory(config_dir: Option<PathBuf>) -> ConfigResult<Arc<ConfigManager>> {
        let environment = Self::detect_environment();
        Self::load_from_directory_with_env(config_dir, &environment)
    }

    /// Load configuration from a specific directory with explicit environment.
    /// Useful for tests that should not touch process-wide environment variables.
    pub fn load_from_directory_with_env(
        config_dir: Option<PathBuf>,
        environment: &str,
    ) -> ConfigResult<Arc<ConfigManager>> {
        let config_directory = config_dir.unwrap_or_else(|| PathBuf::from("config"));

        debug!(
            environment = %environment,
            directory = %config_directory.display(),
            "Loading board configuration"
        );

        let config = Self::load_and_merge_config(&config_directory, environment)?;
        config.validate()?;

        debug!(
            pipelines_topic = %config.events.pipelines_topic,
            min_gap = config.ordering.min_gap,
            "Board configuration loaded"
        );

        Ok(Arc::new(ConfigManager {
            config,
            environment: environment.to_string(),
            config_directory,
        }))
    }

    /// Wrap an already-built configuration (tests, embedding applications)
    pub fn from_config(config: BoardConfig) -> ConfigResult<Arc<ConfigManager>> {
        config.validate()?;
        Ok(Arc::new(ConfigManager {
            config,
            environment: Self::detect_environment(),
            config_directory: PathBuf::from("config"),
        }))
    }

    pub fn config(&self) -> &BoardConfig {
        &self.config
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn config_directory(&self) -> &Path {
        &self.config_directory
    }

    /// Detect the current environment from environment variables
    pub fn detect_environment() -> String {
        env::var("BOARD_ENV")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string())
    }

    fn load_and_merge_config(directory: &Path, environment: &str) -> ConfigResult<BoardConfig> {
        let defaults = config::Config::try_from(&BoardConfig::default())
            .map_err(|e| ConfigurationError::load_error("defaults", e))?;

        let base_path = directory.join(BASE_FILE);
        let env_path = directory.join(format!("board.{environment}.toml"));

        let merged = config::Config::builder()
            .add_source(defaults)
            .add_source(config::File::from(base_path).required(false))
            .add_source(config::File::from(env_path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator(ENV_SEPARATOR)
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| ConfigurationError::load_error(directory.display().to_string(), e))?;

        merged
            .try_deserialize::<BoardConfig>()
            .map_err(ConfigurationError::deserialize_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_missing_directory_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let manager =
            ConfigManager::load_from_directory_with_env(Some(dir.path().join("absent")), "test")
                .unwrap();
        assert_eq!(manager.config(), &BoardConfig::default());
        assert_eq!(manager.environment(), "test");
    }

    #[test]
    fn test_environment_file_overrides_base() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("board.toml"),
            "[ordering]\nmin_gap = 0.001\nrenumber_step = 10.0\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("board.test.toml"),
            "[ordering]\nrenumber_step = 100.0\n",
        )
        .unwrap();

        let manager =
            ConfigManager::load_from_directory_with_env(Some(dir.path().to_path_buf()), "test")
                .unwrap();

        assert_eq!(manager.config().ordering.min_gap, 0.001);
        assert_eq!(manager.config().ordering.renumber_step, 100.0);
        assert_eq!(manager.config().events.pipelines_topic, "pipelinesChanged");
    }

    #[test]
    fn test_invalid_file_value_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("board.toml"),
            "[events]\nchannel_capacity = 0\n",
        )
        .unwrap();

        let result =
            ConfigManager::load_from_directory_with_env(Some(dir.path().to_path_buf()), "test");
        assert!(matches!(
            result,
            Err(ConfigurationError::InvalidValue { .. })
        ));
    }
}
