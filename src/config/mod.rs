//! # Board Core Configuration
//!
//! Layered configuration for the board core: compiled-in defaults, an optional
//! `config/board.toml`, an optional environment-specific `config/board.{env}.toml`
//! and finally `BOARD__*` environment variables.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use board_core::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let topic = &manager.config().events.pipelines_topic;
//! let gap = manager.config().ordering.min_gap;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use serde::{Deserialize, Serialize};

use crate::constants::topics;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;

/// Root configuration structure mirroring `config/board.toml`
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct BoardConfig {
    /// Pub/sub topics and channel sizing
    pub events: EventsConfig,

    /// Order assignment tuning
    pub ordering: OrderingConfig,

    /// Notification fan-out switches
    pub notifications: NotificationsConfig,

    /// Bulk import worker settings
    pub import: ImportConfig,

    /// Optional database settings for the Postgres store
    pub database: DatabaseConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct EventsConfig {
    /// Topic carrying board change events
    pub pipelines_topic: String,
    /// Topic carrying import progress events
    pub import_topic: String,
    /// Capacity of the in-process broadcast channel
    pub channel_capacity: usize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            pipelines_topic: topics::PIPELINES_CHANGED.to_string(),
            import_topic: topics::IMPORT_HISTORY_CHANGED.to_string(),
            channel_capacity: 1000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct OrderingConfig {
    /// Smallest gap between two neighbours before the stage gets renumbered
    pub min_gap: f64,
    /// Distance between consecutive items after renumbering
    pub renumber_step: f64,
}

impl Default for OrderingConfig {
    fn default() -> Self {
        Self {
            min_gap: 1e-6,
            renumber_step: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct NotificationsConfig {
    pub enabled: bool,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ImportConfig {
    /// Publish `importHistoryChanged` whenever the rounded percentage moves
    pub progress_events: bool,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            progress_events: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 10,
        }
    }
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            events: EventsConfig::default(),
            ordering: OrderingConfig::default(),
            notifications: NotificationsConfig::default(),
            import: ImportConfig::default(),
            database: DatabaseConfig::default(),
        }
    }
}

impl BoardConfig {
    /// Reject values that would break ordering or event fan-out
    pub fn validate(&self) -> ConfigResult<()> {
        if !(self.ordering.min_gap > 0.0) {
            return Err(ConfigurationError::invalid_value(
                "ordering.min_gap",
                self.ordering.min_gap,
                "must be greater than zero",
            ));
        }

        if !(self.ordering.renumber_step > 0.0) {
            return Err(ConfigurationError::invalid_value(
                "ordering.renumber_step",
                self.ordering.renumber_step,
                "must be greater than zero",
            ));
        }

        if self.ordering.renumber_step <= self.ordering.min_gap * 2.0 {
            return Err(ConfigurationError::invalid_value(
                "ordering.renumber_step",
                self.ordering.renumber_step,
                "must be more than twice ordering.min_gap",
            ));
        }

        if self.events.channel_capacity == 0 {
            return Err(ConfigurationError::invalid_value(
                "events.channel_capacity",
                0,
                "must be greater than zero",
            ));
        }

        for (field, topic) in [
            ("events.pipelines_topic", &self.events.pipelines_topic),
            ("events.import_topic", &self.events.import_topic),
        ] {
            if topic.trim().is_empty() {
                return Err(ConfigurationError::invalid_value(
                    field,
                    topic,
                    "topic name cannot be empty",
                ));
            }
        }

        if self.database.max_connections == 0 {
            return Err(ConfigurationError::invalid_value(
                "database.max_connections",
                0,
                "must be greater than zero",
            ));
        }

        Ok(())
    }
}
