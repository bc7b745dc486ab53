//! Error types for the board core.
//!

use crate::config::ConfigurationError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BoardError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Persistence error: {0}")]
    PersistenceError(String),
    #[error("Publish error: {0}")]
    PublishError(String),
    #[error("Notification error: {0}")]
    NotificationError(String),
    #[error("Import error: {0}")]
    ImportError(String),
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

impl BoardError {
    /// Shorthand for a missing entity
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<serde_json::Error> for BoardError {
    fn from(error: serde_json::Error) -> Self {
        BoardError::ValidationError(format!("JSON serialization error: {error}"))
    }
}

#[cfg(feature = "postgres")]
impl From<sqlx::Error> for BoardError {
    fn from(err: sqlx::Error) -> Self {
        BoardError::PersistenceError(err.to_string())
    }
}

impl From<ConfigurationError> for BoardError {
    fn from(err: ConfigurationError) -> Self {
        BoardError::ConfigurationError(err.to_string())
    }
}

pub type BoardResult<T> = std::result::Result<T, BoardError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let err = BoardError::not_found("Stage", "abc");
        assert_eq!(err.to_string(), "Stage not found: abc");
        assert!(err.is_not_found());
    }

    #[test]
    fn test_json_error_maps_to_validation() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: BoardError = json_err.into();
        assert!(matches!(err, BoardError::ValidationError(_)));
    }
}
