use serde::{Deserialize, Serialize};

use super::states::ItemStatus;

/// Events that can trigger item status transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ItemEvent {
    /// Take the item off the board
    Archive,
    /// Put an archived item back on the board
    Restore,
}

impl ItemEvent {
    /// Get a string representation of the event type for logging
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Archive => "archive",
            Self::Restore => "restore",
        }
    }

    /// Activity log action recorded for this event
    pub fn activity_action(&self) -> &'static str {
        match self {
            Self::Archive => crate::constants::activity::ARCHIVED,
            Self::Restore => crate::constants::activity::ACTIVATED,
        }
    }

    /// Event that moves an item into the requested status
    pub fn toward(status: ItemStatus) -> Self {
        match status {
            ItemStatus::Active => Self::Restore,
            ItemStatus::Archived => Self::Archive,
        }
    }
}
