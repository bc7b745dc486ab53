use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{BoardItem, ItemType};

/// What happened to the item, from a recipient's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NotificationKind {
    Add,
    RemoveAssign,
    Edit,
    Change,
    Delete,
}

impl NotificationKind {
    fn suffix(&self) -> &'static str {
        match self {
            Self::Add => "Add",
            Self::RemoveAssign => "RemoveAssign",
            Self::Edit => "Edit",
            Self::Change => "Change",
            Self::Delete => "Delete",
        }
    }

    /// Notification type name, e.g. `dealAdd` or `ticketRemoveAssign`
    pub fn notif_type(&self, item_type: ItemType) -> String {
        format!("{}{}", item_type.module_name(), self.suffix())
    }
}

/// Message handed to the notification sender
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub created_user: Uuid,
    pub notif_type: String,
    pub title: String,
    pub content: String,
    pub link: String,
    pub receivers: Vec<Uuid>,
}

/// Input to [`super::NotificationDispatcher::notify`]
#[derive(Debug, Clone)]
pub struct NotificationRequest {
    pub item: BoardItem,
    pub acting_user: Uuid,
    pub kind: NotificationKind,
    pub content: String,
    pub invited_users: Option<Vec<Uuid>>,
    pub removed_users: Option<Vec<Uuid>>,
    /// Explicit recipients; defaults to the item's assignees and watchers
    pub recipients: Option<Vec<Uuid>>,
}

impl NotificationRequest {
    pub fn new(
        item: BoardItem,
        acting_user: Uuid,
        kind: NotificationKind,
        content: impl Into<String>,
    ) -> Self {
        Self {
            item,
            acting_user,
            kind,
            content: content.into(),
            invited_users: None,
            removed_users: None,
            recipients: None,
        }
    }

    pub fn with_invited(mut self, users: Vec<Uuid>) -> Self {
        self.invited_users = Some(users);
        self
    }

    pub fn with_removed(mut self, users: Vec<Uuid>) -> Self {
        self.removed_users = Some(users);
        self
    }

    pub fn with_recipients(mut self, users: Vec<Uuid>) -> Self {
        self.recipients = Some(users);
        self
    }
}
