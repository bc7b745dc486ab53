use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Audit entry attached to a board item; removed together with the item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLog {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub content_type: String,
    pub content_id: Uuid,
    pub action: String,
    pub user_id: Uuid,
    pub content: Value,
    pub created_at: DateTime<Utc>,
}

impl ActivityLog {
    pub fn new(
        content_type: impl Into<String>,
        content_id: Uuid,
        action: impl Into<String>,
        user_id: Uuid,
        content: Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            content_type: content_type.into(),
            content_id,
            action: action.into(),
            user_id,
            content,
            created_at: Utc::now(),
        }
    }
}

/// Checklist owned by a board item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Checklist {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub content_type: String,
    pub content_type_id: Uuid,
    pub title: String,
}

impl Checklist {
    pub fn new(content_type: impl Into<String>, content_type_id: Uuid, title: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            content_type: content_type.into(),
            content_type_id,
            title: title.into(),
        }
    }
}
