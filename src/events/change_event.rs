//! Change events broadcast to realtime board clients.
//!
//! The wire shape is what board clients already consume:
//!
//! ```text
//! { "pipelinesChanged": {
//!     "_id": <pipelineId>,
//!     "proccessId": <opaque string>,
//!     "action": "itemAdd" | "itemRemove" | "itemUpdate" | "orderUpdated",
//!     "data": { "item", "aboveItemId"?, "destinationStageId"?, "oldStageId"? } } }
//! ```

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::actions;
use crate::models::BoardItem;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeAction {
    #[serde(rename = "itemAdd")]
    ItemAdd,
    #[serde(rename = "itemRemove")]
    ItemRemove,
    #[serde(rename = "itemUpdate")]
    ItemUpdate,
    #[serde(rename = "orderUpdated")]
    OrderUpdated,
}

impl ChangeAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ItemAdd => actions::ITEM_ADD,
            Self::ItemRemove => actions::ITEM_REMOVE,
            Self::ItemUpdate => actions::ITEM_UPDATE,
            Self::OrderUpdated => actions::ORDER_UPDATED,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEventData {
    pub item: BoardItem,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub above_item_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_stage_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_stage_id: Option<Uuid>,
}

impl ChangeEventData {
    pub fn item(item: BoardItem) -> Self {
        Self {
            item,
            above_item_id: None,
            destination_stage_id: None,
            old_stage_id: None,
        }
    }

    pub fn above(mut self, above_item_id: Option<Uuid>) -> Self {
        self.above_item_id = above_item_id;
        self
    }

    pub fn destination(mut self, stage_id: Uuid) -> Self {
        self.destination_stage_id = Some(stage_id);
        self
    }

    pub fn old_stage(mut self, stage_id: Uuid) -> Self {
        self.old_stage_id = Some(stage_id);
        self
    }
}

/// One board change, scoped to a pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    #[serde(rename = "_id")]
    pub pipeline_id: Uuid,
    /// Spelling matches what board clients subscribe to
    #[serde(rename = "proccessId")]
    pub process_id: String,
    pub action: ChangeAction,
    pub data: ChangeEventData,
}

/// Envelope keyed by the topic name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelinesChanged {
    pub pipelines_changed: ChangeEvent,
}

/// Import progress pushed while a bulk import runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportProgress {
    #[serde(rename = "_id")]
    pub import_history_id: Uuid,
    pub status: String,
    pub percentage: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportHistoryChanged {
    pub import_history_changed: ImportProgress,
}
