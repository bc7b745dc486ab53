use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::conformity::ConformityType;
use crate::models::{ItemType, ProductData};
use crate::state_machine::ItemStatus;

/// Who is mutating and which client tab asked for it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationContext {
    pub user_id: Uuid,
    /// Opaque token echoed in change events so the caller can skip its own echo
    pub process_id: String,
}

impl MutationContext {
    pub fn new(user_id: Uuid, process_id: impl Into<String>) -> Self {
        Self {
            user_id,
            process_id: process_id.into(),
        }
    }
}

/// Fields of an item to create
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewItem {
    pub item_type: ItemType,
    pub name: String,
    pub stage_id: Uuid,
    #[serde(default)]
    pub assigned_user_ids: Vec<Uuid>,
    #[serde(default)]
    pub watched_user_ids: Vec<Uuid>,
    #[serde(default)]
    pub products_data: Vec<ProductData>,
}

impl NewItem {
    pub fn new(item_type: ItemType, name: impl Into<String>, stage_id: Uuid) -> Self {
        Self {
            item_type,
            name: name.into(),
            stage_id,
            assigned_user_ids: Vec::new(),
            watched_user_ids: Vec::new(),
            products_data: Vec::new(),
        }
    }

    pub fn assigned_to(mut self, users: Vec<Uuid>) -> Self {
        self.assigned_user_ids = users;
        self
    }

    pub fn with_products(mut self, products: Vec<ProductData>) -> Self {
        self.products_data = products;
        self
    }
}

/// Partial update of an item; `None` leaves the field untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemChanges {
    pub name: Option<String>,
    pub status: Option<ItemStatus>,
    pub assigned_user_ids: Option<Vec<Uuid>>,
    pub products_data: Option<Vec<ProductData>>,
}

impl ItemChanges {
    pub fn status(status: ItemStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn assignees(users: Vec<Uuid>) -> Self {
        Self {
            assigned_user_ids: Some(users),
            ..Self::default()
        }
    }

    pub fn rename(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }
}

/// Drag-and-drop of one item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeStageRequest {
    pub item_id: Uuid,
    pub destination_stage_id: Uuid,
    pub above_item_id: Option<Uuid>,
    pub source_stage_id: Option<Uuid>,
}

impl ChangeStageRequest {
    pub fn new(item_id: Uuid, destination_stage_id: Uuid) -> Self {
        Self {
            item_id,
            destination_stage_id,
            above_item_id: None,
            source_stage_id: None,
        }
    }

    pub fn above(mut self, above_item_id: Uuid) -> Self {
        self.above_item_id = Some(above_item_id);
        self
    }

    pub fn from_stage(mut self, source_stage_id: Uuid) -> Self {
        self.source_stage_id = Some(source_stage_id);
        self
    }
}

/// Replacement of one relation type on an item
#[derive(Debug, Clone, PartialEq)]
pub struct ConformityEdit {
    pub rel_type: ConformityType,
    pub rel_ids: Vec<Uuid>,
}
