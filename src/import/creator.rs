//! # Item Creators
//!
//! One [`ItemCreator`] per importable content type. Board content types share
//! [`BoardItemCreator`]; contacts and products are created by whatever system
//! owns them and are plugged into the [`ItemCreatorRegistry`] by the caller.

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

use super::staging::StagedRecord;
use crate::conformity::ConformityType;
use crate::models::{BoardItem, ItemType};
use crate::ordering::SequentialOrder;
use crate::state_machine::ItemStatus;
use crate::store::BoardStore;

/// Content types the bulk import accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ContentType {
    Company,
    Customer,
    Product,
    Deal,
    Task,
    Ticket,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Company => "company",
            Self::Customer => "customer",
            Self::Product => "product",
            Self::Deal => "deal",
            Self::Task => "task",
            Self::Ticket => "ticket",
        }
    }

    pub fn item_type(&self) -> Option<ItemType> {
        match self {
            Self::Deal => Some(ItemType::Deal),
            Self::Task => Some(ItemType::Task),
            Self::Ticket => Some(ItemType::Ticket),
            Self::Company | Self::Customer | Self::Product => None,
        }
    }

    pub fn is_board_item(&self) -> bool {
        self.item_type().is_some()
    }

    /// Side of a conformity link this content type sits on, if it can be linked
    pub fn conformity_type(&self) -> Option<ConformityType> {
        match self {
            Self::Company => Some(ConformityType::Company),
            Self::Customer => Some(ConformityType::Customer),
            Self::Product => None,
            Self::Deal => Some(ConformityType::Deal),
            Self::Task => Some(ConformityType::Task),
            Self::Ticket => Some(ConformityType::Ticket),
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ContentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "company" => Ok(Self::Company),
            "customer" => Ok(Self::Customer),
            "product" => Ok(Self::Product),
            "deal" => Ok(Self::Deal),
            "task" => Ok(Self::Task),
            "ticket" => Ok(Self::Ticket),
            _ => Err(format!("Unsupported content type \"{s}\"")),
        }
    }
}

/// Creates one record of a content type from a staged import row
#[async_trait]
pub trait ItemCreator: Send + Sync + 'static {
    /// Returns the id of the created record. Error messages end up verbatim in
    /// the import history, except the duplicate errors the worker enriches.
    async fn create(&self, record: &StagedRecord, user_id: Uuid) -> anyhow::Result<Uuid>;
}

/// Creators keyed by content type.
///
/// Build a fresh registry per import run: [`BoardItemCreator`] keeps its
/// sequential order counters for its whole lifetime.
#[derive(Clone, Default)]
pub struct ItemCreatorRegistry {
    creators: HashMap<ContentType, Arc<dyn ItemCreator>>,
}

impl fmt::Debug for ItemCreatorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ItemCreatorRegistry")
            .field("content_types", &self.content_types())
            .finish()
    }
}

impl ItemCreatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with deal, task and ticket creators sharing one order sequence
    pub fn with_board_items(store: Arc<dyn BoardStore>) -> Self {
        let sequence = Arc::new(SequentialOrder::new());
        let mut registry = Self::new();
        for (content_type, item_type) in [
            (ContentType::Deal, ItemType::Deal),
            (ContentType::Task, ItemType::Task),
            (ContentType::Ticket, ItemType::Ticket),
        ] {
            registry.register(
                content_type,
                Arc::new(BoardItemCreator::new(store.clone(), item_type, sequence.clone())),
            );
        }
        registry
    }

    pub fn register(&mut self, content_type: ContentType, creator: Arc<dyn ItemCreator>) {
        self.creators.insert(content_type, creator);
    }

    pub fn get(&self, content_type: ContentType) -> Option<Arc<dyn ItemCreator>> {
        self.creators.get(&content_type).cloned()
    }

    pub fn content_types(&self) -> Vec<ContentType> {
        let mut types: Vec<ContentType> = self.creators.keys().copied().collect();
        types.sort_by_key(|t| t.as_str());
        types
    }
}

/// Creates board items with sequential per-stage orders
pub struct BoardItemCreator {
    store: Arc<dyn BoardStore>,
    item_type: ItemType,
    sequence: Arc<SequentialOrder>,
}

impl fmt::Debug for BoardItemCreator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoardItemCreator")
            .field("item_type", &self.item_type)
            .field("sequence", &self.sequence)
            .finish()
    }
}

impl BoardItemCreator {
    pub fn new(store: Arc<dyn BoardStore>, item_type: ItemType, sequence: Arc<SequentialOrder>) -> Self {
        Self {
            store,
            item_type,
            sequence,
        }
    }
}

#[async_trait]
impl ItemCreator for BoardItemCreator {
    async fn create(&self, record: &StagedRecord, user_id: Uuid) -> anyhow::Result<Uuid> {
        let stage_id = record
            .stage_id
            .ok_or_else(|| anyhow!("Stage not found"))?;

        let creator = record.user_id.unwrap_or(user_id);
        let assigned_user_ids = record.user_refs.values().copied().collect::<Vec<_>>();
        let now = Utc::now();

        let item = BoardItem {
            id: Uuid::new_v4(),
            item_type: self.item_type,
            name: record.field("name").unwrap_or_default().to_string(),
            stage_id,
            initial_stage_id: Some(stage_id),
            order: self.sequence.next(stage_id),
            status: ItemStatus::Active,
            assigned_user_ids,
            watched_user_ids: vec![creator],
            products_data: Vec::new(),
            user_id: Some(creator),
            created_at: now,
            modified_at: now,
            modified_by: Some(creator),
        };

        let id = item.id;
        self.store.insert_item(item).await?;

        Ok(id)
    }
}
