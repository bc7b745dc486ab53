//! # Store Traits
//!
//! Persistence contract for the board core. Implementations only need to offer
//! the document operations below; ordering, status and event logic stays in the
//! callers.

use async_trait::async_trait;
use uuid::Uuid;

use crate::conformity::{ConformityLink, ConformityType};
use crate::error::BoardResult;
use crate::models::{
    ActivityLog, Board, BoardItem, Checklist, ImportHistory, ImportIncrement, ImportStatus,
    ItemType, Pipeline, Stage,
};
use crate::ordering::OrderSlot;
use crate::state_machine::ItemStatus;

/// Filter for board item queries. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemFilter {
    pub item_type: Option<ItemType>,
    pub stage_id: Option<Uuid>,
    pub status: Option<ItemStatus>,
    /// Only items with `order` strictly below this value
    pub order_below: Option<f64>,
    pub exclude_id: Option<Uuid>,
}

impl ItemFilter {
    /// Active items of one type in one stage
    pub fn active_in_stage(item_type: ItemType, stage_id: Uuid) -> Self {
        Self {
            item_type: Some(item_type),
            stage_id: Some(stage_id),
            status: Some(ItemStatus::Active),
            ..Self::default()
        }
    }

    /// Every item of one type in one stage, archived included
    pub fn in_stage(item_type: ItemType, stage_id: Uuid) -> Self {
        Self {
            item_type: Some(item_type),
            stage_id: Some(stage_id),
            ..Self::default()
        }
    }

    pub fn excluding(mut self, id: Uuid) -> Self {
        self.exclude_id = Some(id);
        self
    }

    pub fn below(mut self, order: f64) -> Self {
        self.order_below = Some(order);
        self
    }

    pub fn matches(&self, item: &BoardItem) -> bool {
        self.item_type.map_or(true, |t| item.item_type == t)
            && self.stage_id.map_or(true, |s| item.stage_id == s)
            && self.status.map_or(true, |s| item.status == s)
            && self.order_below.map_or(true, |o| item.order < o)
            && self.exclude_id.map_or(true, |id| item.id != id)
    }
}

/// Document collections for boards, items and their relation records
#[async_trait]
pub trait BoardStore: Send + Sync + 'static {
    async fn insert_board(&self, board: Board) -> BoardResult<()>;
    async fn insert_pipeline(&self, pipeline: Pipeline) -> BoardResult<()>;
    async fn insert_stage(&self, stage: Stage) -> BoardResult<()>;

    async fn find_board(&self, id: Uuid) -> BoardResult<Option<Board>>;
    async fn find_pipeline(&self, id: Uuid) -> BoardResult<Option<Pipeline>>;
    async fn find_stage(&self, id: Uuid) -> BoardResult<Option<Stage>>;
    async fn find_stage_by_name(&self, name: &str) -> BoardResult<Option<Stage>>;

    async fn find_item(&self, id: Uuid) -> BoardResult<Option<BoardItem>>;

    /// Items matching `filter`, ascending by order with a stable tie-break
    async fn find_items(&self, filter: &ItemFilter) -> BoardResult<Vec<BoardItem>>;

    async fn count_items(&self, filter: &ItemFilter) -> BoardResult<u64>;

    async fn insert_item(&self, item: BoardItem) -> BoardResult<()>;

    /// Replace the stored document with the same id
    async fn update_item(&self, item: &BoardItem) -> BoardResult<()>;

    async fn delete_item(&self, id: Uuid) -> BoardResult<Option<BoardItem>>;

    /// Bulk write of `order` values for items of one stage
    async fn update_orders(&self, stage_id: Uuid, orders: &[OrderSlot]) -> BoardResult<u64>;

    /// Bulk status change for every item of one type in a stage
    async fn set_stage_status(
        &self,
        item_type: ItemType,
        stage_id: Uuid,
        status: ItemStatus,
    ) -> BoardResult<u64>;

    async fn insert_conformity(&self, link: ConformityLink) -> BoardResult<()>;

    /// Links touching the record on either side
    async fn find_conformities(
        &self,
        kind: ConformityType,
        id: Uuid,
    ) -> BoardResult<Vec<ConformityLink>>;

    /// Drop every link touching the record on either side
    async fn remove_conformities(&self, kind: ConformityType, id: Uuid) -> BoardResult<u64>;

    /// Drop links between `main` and the listed related records
    async fn remove_conformities_between(
        &self,
        main_type: ConformityType,
        main_type_id: Uuid,
        rel_type: ConformityType,
        rel_ids: &[Uuid],
    ) -> BoardResult<u64>;

    async fn insert_checklist(&self, checklist: Checklist) -> BoardResult<()>;
    async fn find_checklists(
        &self,
        content_type: &str,
        content_type_id: Uuid,
    ) -> BoardResult<Vec<Checklist>>;
    async fn remove_checklists(&self, content_type: &str, content_type_id: Uuid)
        -> BoardResult<u64>;

    async fn insert_activity_log(&self, log: ActivityLog) -> BoardResult<()>;
    async fn find_activity_logs(&self, content_id: Uuid) -> BoardResult<Vec<ActivityLog>>;
    async fn remove_activity_logs(&self, content_id: Uuid) -> BoardResult<u64>;
}

/// Progress records of bulk import runs
#[async_trait]
pub trait ImportHistoryStore: Send + Sync + 'static {
    async fn insert_import_history(&self, history: ImportHistory) -> BoardResult<()>;

    async fn find_import_history(&self, id: Uuid) -> BoardResult<Option<ImportHistory>>;

    /// Apply counters, created id and error messages; returns the updated record
    async fn apply_import_increment(
        &self,
        id: Uuid,
        increment: ImportIncrement,
    ) -> BoardResult<ImportHistory>;

    async fn set_import_status(
        &self,
        id: Uuid,
        status: ImportStatus,
        percentage: Option<f64>,
    ) -> BoardResult<ImportHistory>;
}
