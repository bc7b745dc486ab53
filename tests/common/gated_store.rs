//! Store wrapper that can pause a single item write mid-flight

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::oneshot;
use uuid::Uuid;

use board_core::conformity::{ConformityLink, ConformityType};
use board_core::error::BoardResult;
use board_core::models::{ActivityLog, Board, BoardItem, Checklist, ItemType, Pipeline, Stage};
use board_core::ordering::OrderSlot;
use board_core::state_machine::ItemStatus;
use board_core::store::{BoardStore, InMemoryBoardStore, ItemFilter};

struct Gate {
    item_id: Uuid,
    reached: oneshot::Sender<()>,
    release: oneshot::Receiver<()>,
}

/// Delegates to an [`InMemoryBoardStore`]; `update_item` of a held item waits
/// until the test releases it
pub struct GatedStore {
    inner: Arc<InMemoryBoardStore>,
    gate: Mutex<Option<Gate>>,
}

impl GatedStore {
    pub fn new(inner: Arc<InMemoryBoardStore>) -> Self {
        Self {
            inner,
            gate: Mutex::new(None),
        }
    }

    /// Hold the next `update_item` of `item_id`.
    ///
    /// Returns a receiver that fires once the write is paused and a sender that
    /// lets it continue.
    pub fn hold_update(&self, item_id: Uuid) -> (oneshot::Receiver<()>, oneshot::Sender<()>) {
        let (reached_tx, reached_rx) = oneshot::channel();
        let (release_tx, release_rx) = oneshot::channel();
        *self.gate.lock() = Some(Gate {
            item_id,
            reached: reached_tx,
            release: release_rx,
        });
        (reached_rx, release_tx)
    }
}

#[async_trait]
impl BoardStore for GatedStore {
    async fn insert_board(&self, board: Board) -> BoardResult<()> {
        self.inner.insert_board(board).await
    }

    async fn insert_pipeline(&self, pipeline: Pipeline) -> BoardResult<()> {
        self.inner.insert_pipeline(pipeline).await
    }

    async fn insert_stage(&self, stage: Stage) -> BoardResult<()> {
        self.inner.insert_stage(stage).await
    }

    async fn find_board(&self, id: Uuid) -> BoardResult<Option<Board>> {
        self.inner.find_board(id).await
    }

    async fn find_pipeline(&self, id: Uuid) -> BoardResult<Option<Pipeline>> {
        self.inner.find_pipeline(id).await
    }

    async fn find_stage(&self, id: Uuid) -> BoardResult<Option<Stage>> {
        self.inner.find_stage(id).await
    }

    async fn find_stage_by_name(&self, name: &str) -> BoardResult<Option<Stage>> {
        self.inner.find_stage_by_name(name).await
    }

    async fn find_item(&self, id: Uuid) -> BoardResult<Option<BoardItem>> {
        self.inner.find_item(id).await
    }

    async fn find_items(&self, filter: &ItemFilter) -> BoardResult<Vec<BoardItem>> {
        self.inner.find_items(filter).await
    }

    async fn count_items(&self, filter: &ItemFilter) -> BoardResult<u64> {
        self.inner.count_items(filter).await
    }

    async fn insert_item(&self, item: BoardItem) -> BoardResult<()> {
        self.inner.insert_item(item).await
    }

    async fn update_item(&self, item: &BoardItem) -> BoardResult<()> {
        let gate = {
            let mut slot = self.gate.lock();
            match slot.as_ref() {
                Some(gate) if gate.item_id == item.id => slot.take(),
                _ => None,
            }
        };
        if let Some(gate) = gate {
            let _ = gate.reached.send(());
            let _ = gate.release.await;
        }
        self.inner.update_item(item).await
    }

    async fn delete_item(&self, id: Uuid) -> BoardResult<Option<BoardItem>> {
        self.inner.delete_item(id).await
    }

    async fn update_orders(&self, stage_id: Uuid, orders: &[OrderSlot]) -> BoardResult<u64> {
        self.inner.update_orders(stage_id, orders).await
    }

    async fn set_stage_status(
        &self,
        item_type: ItemType,
        stage_id: Uuid,
        status: ItemStatus,
    ) -> BoardResult<u64> {
        self.inner.set_stage_status(item_type, stage_id, status).await
    }

    async fn insert_conformity(&self, link: ConformityLink) -> BoardResult<()> {
        self.inner.insert_conformity(link).await
    }

    async fn find_conformities(
        &self,
        kind: ConformityType,
        id: Uuid,
    ) -> BoardResult<Vec<ConformityLink>> {
        self.inner.find_conformities(kind, id).await
    }

    async fn remove_conformities(&self, kind: ConformityType, id: Uuid) -> BoardResult<u64> {
        self.inner.remove_conformities(kind, id).await
    }

    async fn remove_conformities_between(
        &self,
        main_type: ConformityType,
        main_type_id: Uuid,
        rel_type: ConformityType,
        rel_ids: &[Uuid],
    ) -> BoardResult<u64> {
        self.inner
            .remove_conformities_between(main_type, main_type_id, rel_type, rel_ids)
            .await
    }

    async fn insert_checklist(&self, checklist: Checklist) -> BoardResult<()> {
        self.inner.insert_checklist(checklist).await
    }

    async fn find_checklists(
        &self,
        content_type: &str,
        content_type_id: Uuid,
    ) -> BoardResult<Vec<Checklist>> {
        self.inner.find_checklists(content_type, content_type_id).await
    }

    async fn remove_checklists(
        &self,
        content_type: &str,
        content_type_id: Uuid,
    ) -> BoardResult<u64> {
        self.inner.remove_checklists(content_type, content_type_id).await
    }

    async fn insert_activity_log(&self, log: ActivityLog) -> BoardResult<()> {
        self.inner.insert_activity_log(log).await
    }

    async fn find_activity_logs(&self, content_id: Uuid) -> BoardResult<Vec<ActivityLog>> {
        self.inner.find_activity_logs(content_id).await
    }

    async fn remove_activity_logs(&self, content_id: Uuid) -> BoardResult<u64> {
        self.inner.remove_activity_logs(content_id).await
    }
}
