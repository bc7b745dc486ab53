//! # In-Memory Store
//!
//! Thread-safe in-memory implementation of [`BoardStore`] and
//! [`ImportHistoryStore`] for tests, demos and embedding without a database.
//! All collections sit behind one `parking_lot::RwLock`; no guard is held
//! across an `.await`.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use uuid::Uuid;

use super::traits::{BoardStore, ImportHistoryStore, ItemFilter};
use crate::conformity::{ConformityLink, ConformityType};
use crate::error::{BoardError, BoardResult};
use crate::models::{
    sort_by_order, ActivityLog, Board, BoardItem, Checklist, ImportHistory, ImportIncrement,
    ImportStatus, ItemType, Pipeline, Stage,
};
use crate::ordering::OrderSlot;
use crate::state_machine::ItemStatus;

#[derive(Debug, Default)]
struct Collections {
    boards: HashMap<Uuid, Board>,
    pipelines: HashMap<Uuid, Pipeline>,
    stages: HashMap<Uuid, Stage>,
    items: HashMap<Uuid, BoardItem>,
    conformities: Vec<ConformityLink>,
    checklists: Vec<Checklist>,
    activity_logs: Vec<ActivityLog>,
    import_histories: HashMap<Uuid, ImportHistory>,
}

#[derive(Debug, Default)]
pub struct InMemoryBoardStore {
    inner: RwLock<Collections>,
}

impl InMemoryBoardStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored items (for testing)
    pub fn item_count(&self) -> usize {
        self.inner.read().items.len()
    }

    /// Number of stored conformity links (for testing)
    pub fn conformity_count(&self) -> usize {
        self.inner.read().conformities.len()
    }

    /// Number of stored checklists (for testing)
    pub fn checklist_count(&self) -> usize {
        self.inner.read().checklists.len()
    }
}

#[async_trait]
impl BoardStore for InMemoryBoardStore {
    async fn insert_board(&self, board: Board) -> BoardResult<()> {
        self.inner.write().boards.insert(board.id, board);
        Ok(())
    }

    async fn insert_pipeline(&self, pipeline: Pipeline) -> BoardResult<()> {
        self.inner.write().pipelines.insert(pipeline.id, pipeline);
        Ok(())
    }

    async fn insert_stage(&self, stage: Stage) -> BoardResult<()> {
        self.inner.write().stages.insert(stage.id, stage);
        Ok(())
    }

    async fn find_board(&self, id: Uuid) -> BoardResult<Option<Board>> {
        Ok(self.inner.read().boards.get(&id).cloned())
    }

    async fn find_pipeline(&self, id: Uuid) -> BoardResult<Option<Pipeline>> {
        Ok(self.inner.read().pipelines.get(&id).cloned())
    }

    async fn find_stage(&self, id: Uuid) -> BoardResult<Option<Stage>> {
        Ok(self.inner.read().stages.get(&id).cloned())
    }

    async fn find_stage_by_name(&self, name: &str) -> BoardResult<Option<Stage>> {
        Ok(self
            .inner
            .read()
            .stages
            .values()
            .find(|stage| stage.name == name)
            .cloned())
    }

    async fn find_item(&self, id: Uuid) -> BoardResult<Option<BoardItem>> {
        Ok(self.inner.read().items.get(&id).cloned())
    }

    async fn find_items(&self, filter: &ItemFilter) -> BoardResult<Vec<BoardItem>> {
        let mut items: Vec<BoardItem> = self
            .inner
            .read()
            .items
            .values()
            .filter(|item| filter.matches(item))
            .cloned()
            .collect();
        sort_by_order(&mut items);
        Ok(items)
    }

    async fn count_items(&self, filter: &ItemFilter) -> BoardResult<u64> {
        Ok(self
            .inner
            .read()
            .items
            .values()
            .filter(|item| filter.matches(item))
            .count() as u64)
    }

    async fn insert_item(&self, item: BoardItem) -> BoardResult<()> {
        let mut inner = self.inner.write();
        if inner.items.contains_key(&item.id) {
            return Err(BoardError::PersistenceError(format!(
                "duplicate key: board item {}",
                item.id
            )));
        }
        inner.items.insert(item.id, item);
        Ok(())
    }

    async fn update_item(&self, item: &BoardItem) -> BoardResult<()> {
        let mut inner = self.inner.write();
        match inner.items.get_mut(&item.id) {
            Some(stored) => {
                *stored = item.clone();
                Ok(())
            }
            None => Err(BoardError::not_found("Board item", item.id)),
        }
    }

    async fn delete_item(&self, id: Uuid) -> BoardResult<Option<BoardItem>> {
        Ok(self.inner.write().items.remove(&id))
    }

    async fn update_orders(&self, stage_id: Uuid, orders: &[OrderSlot]) -> BoardResult<u64> {
        let mut inner = self.inner.write();
        let mut updated = 0;
        for slot in orders {
            if let Some(item) = inner.items.get_mut(&slot.id) {
                if item.stage_id == stage_id {
                    item.order = slot.order;
                    updated += 1;
                }
            }
        }
        Ok(updated)
    }

    async fn set_stage_status(
        &self,
        item_type: ItemType,
        stage_id: Uuid,
        status: ItemStatus,
    ) -> BoardResult<u64> {
        let mut inner = self.inner.write();
        let mut updated = 0;
        for item in inner.items.values_mut() {
            if item.item_type == item_type && item.stage_id == stage_id {
                item.status = status;
                updated += 1;
            }
        }
        Ok(updated)
    }

    async fn insert_conformity(&self, link: ConformityLink) -> BoardResult<()> {
        self.inner.write().conformities.push(link);
        Ok(())
    }

    async fn find_conformities(
        &self,
        kind: ConformityType,
        id: Uuid,
    ) -> BoardResult<Vec<ConformityLink>> {
        Ok(self
            .inner
            .read()
            .conformities
            .iter()
            .filter(|link| link.involves(kind, id))
            .cloned()
            .collect())
    }

    async fn remove_conformities(&self, kind: ConformityType, id: Uuid) -> BoardResult<u64> {
        let mut inner = self.inner.write();
        let before = inner.conformities.len();
        inner.conformities.retain(|link| !link.involves(kind, id));
        Ok((before - inner.conformities.len()) as u64)
    }

    async fn remove_conformities_between(
        &self,
        main_type: ConformityType,
        main_type_id: Uuid,
        rel_type: ConformityType,
        rel_ids: &[Uuid],
    ) -> BoardResult<u64> {
        let mut inner = self.inner.write();
        let before = inner.conformities.len();
        inner.conformities.retain(|link| {
            let counterpart = link.counterpart(main_type, main_type_id);
            !matches!(counterpart, Some((kind, rel_id)) if kind == rel_type && rel_ids.contains(&rel_id))
        });
        Ok((before - inner.conformities.len()) as u64)
    }

    async fn insert_checklist(&self, checklist: Checklist) -> BoardResult<()> {
        self.inner.write().checklists.push(checklist);
        Ok(())
    }

    async fn find_checklists(
        &self,
        content_type: &str,
        content_type_id: Uuid,
    ) -> BoardResult<Vec<Checklist>> {
        Ok(self
            .inner
            .read()
            .checklists
            .iter()
            .filter(|checklist| {
                checklist.content_type == content_type
                    && checklist.content_type_id == content_type_id
            })
            .cloned()
            .collect())
    }

    async fn remove_checklists(
        &self,
        content_type: &str,
        content_type_id: Uuid,
    ) -> BoardResult<u64> {
        let mut inner = self.inner.write();
        let before = inner.checklists.len();
        inner.checklists.retain(|checklist| {
            !(checklist.content_type == content_type
                && checklist.content_type_id == content_type_id)
        });
        Ok((before - inner.checklists.len()) as u64)
    }

    async fn insert_activity_log(&self, log: ActivityLog) -> BoardResult<()> {
        self.inner.write().activity_logs.push(log);
        Ok(())
    }

    async fn find_activity_logs(&self, content_id: Uuid) -> BoardResult<Vec<ActivityLog>> {
        Ok(self
            .inner
            .read()
            .activity_logs
            .iter()
            .filter(|log| log.content_id == content_id)
            .cloned()
            .collect())
    }

    async fn remove_activity_logs(&self, content_id: Uuid) -> BoardResult<u64> {
        let mut inner = self.inner.write();
        let before = inner.activity_logs.len();
        inner.activity_logs.retain(|log| log.content_id != content_id);
        Ok((before - inner.activity_logs.len()) as u64)
    }
}

#[async_trait]
impl ImportHistoryStore for InMemoryBoardStore {
    async fn insert_import_history(&self, history: ImportHistory) -> BoardResult<()> {
        self.inner
            .write()
            .import_histories
            .insert(history.id, history);
        Ok(())
    }

    async fn find_import_history(&self, id: Uuid) -> BoardResult<Option<ImportHistory>> {
        Ok(self.inner.read().import_histories.get(&id).cloned())
    }

    async fn apply_import_increment(
        &self,
        id: Uuid,
        increment: ImportIncrement,
    ) -> BoardResult<ImportHistory> {
        let mut inner = self.inner.write();
        let history = inner
            .import_histories
            .get_mut(&id)
            .ok_or_else(|| BoardError::not_found("Import history", id))?;

        history.success += increment.success;
        history.failed += increment.failed;
        history.percentage += increment.percentage;
        if let Some(created) = increment.created_id {
            history.ids.push(created);
        }
        history.error_msgs.extend(increment.error_msgs);

        Ok(history.clone())
    }

    async fn set_import_status(
        &self,
        id: Uuid,
        status: ImportStatus,
        percentage: Option<f64>,
    ) -> BoardResult<ImportHistory> {
        let mut inner = self.inner.write();
        let history = inner
            .import_histories
            .get_mut(&id)
            .ok_or_else(|| BoardError::not_found("Import history", id))?;

        history.status = status;
        if let Some(percentage) = percentage {
            history.percentage = percentage;
        }

        Ok(history.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn item(stage_id: Uuid, order: f64, status: ItemStatus) -> BoardItem {
        let now = Utc::now();
        BoardItem {
            id: Uuid::new_v4(),
            item_type: ItemType::Deal,
            name: "deal".to_string(),
            stage_id,
            initial_stage_id: Some(stage_id),
            order,
            status,
            assigned_user_ids: vec![],
            watched_user_ids: vec![],
            products_data: vec![],
            user_id: None,
            created_at: now,
            modified_at: now,
            modified_by: None,
        }
    }

    #[tokio::test]
    async fn test_find_items_filters_and_sorts() {
        let store = InMemoryBoardStore::new();
        let stage = Uuid::new_v4();

        let high = item(stage, 5.0, ItemStatus::Active);
        let low = item(stage, 1.0, ItemStatus::Active);
        let archived = item(stage, 0.0, ItemStatus::Archived);
        let elsewhere = item(Uuid::new_v4(), 0.0, ItemStatus::Active);

        for i in [&high, &low, &archived, &elsewhere] {
            store.insert_item(i.clone()).await.unwrap();
        }

        let found = store
            .find_items(&ItemFilter::active_in_stage(ItemType::Deal, stage))
            .await
            .unwrap();
        let ids: Vec<_> = found.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![low.id, high.id]);

        let below = store
            .find_items(&ItemFilter::active_in_stage(ItemType::Deal, stage).below(5.0))
            .await
            .unwrap();
        assert_eq!(below.len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_insert_fails() {
        let store = InMemoryBoardStore::new();
        let deal = item(Uuid::new_v4(), 0.0, ItemStatus::Active);
        store.insert_item(deal.clone()).await.unwrap();
        assert!(store.insert_item(deal).await.is_err());
    }

    #[tokio::test]
    async fn test_update_missing_item_is_not_found() {
        let store = InMemoryBoardStore::new();
        let deal = item(Uuid::new_v4(), 0.0, ItemStatus::Active);
        let err = store.update_item(&deal).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_remove_conformities_between() {
        let store = InMemoryBoardStore::new();
        let deal = Uuid::new_v4();
        let (keep, drop) = (Uuid::new_v4(), Uuid::new_v4());

        for company in [keep, drop] {
            store
                .insert_conformity(ConformityLink::new(
                    ConformityType::Deal,
                    deal,
                    ConformityType::Company,
                    company,
                ))
                .await
                .unwrap();
        }

        let removed = store
            .remove_conformities_between(
                ConformityType::Deal,
                deal,
                ConformityType::Company,
                &[drop],
            )
            .await
            .unwrap();

        assert_eq!(removed, 1);
        let left = store
            .find_conformities(ConformityType::Deal, deal)
            .await
            .unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].rel_type_id, keep);
    }

    #[tokio::test]
    async fn test_import_increment_accumulates() {
        let store = InMemoryBoardStore::new();
        let history = ImportHistory::new("deal", 2);
        let id = history.id;
        store.insert_import_history(history).await.unwrap();

        store
            .apply_import_increment(
                id,
                ImportIncrement {
                    success: 1,
                    percentage: 50.0,
                    created_id: Some(Uuid::new_v4()),
                    ..ImportIncrement::default()
                },
            )
            .await
            .unwrap();
        let updated = store
            .apply_import_increment(
                id,
                ImportIncrement {
                    failed: 1,
                    percentage: 50.0,
                    error_msgs: vec!["boom".to_string()],
                    ..ImportIncrement::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.success, 1);
        assert_eq!(updated.failed, 1);
        assert_eq!(updated.ids.len(), 1);
        assert_eq!(updated.error_msgs, vec!["boom".to_string()]);
        assert!(updated.is_finished());
    }
}
