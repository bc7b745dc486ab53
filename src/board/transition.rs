//! # Stage Transition Engine
//!
//! Entry points for every mutation that changes where an item sits on a board:
//! create, move between stages, archive / restore, delete, plus the bulk and copy
//! operations around them.
//!
//! Each operation follows the same sequence: validate against the store, lock
//! the stages it touches, re-read the item under those locks, compute the new
//! order and persist, then release and notify and publish. Every write-back of
//! an existing item happens under its stage lock so it cannot carry an `order`
//! made stale by a concurrent renumber. Publishing and notification delivery are best-effort and never fail a
//! mutation whose store write already succeeded. Link resolution for
//! notifications is not optional and surfaces as `NotFound`.

use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use super::inputs::{ChangeStageRequest, ConformityEdit, ItemChanges, MutationContext, NewItem};
use super::stage_locks::{StageGuard, StageLocks};
use crate::config::BoardConfig;
use crate::conformity::{diff, ConformityLinker, ConformityType};
use crate::constants::{activity, COPY_SUFFIX};
use crate::error::{BoardError, BoardResult};
use crate::events::{ChangeAction, ChangeEventData, ChangeEventPublisher, PubSubBus};
use crate::models::board_item::product_assignees;
use crate::models::{ActivityLog, BoardItem, Checklist, ItemType, Stage};
use crate::notifications::{
    NotificationDispatcher, NotificationKind, NotificationRequest, NotificationSender,
};
use crate::ordering::{OrderAssigner, OrderDecision, OrderSlot};
use crate::state_machine::{ItemStateMachine, ItemStatus, StatusTransition};
use crate::store::{BoardStore, ItemFilter};

const PRODUCT_ASSIGNEE_REMOVAL: &str =
    "Cannot remove the team member, it is assigned in the product / service section";

#[derive(Clone)]
pub struct StageTransitionEngine {
    store: Arc<dyn BoardStore>,
    events: ChangeEventPublisher,
    notifications: NotificationDispatcher,
    conformities: ConformityLinker,
    assigner: OrderAssigner,
    locks: StageLocks,
    state_machine: ItemStateMachine,
}

impl std::fmt::Debug for StageTransitionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageTransitionEngine")
            .field("store", &"BoardStore")
            .field("events", &self.events)
            .field("assigner", &self.assigner)
            .field("locked_stages", &self.locks.len())
            .finish()
    }
}

impl StageTransitionEngine {
    pub fn new(
        store: Arc<dyn BoardStore>,
        bus: Arc<dyn PubSubBus>,
        sender: Arc<dyn NotificationSender>,
        config: &BoardConfig,
    ) -> Self {
        Self {
            events: ChangeEventPublisher::new(bus, &config.events),
            notifications: NotificationDispatcher::new(
                store.clone(),
                sender,
                config.notifications.enabled,
            ),
            conformities: ConformityLinker::new(store.clone()),
            assigner: OrderAssigner::new(&config.ordering),
            locks: StageLocks::new(),
            state_machine: ItemStateMachine,
            store,
        }
    }

    pub fn store(&self) -> &Arc<dyn BoardStore> {
        &self.store
    }

    pub fn conformities(&self) -> &ConformityLinker {
        &self.conformities
    }

    /// Create an item directly below `above_item_id`, or at the top of the stage
    #[instrument(skip(self, ctx, new_item), fields(user_id = %ctx.user_id, stage_id = %new_item.stage_id, item_type = %new_item.item_type))]
    pub async fn add_item(
        &self,
        ctx: &MutationContext,
        new_item: NewItem,
        above_item_id: Option<Uuid>,
    ) -> BoardResult<BoardItem> {
        if !new_item.products_data.is_empty() && !new_item.item_type.has_products() {
            return Err(BoardError::ValidationError(format!(
                "{} does not carry product lines",
                new_item.item_type
            )));
        }

        let stage = self.require_stage(new_item.stage_id).await?;

        let mut assigned_user_ids = new_item.assigned_user_ids;
        push_unique(
            &mut assigned_user_ids,
            &product_assignees(&new_item.products_data),
        );
        let mut watched_user_ids = new_item.watched_user_ids;
        push_unique(&mut watched_user_ids, &[ctx.user_id]);

        let item = {
            let _guard = self.locks.lock(stage.id).await;
            let order = self
                .place(new_item.item_type, stage.id, None, above_item_id)
                .await?;

            let now = Utc::now();
            let item = BoardItem {
                id: Uuid::new_v4(),
                item_type: new_item.item_type,
                name: new_item.name,
                stage_id: stage.id,
                initial_stage_id: Some(stage.id),
                order,
                status: ItemStatus::Active,
                assigned_user_ids,
                watched_user_ids,
                products_data: new_item.products_data,
                user_id: Some(ctx.user_id),
                created_at: now,
                modified_at: now,
                modified_by: Some(ctx.user_id),
            };
            self.store.insert_item(item.clone()).await?;
            item
        };

        info!(item_id = %item.id, order = item.order, "Board item created");

        let content = format!(
            "invited you to the {}: '{}'.",
            item.item_type.module_name(),
            item.name
        );
        self.notifications
            .notify(
                NotificationRequest::new(item.clone(), ctx.user_id, NotificationKind::Add, content)
                    .with_invited(item.assigned_user_ids.clone()),
            )
            .await?;

        self.events
            .publish(
                stage.pipeline_id,
                &ctx.process_id,
                ChangeAction::ItemAdd,
                ChangeEventData::item(item.clone())
                    .above(above_item_id)
                    .destination(stage.id),
            )
            .await;

        Ok(item)
    }

    /// Move an item into `destination_stage_id`, directly below `above_item_id`
    #[instrument(skip(self, ctx, request), fields(user_id = %ctx.user_id, item_id = %request.item_id, destination_stage_id = %request.destination_stage_id))]
    pub async fn change_stage(
        &self,
        ctx: &MutationContext,
        request: ChangeStageRequest,
    ) -> BoardResult<BoardItem> {
        let destination = self.require_stage(request.destination_stage_id).await?;
        let (mut item, guards) = self
            .lock_item(request.item_id, Some(destination.id))
            .await?;
        let previous_stage_id = item.stage_id;

        {
            let _guards = guards;
            item.order = self
                .place(
                    item.item_type,
                    destination.id,
                    Some(item.id),
                    request.above_item_id,
                )
                .await?;
            item.stage_id = destination.id;
            item.modified_at = Utc::now();
            item.modified_by = Some(ctx.user_id);
            self.store.update_item(&item).await?;
        }

        debug!(
            item_id = %item.id,
            from_stage = %previous_stage_id,
            to_stage = %destination.id,
            order = item.order,
            "Board item moved"
        );

        let module = item.item_type.module_name();
        let content = if previous_stage_id == destination.id {
            format!("changed order of your {module}: '{}'", item.name)
        } else {
            format!("moved '{}' to the '{}'.", item.name, destination.name)
        };
        self.notifications
            .notify(NotificationRequest::new(
                item.clone(),
                ctx.user_id,
                NotificationKind::Change,
                content,
            ))
            .await?;

        self.events
            .publish(
                destination.pipeline_id,
                &ctx.process_id,
                ChangeAction::OrderUpdated,
                ChangeEventData::item(item.clone())
                    .above(request.above_item_id)
                    .destination(destination.id)
                    .old_stage(request.source_stage_id.unwrap_or(previous_stage_id)),
            )
            .await;

        Ok(item)
    }

    /// Apply field, assignee and status changes to one item
    #[instrument(skip(self, ctx, changes), fields(user_id = %ctx.user_id, item_id = %item_id))]
    pub async fn update_item(
        &self,
        ctx: &MutationContext,
        item_id: Uuid,
        changes: ItemChanges,
    ) -> BoardResult<BoardItem> {
        let (old, guards) = self.lock_item(item_id, None).await?;
        let mut item = old.clone();

        if let Some(name) = changes.name {
            item.name = name;
        }

        let mut assignee_diff = None;

        if let Some(assigned) = &changes.assigned_user_ids {
            let changes_diff = diff(&old.assigned_user_ids, assigned);
            let product_users = old.product_assignee_ids();
            if changes_diff
                .removed_user_ids
                .iter()
                .any(|id| product_users.contains(id))
            {
                return Err(BoardError::InvalidOperation(
                    PRODUCT_ASSIGNEE_REMOVAL.to_string(),
                ));
            }
            item.assigned_user_ids = assigned.clone();
            assignee_diff = Some(changes_diff);
        }

        if let Some(products) = changes.products_data {
            if !item.item_type.has_products() {
                return Err(BoardError::ValidationError(format!(
                    "{} does not carry product lines",
                    item.item_type
                )));
            }

            let product_diff = diff(&old.product_assignee_ids(), &product_assignees(&products));
            if !product_diff.is_empty() {
                push_unique(&mut item.assigned_user_ids, &product_diff.added_user_ids);
                item.assigned_user_ids
                    .retain(|id| !product_diff.removed_user_ids.contains(id));
                assignee_diff = Some(diff(&old.assigned_user_ids, &item.assigned_user_ids));
            }
            item.products_data = products;
        }

        let transition = self.state_machine.classify(old.status, changes.status);
        let stage = self.require_stage(item.stage_id).await?;

        item.modified_at = Utc::now();
        item.modified_by = Some(ctx.user_id);

        let mut restored_above = None;
        match transition {
            StatusTransition::Activated => {
                item.status = ItemStatus::Active;
                restored_above = self.preceding_active_item(&old).await?;
                item.order = self
                    .place(item.item_type, stage.id, Some(item.id), restored_above)
                    .await?;
            }
            StatusTransition::Archived => item.status = ItemStatus::Archived,
            StatusTransition::Unchanged => {}
        }
        self.store.update_item(&item).await?;
        drop(guards);

        match transition {
            StatusTransition::Activated => {
                self.log_activity(ctx, &item, activity::ACTIVATED, json!({ "status": "active" }))
                    .await?;
                self.events
                    .publish(
                        stage.pipeline_id,
                        &ctx.process_id,
                        ChangeAction::ItemAdd,
                        ChangeEventData::item(item.clone())
                            .above(restored_above)
                            .destination(stage.id),
                    )
                    .await;
            }
            StatusTransition::Archived => {
                self.log_activity(ctx, &item, activity::ARCHIVED, json!({ "status": "archived" }))
                    .await?;
                self.events
                    .publish(
                        stage.pipeline_id,
                        &ctx.process_id,
                        ChangeAction::ItemRemove,
                        ChangeEventData::item(item.clone()).old_stage(stage.id),
                    )
                    .await;
            }
            StatusTransition::Unchanged => {}
        }

        let mut request = NotificationRequest::new(
            item.clone(),
            ctx.user_id,
            NotificationKind::Edit,
            item.name.clone(),
        );

        if let Some(changes_diff) = assignee_diff.filter(|d| !d.is_empty()) {
            self.log_activity(ctx, &item, activity::ASSIGNEE, serde_json::to_value(&changes_diff)?)
                .await?;
            request = request
                .with_invited(changes_diff.added_user_ids)
                .with_removed(changes_diff.removed_user_ids);
        }

        self.notifications.notify(request).await?;

        self.events
            .publish(
                stage.pipeline_id,
                &ctx.process_id,
                ChangeAction::ItemUpdate,
                ChangeEventData::item(item.clone()),
            )
            .await;

        Ok(item)
    }

    /// Hard-delete an item together with its links, checklists and activity
    #[instrument(skip(self, ctx), fields(user_id = %ctx.user_id, item_id = %item_id))]
    pub async fn remove_item(&self, ctx: &MutationContext, item_id: Uuid) -> BoardResult<BoardItem> {
        let (item, guards) = self.lock_item(item_id, None).await?;
        let stage = self.require_stage(item.stage_id).await?;
        let module = item.item_type.module_name();

        self.notifications
            .notify(NotificationRequest::new(
                item.clone(),
                ctx.user_id,
                NotificationKind::Delete,
                format!("deleted {module}: '{}'", item.name),
            ))
            .await?;

        let links = self
            .store
            .remove_conformities(item.item_type.conformity_type(), item.id)
            .await?;
        let checklists = self.store.remove_checklists(module, item.id).await?;
        let logs = self.store.remove_activity_logs(item.id).await?;
        self.store.delete_item(item.id).await?;
        drop(guards);

        info!(links, checklists, logs, "Board item removed");

        self.events
            .publish(
                stage.pipeline_id,
                &ctx.process_id,
                ChangeAction::ItemRemove,
                ChangeEventData::item(item.clone()).old_stage(stage.id),
            )
            .await;

        Ok(item)
    }

    /// Write explicit orders for items of one stage and return the stage's active items
    #[instrument(skip(self, ctx, orders), fields(user_id = %ctx.user_id, stage_id = %stage_id, count = orders.len()))]
    pub async fn update_orders(
        &self,
        ctx: &MutationContext,
        item_type: ItemType,
        stage_id: Uuid,
        orders: &[OrderSlot],
    ) -> BoardResult<Vec<BoardItem>> {
        let stage = self.require_stage(stage_id).await?;

        let _guard = self.locks.lock(stage.id).await;
        let updated = self.store.update_orders(stage.id, orders).await?;
        debug!(updated, "Stage orders rewritten");

        self.store
            .find_items(&ItemFilter::active_in_stage(item_type, stage.id))
            .await
    }

    /// Archive every item of `item_type` in a stage; returns how many changed
    #[instrument(skip(self, ctx), fields(user_id = %ctx.user_id, stage_id = %stage_id))]
    pub async fn archive_stage(
        &self,
        ctx: &MutationContext,
        item_type: ItemType,
        stage_id: Uuid,
    ) -> BoardResult<u64> {
        let stage = self.require_stage(stage_id).await?;

        let archived = {
            let _guard = self.locks.lock(stage.id).await;
            self.store
                .set_stage_status(item_type, stage.id, ItemStatus::Archived)
                .await?
        };

        self.store
            .insert_activity_log(ActivityLog::new(
                item_type.module_name(),
                stage.id,
                activity::ARCHIVED,
                ctx.user_id,
                json!({ "stageId": stage.id, "count": archived }),
            ))
            .await?;

        info!(archived, "Stage archived");
        Ok(archived)
    }

    /// Add or remove the acting user from the item's watchers
    #[instrument(skip(self, ctx), fields(user_id = %ctx.user_id, item_id = %item_id))]
    pub async fn watch_item(
        &self,
        ctx: &MutationContext,
        item_id: Uuid,
        is_add: bool,
    ) -> BoardResult<BoardItem> {
        let (mut item, _guards) = self.lock_item(item_id, None).await?;

        if is_add {
            push_unique(&mut item.watched_user_ids, &[ctx.user_id]);
        } else {
            item.watched_user_ids.retain(|id| *id != ctx.user_id);
        }

        self.store.update_item(&item).await?;
        Ok(item)
    }

    /// Duplicate an item right below the original, with its contacts and checklists
    #[instrument(skip(self, ctx), fields(user_id = %ctx.user_id, item_id = %item_id))]
    pub async fn copy_item(&self, ctx: &MutationContext, item_id: Uuid) -> BoardResult<BoardItem> {
        let (original, guards) = self.lock_item(item_id, None).await?;
        let stage = self.require_stage(original.stage_id).await?;
        let above_item_id = original.is_active().then_some(original.id);

        let clone = {
            let _guards = guards;
            let order = self
                .place(original.item_type, stage.id, None, above_item_id)
                .await?;

            let now = Utc::now();
            let clone = BoardItem {
                id: Uuid::new_v4(),
                name: format!("{}{COPY_SUFFIX}", original.name),
                initial_stage_id: Some(stage.id),
                order,
                status: ItemStatus::Active,
                watched_user_ids: vec![ctx.user_id],
                user_id: Some(ctx.user_id),
                created_at: now,
                modified_at: now,
                modified_by: Some(ctx.user_id),
                ..original.clone()
            };
            self.store.insert_item(clone.clone()).await?;
            clone
        };

        self.conformities
            .copy_contacts(original.item_type.conformity_type(), original.id, clone.id)
            .await?;

        let module = original.item_type.module_name();
        for checklist in self.store.find_checklists(module, original.id).await? {
            self.store
                .insert_checklist(Checklist::new(module, clone.id, checklist.title))
                .await?;
        }

        self.events
            .publish(
                stage.pipeline_id,
                &ctx.process_id,
                ChangeAction::ItemAdd,
                ChangeEventData::item(clone.clone())
                    .above(Some(original.id))
                    .destination(stage.id),
            )
            .await;

        Ok(clone)
    }

    /// Replace the item's company or customer links
    #[instrument(skip(self, ctx, edit), fields(user_id = %ctx.user_id, item_id = %item_id, rel_type = %edit.rel_type))]
    pub async fn edit_conformities(
        &self,
        ctx: &MutationContext,
        item_id: Uuid,
        edit: ConformityEdit,
    ) -> BoardResult<()> {
        if !matches!(
            edit.rel_type,
            ConformityType::Company | ConformityType::Customer
        ) {
            return Err(BoardError::ValidationError(format!(
                "cannot relate a board item to {}",
                edit.rel_type
            )));
        }

        let item = self.require_item(item_id).await?;
        self.conformities
            .replace(
                item.item_type.conformity_type(),
                item.id,
                edit.rel_type,
                &edit.rel_ids,
            )
            .await
    }

    /// Compute an order inside `stage_id`, persisting a renumber when one is needed.
    /// Callers hold the stage lock.
    async fn place(
        &self,
        item_type: ItemType,
        stage_id: Uuid,
        moving_item_id: Option<Uuid>,
        above_item_id: Option<Uuid>,
    ) -> BoardResult<f64> {
        let snapshot = self
            .stage_slots(ItemFilter::active_in_stage(item_type, stage_id), moving_item_id)
            .await?;
        let decision = self.assigner.compute_order(&snapshot, above_item_id)?;
        let decision = match (decision, above_item_id) {
            // Archived items hold positions too; renumbering only the active ones
            // would leave them stranded between the new values.
            (OrderDecision::Renumber { .. }, Some(above_id)) => {
                let stage = self
                    .stage_slots(ItemFilter::in_stage(item_type, stage_id), moving_item_id)
                    .await?;
                self.assigner.renumber_after(&stage, above_id)?
            }
            (decision, _) => decision,
        };

        if let OrderDecision::Renumber { orders, .. } = &decision {
            info!(%stage_id, items = orders.len(), "Order gap exhausted, renumbering stage");
            self.store.update_orders(stage_id, orders).await?;
        }

        Ok(decision.order())
    }

    async fn stage_slots(
        &self,
        filter: ItemFilter,
        moving_item_id: Option<Uuid>,
    ) -> BoardResult<Vec<OrderSlot>> {
        let filter = match moving_item_id {
            Some(id) => filter.excluding(id),
            None => filter,
        };
        Ok(self
            .store
            .find_items(&filter)
            .await?
            .iter()
            .map(OrderSlot::from)
            .collect())
    }

    /// Read an item and lock its stage, plus `extra_stage_id` when given.
    ///
    /// The item is read again once the locks are held; if it changed stage in
    /// between, the locks are released and the read retried. Stages are locked
    /// in id order so two-stage moves cannot deadlock each other.
    async fn lock_item(
        &self,
        item_id: Uuid,
        extra_stage_id: Option<Uuid>,
    ) -> BoardResult<(BoardItem, Vec<StageGuard>)> {
        loop {
            let seen = self.require_item(item_id).await?;

            let mut stage_ids = vec![seen.stage_id];
            stage_ids.extend(extra_stage_id);
            stage_ids.sort();
            stage_ids.dedup();

            let mut guards = Vec::with_capacity(stage_ids.len());
            for stage_id in stage_ids {
                guards.push(self.locks.lock(stage_id).await);
            }

            let item = self.require_item(item_id).await?;
            if item.stage_id == seen.stage_id {
                return Ok((item, guards));
            }
            debug!(%item_id, "Item changed stage while waiting for its lock, retrying");
        }
    }

    /// Closest active item above `item` in its stage, if any
    async fn preceding_active_item(&self, item: &BoardItem) -> BoardResult<Option<Uuid>> {
        let filter = ItemFilter::active_in_stage(item.item_type, item.stage_id)
            .below(item.order)
            .excluding(item.id);

        Ok(self
            .store
            .find_items(&filter)
            .await?
            .last()
            .map(|above| above.id))
    }

    async fn log_activity(
        &self,
        ctx: &MutationContext,
        item: &BoardItem,
        action: &str,
        content: serde_json::Value,
    ) -> BoardResult<()> {
        self.store
            .insert_activity_log(ActivityLog::new(
                item.item_type.module_name(),
                item.id,
                action,
                ctx.user_id,
                content,
            ))
            .await
    }

    async fn require_item(&self, id: Uuid) -> BoardResult<BoardItem> {
        self.store
            .find_item(id)
            .await?
            .ok_or_else(|| BoardError::not_found("Board item", id))
    }

    async fn require_stage(&self, id: Uuid) -> BoardResult<Stage> {
        self.store
            .find_stage(id)
            .await?
            .ok_or_else(|| BoardError::not_found("Stage", id))
    }
}

fn push_unique(target: &mut Vec<Uuid>, ids: &[Uuid]) {
    for id in ids {
        if !target.contains(id) {
            target.push(*id);
        }
    }
}
