//! # Notification Dispatcher
//!
//! Builds board deep links and fans notifications out to the people involved
//! with an item. The acting user never receives their own notification.
//! Resolving the stage and pipeline for the link is mandatory; delivery itself is
//! best-effort and sender failures are only logged.

use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use super::sender::NotificationSender;
use super::types::{Notification, NotificationKind, NotificationRequest};
use crate::error::{BoardError, BoardResult};
use crate::models::{BoardItem, Pipeline};
use crate::store::BoardStore;

#[derive(Clone)]
pub struct NotificationDispatcher {
    store: Arc<dyn BoardStore>,
    sender: Arc<dyn NotificationSender>,
    enabled: bool,
}

impl std::fmt::Debug for NotificationDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationDispatcher")
            .field("store", &"BoardStore")
            .field("sender", &"NotificationSender")
            .field("enabled", &self.enabled)
            .finish()
    }
}

/// `/{contentType}/board?id={boardId}&pipelineId={pipelineId}`
pub fn board_link(content_type: &str, pipeline: &Pipeline) -> String {
    format!(
        "/{content_type}/board?id={}&pipelineId={}",
        pipeline.board_id, pipeline.id
    )
}

/// Union of `invited` and `explicit`, in first-seen order, without `acting_user`
pub fn resolve_recipients(invited: &[Uuid], explicit: &[Uuid], acting_user: Uuid) -> Vec<Uuid> {
    let mut recipients: Vec<Uuid> = Vec::with_capacity(invited.len() + explicit.len());
    for id in invited.iter().chain(explicit) {
        if *id != acting_user && !recipients.contains(id) {
            recipients.push(*id);
        }
    }
    recipients
}

impl NotificationDispatcher {
    pub fn new(
        store: Arc<dyn BoardStore>,
        sender: Arc<dyn NotificationSender>,
        enabled: bool,
    ) -> Self {
        Self {
            store,
            sender,
            enabled,
        }
    }

    /// Resolve the link, compute receivers and send.
    ///
    /// Removed users get a separate `RemoveAssign` notification and are left out
    /// of the main one.
    pub async fn notify(&self, request: NotificationRequest) -> BoardResult<()> {
        if !self.enabled {
            return Ok(());
        }

        let link = self.link_for(&request.item).await?;
        let item_type = request.item.item_type;
        let invited = request.invited_users.clone().unwrap_or_default();
        let removed = request.removed_users.clone().unwrap_or_default();
        let explicit = match &request.recipients {
            Some(recipients) => recipients.clone(),
            None if request.invited_users.is_some() => Vec::new(),
            None => request.item.member_ids(),
        };

        let receivers: Vec<Uuid> = resolve_recipients(&invited, &explicit, request.acting_user)
            .into_iter()
            .filter(|id| !removed.contains(id))
            .collect();

        if !receivers.is_empty() {
            self.deliver(Notification {
                created_user: request.acting_user,
                notif_type: request.kind.notif_type(item_type),
                title: request.content.clone(),
                content: request.content.clone(),
                link: link.clone(),
                receivers,
            })
            .await;
        }

        let removed_receivers = resolve_recipients(&removed, &[], request.acting_user);
        if !removed_receivers.is_empty() {
            let content = format!(
                "removed you from {}: '{}'.",
                item_type.module_name(),
                request.item.name
            );
            self.deliver(Notification {
                created_user: request.acting_user,
                notif_type: NotificationKind::RemoveAssign.notif_type(item_type),
                title: content.clone(),
                content,
                link,
                receivers: removed_receivers,
            })
            .await;
        }

        Ok(())
    }

    async fn link_for(&self, item: &BoardItem) -> BoardResult<String> {
        let stage = self
            .store
            .find_stage(item.stage_id)
            .await?
            .ok_or_else(|| BoardError::not_found("Stage", item.stage_id))?;

        let pipeline = self
            .store
            .find_pipeline(stage.pipeline_id)
            .await?
            .ok_or_else(|| BoardError::not_found("Pipeline", stage.pipeline_id))?;

        Ok(board_link(item.item_type.module_name(), &pipeline))
    }

    async fn deliver(&self, notification: Notification) {
        let notif_type = notification.notif_type.clone();
        let receivers = notification.receivers.len();

        match self.sender.send_notification(notification).await {
            Ok(()) => debug!(%notif_type, receivers, "Notification sent"),
            Err(error) => warn!(%notif_type, receivers, %error, "Failed to send notification"),
        }
    }
}
