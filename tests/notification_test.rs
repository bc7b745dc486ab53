//! Notification fan-out from board mutations

mod common;

use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use board_core::board::{ChangeStageRequest, ItemChanges, NewItem, StageTransitionEngine};
use board_core::config::BoardConfig;
use board_core::error::{BoardError, BoardResult};
use board_core::events::BroadcastBus;
use board_core::models::{ItemType, Stage};
use board_core::notifications::{Notification, NotificationSender};
use board_core::store::BoardStore;
use common::BoardFixture;

struct FailingSender;

#[async_trait]
impl NotificationSender for FailingSender {
    async fn send_notification(&self, _notification: Notification) -> BoardResult<()> {
        Err(BoardError::NotificationError("gateway down".to_string()))
    }
}

fn expected_link(fx: &BoardFixture) -> String {
    format!(
        "/deal/board?id={}&pipelineId={}",
        fx.board.id, fx.pipeline.id
    )
}

#[tokio::test]
async fn test_add_invites_assignees_but_not_actor() {
    let fx = BoardFixture::new().await;
    let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());

    fx.engine
        .add_item(
            &fx.ctx,
            NewItem::new(ItemType::Deal, "Big deal", fx.new_stage.id)
                .assigned_to(vec![alice, fx.ctx.user_id, bob]),
            None,
        )
        .await
        .unwrap();

    let sent = fx.sender.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].notif_type, "dealAdd");
    assert_eq!(sent[0].receivers, vec![alice, bob]);
    assert_eq!(sent[0].created_user, fx.ctx.user_id);
    assert_eq!(sent[0].content, "invited you to the deal: 'Big deal'.");
    assert_eq!(sent[0].link, expected_link(&fx));
}

#[tokio::test]
async fn test_add_without_assignees_sends_nothing() {
    let fx = BoardFixture::new().await;
    fx.add_deal("solo", fx.new_stage.id, None).await;
    assert!(fx.sender.sent().is_empty());
}

#[tokio::test]
async fn test_reassignment_splits_invited_and_removed() {
    let fx = BoardFixture::new().await;
    let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
    let deal = fx
        .engine
        .add_item(
            &fx.ctx,
            NewItem::new(ItemType::Deal, "Shuffle", fx.new_stage.id).assigned_to(vec![a, b]),
            None,
        )
        .await
        .unwrap();
    fx.sender.clear();

    fx.engine
        .update_item(&fx.ctx, deal.id, ItemChanges::assignees(vec![b, c]))
        .await
        .unwrap();

    let sent = fx.sender.sent();
    assert_eq!(sent.len(), 2);

    let edit = sent.iter().find(|n| n.notif_type == "dealEdit").unwrap();
    assert_eq!(edit.receivers, vec![c]);

    let removed = sent
        .iter()
        .find(|n| n.notif_type == "dealRemoveAssign")
        .unwrap();
    assert_eq!(removed.receivers, vec![a]);
    assert_eq!(removed.content, "removed you from deal: 'Shuffle'.");
}

#[tokio::test]
async fn test_plain_edit_reaches_assignees_and_watchers() {
    let fx = BoardFixture::new().await;
    let (assignee, watcher) = (Uuid::new_v4(), Uuid::new_v4());
    let mut new_item =
        NewItem::new(ItemType::Deal, "Watched", fx.new_stage.id).assigned_to(vec![assignee]);
    new_item.watched_user_ids = vec![watcher];
    let deal = fx.engine.add_item(&fx.ctx, new_item, None).await.unwrap();
    fx.sender.clear();

    fx.engine
        .update_item(&fx.ctx, deal.id, ItemChanges::rename("Watched closely"))
        .await
        .unwrap();

    let sent = fx.sender.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].notif_type, "dealEdit");
    assert_eq!(sent[0].content, "Watched closely");
    assert_eq!(sent[0].receivers, vec![assignee, watcher]);
}

#[tokio::test]
async fn test_move_and_delete_messages() {
    let fx = BoardFixture::new().await;
    let assignee = Uuid::new_v4();
    let deal = fx
        .engine
        .add_item(
            &fx.ctx,
            NewItem::new(ItemType::Deal, "Traveller", fx.new_stage.id).assigned_to(vec![assignee]),
            None,
        )
        .await
        .unwrap();
    fx.sender.clear();

    fx.engine
        .change_stage(&fx.ctx, ChangeStageRequest::new(deal.id, fx.won_stage.id))
        .await
        .unwrap();
    fx.engine
        .change_stage(&fx.ctx, ChangeStageRequest::new(deal.id, fx.won_stage.id))
        .await
        .unwrap();
    fx.engine.remove_item(&fx.ctx, deal.id).await.unwrap();

    let sent = fx.sender.sent();
    let contents: Vec<&str> = sent.iter().map(|n| n.content.as_str()).collect();
    assert_eq!(
        contents,
        vec![
            "moved 'Traveller' to the 'Won'.",
            "changed order of your deal: 'Traveller'",
            "deleted deal: 'Traveller'",
        ]
    );
    assert_eq!(sent[0].notif_type, "dealChange");
    assert_eq!(sent[2].notif_type, "dealDelete");
    assert!(sent.iter().all(|n| n.receivers == vec![assignee]));
}

#[tokio::test]
async fn test_missing_pipeline_fails_link_resolution() {
    let fx = BoardFixture::new().await;
    let orphan = Stage::new(Uuid::new_v4(), "Orphan");
    fx.store.insert_stage(orphan.clone()).await.unwrap();

    let err = fx
        .engine
        .add_item(
            &fx.ctx,
            NewItem::new(ItemType::Deal, "Lost", orphan.id).assigned_to(vec![Uuid::new_v4()]),
            None,
        )
        .await
        .unwrap_err();

    assert_eq!(
        err,
        BoardError::NotFound {
            entity: "Pipeline",
            id: orphan.pipeline_id.to_string(),
        }
    );
}

#[tokio::test]
async fn test_disabled_notifications_send_nothing() {
    let mut config = BoardConfig::default();
    config.notifications.enabled = false;
    let fx = BoardFixture::with_config(config).await;

    fx.engine
        .add_item(
            &fx.ctx,
            NewItem::new(ItemType::Deal, "Quiet", fx.new_stage.id)
                .assigned_to(vec![Uuid::new_v4()]),
            None,
        )
        .await
        .unwrap();

    assert!(fx.sender.sent().is_empty());
}

#[tokio::test]
async fn test_sender_failure_does_not_fail_mutation() {
    let fx = BoardFixture::new().await;
    let config = BoardConfig::default();
    let engine = StageTransitionEngine::new(
        fx.store.clone(),
        Arc::new(BroadcastBus::new(config.events.channel_capacity)),
        Arc::new(FailingSender),
        &config,
    );

    let deal = engine
        .add_item(
            &fx.ctx,
            NewItem::new(ItemType::Deal, "Resilient", fx.new_stage.id)
                .assigned_to(vec![Uuid::new_v4()]),
            None,
        )
        .await
        .unwrap();

    assert!(fx.store.find_item(deal.id).await.unwrap().is_some());
}
