//! Shared fixtures for board core integration tests
#![allow(dead_code)]

pub mod gated_store;
pub mod strategies;

use std::sync::Arc;
use tokio::sync::broadcast;
use uuid::Uuid;

use board_core::board::{MutationContext, NewItem, StageTransitionEngine};
use board_core::config::BoardConfig;
use board_core::events::{BroadcastBus, PublishedMessage};
use board_core::models::{Board, BoardItem, ItemType, Pipeline, Stage};
use board_core::notifications::InMemoryNotificationSender;
use board_core::store::{BoardStore, InMemoryBoardStore, ItemFilter};

/// One board with two pipelines:
/// `Sales` (stages `New`, `Won`) and `Support` (stage `Backlog`)
pub struct BoardFixture {
    pub store: Arc<InMemoryBoardStore>,
    pub bus: Arc<BroadcastBus>,
    pub sender: Arc<InMemoryNotificationSender>,
    pub engine: StageTransitionEngine,
    pub board: Board,
    pub pipeline: Pipeline,
    pub other_pipeline: Pipeline,
    pub new_stage: Stage,
    pub won_stage: Stage,
    pub backlog_stage: Stage,
    pub ctx: MutationContext,
}

impl BoardFixture {
    pub async fn new() -> Self {
        Self::with_config(BoardConfig::default()).await
    }

    pub async fn with_config(config: BoardConfig) -> Self {
        let store = Arc::new(InMemoryBoardStore::new());
        let bus = Arc::new(BroadcastBus::new(config.events.channel_capacity));
        let sender = Arc::new(InMemoryNotificationSender::new());

        let board = Board::new("Sales board");
        let pipeline = Pipeline::new(board.id, "Sales");
        let other_pipeline = Pipeline::new(board.id, "Support");
        let new_stage = Stage::new(pipeline.id, "New");
        let won_stage = Stage::new(pipeline.id, "Won");
        let backlog_stage = Stage::new(other_pipeline.id, "Backlog");

        store.insert_board(board.clone()).await.unwrap();
        store.insert_pipeline(pipeline.clone()).await.unwrap();
        store.insert_pipeline(other_pipeline.clone()).await.unwrap();
        for stage in [&new_stage, &won_stage, &backlog_stage] {
            store.insert_stage(stage.clone()).await.unwrap();
        }

        let engine = StageTransitionEngine::new(store.clone(), bus.clone(), sender.clone(), &config);

        Self {
            store,
            bus,
            sender,
            engine,
            board,
            pipeline,
            other_pipeline,
            new_stage,
            won_stage,
            backlog_stage,
            ctx: MutationContext::new(Uuid::new_v4(), "process-1"),
        }
    }

    /// Add a deal to `stage_id` below `above`
    pub async fn add_deal(&self, name: &str, stage_id: Uuid, above: Option<Uuid>) -> BoardItem {
        self.engine
            .add_item(&self.ctx, NewItem::new(ItemType::Deal, name, stage_id), above)
            .await
            .unwrap()
    }

    /// Active deals of a stage in board order
    pub async fn stage_deals(&self, stage_id: Uuid) -> Vec<BoardItem> {
        self.store
            .find_items(&ItemFilter::active_in_stage(ItemType::Deal, stage_id))
            .await
            .unwrap()
    }

    pub async fn stage_names(&self, stage_id: Uuid) -> Vec<String> {
        self.stage_deals(stage_id)
            .await
            .into_iter()
            .map(|item| item.name)
            .collect()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PublishedMessage> {
        self.bus.subscribe()
    }
}

/// Everything published so far
pub fn drain(receiver: &mut broadcast::Receiver<PublishedMessage>) -> Vec<PublishedMessage> {
    let mut messages = Vec::new();
    while let Ok(message) = receiver.try_recv() {
        messages.push(message);
    }
    messages
}

/// `pipelinesChanged` bodies from a list of published messages
pub fn board_changes(messages: &[PublishedMessage]) -> Vec<serde_json::Value> {
    messages
        .iter()
        .filter(|message| message.topic == "pipelinesChanged")
        .map(|message| message.payload["pipelinesChanged"].clone())
        .collect()
}
