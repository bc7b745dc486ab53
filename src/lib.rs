#![allow(clippy::doc_markdown)] // Allow technical terms like PostgreSQL, SQLx in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Board Core
//!
//! Ordering and stage-transition core for kanban-style CRM boards.
//!
//! ## Overview
//!
//! Deals, tasks, tickets and growth hacks live in the stages of a pipeline. This
//! crate decides where an item lands when it is created, dragged or restored,
//! moves it between stages, and tells everyone who cares: realtime boards via a
//! pub/sub topic and the people involved via notifications. A bulk import worker
//! creates items and contacts from uploaded sheets.
//!
//! ## Module Organization
//!
//! - [`board`] - Stage transition engine and per-stage locks
//! - [`ordering`] - Gap-aware order assignment and the bulk sequential counter
//! - [`state_machine`] - Active / archived item lifecycle
//! - [`conformity`] - Assignment diffs and company / customer links
//! - [`events`] - `pipelinesChanged` and `importHistoryChanged` publishing
//! - [`notifications`] - Recipient resolution and deep links
//! - [`import`] - Bulk import worker
//! - [`store`] - Persistence traits, in-memory and Postgres stores
//! - [`config`] - Layered configuration
//! - [`error`] - Structured error handling
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use board_core::board::{MutationContext, NewItem, StageTransitionEngine};
//! use board_core::config::BoardConfig;
//! use board_core::events::BroadcastBus;
//! use board_core::models::ItemType;
//! use board_core::notifications::InMemoryNotificationSender;
//! use board_core::store::InMemoryBoardStore;
//! use uuid::Uuid;
//!
//! # async fn example(stage_id: Uuid) -> board_core::BoardResult<()> {
//! let config = BoardConfig::default();
//! let engine = StageTransitionEngine::new(
//!     Arc::new(InMemoryBoardStore::new()),
//!     Arc::new(BroadcastBus::new(config.events.channel_capacity)),
//!     Arc::new(InMemoryNotificationSender::new()),
//!     &config,
//! );
//!
//! let ctx = MutationContext::new(Uuid::new_v4(), "tab-1");
//! let deal = engine
//!     .add_item(&ctx, NewItem::new(ItemType::Deal, "Renewal", stage_id), None)
//!     .await?;
//! println!("deal {} placed at {}", deal.id, deal.order);
//! # Ok(())
//! # }
//! ```

pub mod board;
pub mod config;
pub mod conformity;
pub mod constants;
pub mod error;
pub mod events;
pub mod import;
pub mod logging;
pub mod models;
pub mod notifications;
pub mod ordering;
pub mod state_machine;
pub mod store;

pub use board::{ChangeStageRequest, ItemChanges, MutationContext, NewItem, StageTransitionEngine};
pub use config::{BoardConfig, ConfigManager};
pub use error::{BoardError, BoardResult};
pub use events::{BroadcastBus, ChangeAction, ChangeEventPublisher, PubSubBus};
pub use import::{BulkImportWorker, ImportHandle, ImportJob, ImportOutcome};
pub use models::{BoardItem, ItemType, Pipeline, Stage};
pub use ordering::{OrderAssigner, OrderDecision};
pub use state_machine::ItemStatus;
pub use store::{BoardStore, ImportHistoryStore, InMemoryBoardStore};
