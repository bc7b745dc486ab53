//! # Board Models
//!
//! Plain data types for boards, pipelines, stages, board items and the records
//! that hang off them. Persistence lives behind [`crate::store`].

pub mod activity_log;
pub mod board;
pub mod board_item;
pub mod import_history;

pub use activity_log::{ActivityLog, Checklist};
pub use board::{Board, Pipeline, Stage};
pub use board_item::{sort_by_order, BoardItem, ItemType, ProductData};
pub use import_history::{ImportHistory, ImportIncrement, ImportStatus};
