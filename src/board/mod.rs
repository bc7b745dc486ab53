//! # Board Mutations
//!
//! The stage transition engine and the per-stage locks that keep order
//! assignment consistent under concurrent moves.

pub mod inputs;
pub mod stage_locks;
pub mod transition;

pub use inputs::{ChangeStageRequest, ConformityEdit, ItemChanges, MutationContext, NewItem};
pub use stage_locks::{StageGuard, StageLocks};
pub use transition::StageTransitionEngine;
