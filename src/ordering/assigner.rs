//! # Order Assigner
//!
//! Computes the `order` value of an item inserted into a stage. The stage is
//! passed in as a snapshot of its active items sorted ascending; the item being
//! placed must not be part of the snapshot.
//!
//! Placement rules:
//!
//! - empty stage: `0`
//! - no `above` item: strictly below the current minimum (prepend)
//! - `above` item is last: `above + step`
//! - otherwise: midpoint between `above` and its successor
//!
//! Midpoints halve the gap on every insertion between the same neighbours. Once
//! the gap drops below `min_gap` the whole stage is renumbered to
//! `0, step, 2 * step, ...` and the new item takes the midpoint of the fresh gap.
//! Archived items keep their place in the stage, so the engine renumbers the
//! full stage with [`OrderAssigner::renumber_after`] rather than the active
//! snapshot alone.

use uuid::Uuid;

use crate::config::OrderingConfig;
use crate::error::{BoardError, BoardResult};
use crate::models::BoardItem;

/// Position of one active item in a stage
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrderSlot {
    pub id: Uuid,
    pub order: f64,
}

impl From<&BoardItem> for OrderSlot {
    fn from(item: &BoardItem) -> Self {
        Self {
            id: item.id,
            order: item.order,
        }
    }
}

/// What the caller has to write to place the item
#[derive(Debug, Clone, PartialEq)]
pub enum OrderDecision {
    /// Use this order; no other item changes
    Insert(f64),
    /// Rewrite the stage's orders first, then use `order`
    Renumber {
        orders: Vec<OrderSlot>,
        order: f64,
    },
}

impl OrderDecision {
    /// Order the new item ends up with
    pub fn order(&self) -> f64 {
        match self {
            Self::Insert(order) => *order,
            Self::Renumber { order, .. } => *order,
        }
    }

    pub fn needs_renumber(&self) -> bool {
        matches!(self, Self::Renumber { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrderAssigner {
    min_gap: f64,
    step: f64,
}

impl Default for OrderAssigner {
    fn default() -> Self {
        Self::new(&OrderingConfig::default())
    }
}

impl OrderAssigner {
    pub fn new(config: &OrderingConfig) -> Self {
        Self {
            min_gap: config.min_gap,
            step: config.renumber_step,
        }
    }

    /// Compute the order for an item placed directly after `above_item_id`
    pub fn compute_order(
        &self,
        stage: &[OrderSlot],
        above_item_id: Option<Uuid>,
    ) -> BoardResult<OrderDecision> {
        let Some(above_id) = above_item_id else {
            return Ok(match stage.first() {
                None => OrderDecision::Insert(0.0),
                Some(first) => OrderDecision::Insert(first.order - self.step),
            });
        };

        let index = stage
            .iter()
            .position(|slot| slot.id == above_id)
            .ok_or_else(|| BoardError::not_found("Above item", above_id))?;

        let above = stage[index].order;

        let Some(next) = stage.get(index + 1) else {
            return Ok(OrderDecision::Insert(above + self.step));
        };

        let midpoint = above + (next.order - above) / 2.0;
        let gap_ok = next.order - above >= self.min_gap * 2.0;

        if gap_ok && midpoint > above && midpoint < next.order {
            return Ok(OrderDecision::Insert(midpoint));
        }

        Ok(self.renumbered(stage, index))
    }

    /// Renumber every item of `stage` (any status, sorted ascending) and place
    /// the new item right after `above_item_id`
    pub fn renumber_after(
        &self,
        stage: &[OrderSlot],
        above_item_id: Uuid,
    ) -> BoardResult<OrderDecision> {
        let index = stage
            .iter()
            .position(|slot| slot.id == above_item_id)
            .ok_or_else(|| BoardError::not_found("Above item", above_item_id))?;

        Ok(self.renumbered(stage, index))
    }

    fn renumbered(&self, stage: &[OrderSlot], above_index: usize) -> OrderDecision {
        let orders = stage
            .iter()
            .enumerate()
            .map(|(position, slot)| OrderSlot {
                id: slot.id,
                order: position as f64 * self.step,
            })
            .collect();

        OrderDecision::Renumber {
            orders,
            order: (above_index as f64 + 0.5) * self.step,
        }
    }
}
