//! Proptest strategies for board ordering and assignment sets

use proptest::prelude::*;
use uuid::Uuid;

use board_core::ordering::OrderSlot;

/// A stage snapshot with strictly increasing orders
pub fn stage_snapshot_strategy() -> impl Strategy<Value = Vec<OrderSlot>> {
    prop::collection::vec(0.001f64..1000.0, 1..30).prop_map(|gaps| {
        let mut order = -500.0;
        gaps.into_iter()
            .map(|gap| {
                order += gap;
                OrderSlot {
                    id: Uuid::new_v4(),
                    order,
                }
            })
            .collect()
    })
}

/// Small id alphabet so old and new sets overlap often
pub fn user_set_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(0u8..12, 0..10)
}
