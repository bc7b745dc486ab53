//! Property-based tests for ordering, assignment diffs and recipient resolution

mod common;

use proptest::prelude::*;
use std::collections::HashSet;
use uuid::Uuid;

use board_core::config::OrderingConfig;
use board_core::conformity::diff;
use board_core::notifications::resolve_recipients;
use board_core::ordering::{OrderAssigner, OrderDecision, OrderSlot};
use common::strategies::{stage_snapshot_strategy, user_set_strategy};

/// Apply a decision to a snapshot and insert the new slot after `above_index`
fn apply(stage: &[OrderSlot], decision: &OrderDecision, above_index: Option<usize>) -> Vec<OrderSlot> {
    let mut slots = match decision {
        OrderDecision::Insert(_) => stage.to_vec(),
        OrderDecision::Renumber { orders, .. } => orders.clone(),
    };
    let slot = OrderSlot {
        id: Uuid::new_v4(),
        order: decision.order(),
    };
    match above_index {
        Some(index) => slots.insert(index + 1, slot),
        None => slots.insert(0, slot),
    }
    slots
}

fn strictly_increasing(slots: &[OrderSlot]) -> bool {
    slots.windows(2).all(|pair| pair[0].order < pair[1].order)
}

proptest! {
    #[test]
    fn prop_new_order_sits_between_above_and_successor(
        stage in stage_snapshot_strategy(),
        pick in any::<prop::sample::Index>(),
    ) {
        let assigner = OrderAssigner::default();
        let index = pick.index(stage.len());
        let decision = assigner.compute_order(&stage, Some(stage[index].id)).unwrap();

        let reference = match &decision {
            OrderDecision::Insert(_) => stage.clone(),
            OrderDecision::Renumber { orders, .. } => orders.clone(),
        };
        let order = decision.order();

        prop_assert!(order > reference[index].order);
        if let Some(next) = reference.get(index + 1) {
            prop_assert!(order < next.order);
        }
    }

    #[test]
    fn prop_prepend_goes_below_first(stage in stage_snapshot_strategy()) {
        let decision = OrderAssigner::default().compute_order(&stage, None).unwrap();
        prop_assert!(!decision.needs_renumber());
        prop_assert!(decision.order() < stage[0].order);
    }

    #[test]
    fn prop_repeated_insertions_keep_stage_sorted(
        positions in prop::collection::vec(any::<prop::sample::Index>(), 1..60),
        prepend_mask in prop::collection::vec(any::<bool>(), 60),
    ) {
        let assigner = OrderAssigner::new(&OrderingConfig {
            min_gap: 0.01,
            renumber_step: 1.0,
        });
        let mut stage: Vec<OrderSlot> = Vec::new();
        let mut expected_ids: Vec<Uuid> = Vec::new();

        for (round, position) in positions.iter().enumerate() {
            let above_index = if stage.is_empty() || prepend_mask[round] {
                None
            } else {
                Some(position.index(stage.len()))
            };
            let above_id = above_index.map(|index| stage[index].id);

            let decision = assigner.compute_order(&stage, above_id).unwrap();
            stage = apply(&stage, &decision, above_index);

            let new_id = match above_index {
                Some(index) => stage[index + 1].id,
                None => stage[0].id,
            };
            match above_index {
                Some(index) => expected_ids.insert(index + 1, new_id),
                None => expected_ids.insert(0, new_id),
            }

            prop_assert!(strictly_increasing(&stage));
        }

        let ids: Vec<Uuid> = stage.iter().map(|slot| slot.id).collect();
        prop_assert_eq!(ids, expected_ids);
    }

    #[test]
    fn prop_diff_is_set_difference(old in user_set_strategy(), new in user_set_strategy()) {
        let result = diff(&old, &new);
        let old_set: HashSet<u8> = old.iter().copied().collect();
        let new_set: HashSet<u8> = new.iter().copied().collect();

        let added: HashSet<u8> = result.added_user_ids.iter().copied().collect();
        let removed: HashSet<u8> = result.removed_user_ids.iter().copied().collect();

        let expected_added: HashSet<u8> = new_set.difference(&old_set).copied().collect();
        let expected_removed: HashSet<u8> = old_set.difference(&new_set).copied().collect();

        prop_assert_eq!(&added, &expected_added);
        prop_assert_eq!(&removed, &expected_removed);
        prop_assert_eq!(added.len(), result.added_user_ids.len());
        prop_assert_eq!(removed.len(), result.removed_user_ids.len());
        prop_assert!(added.is_disjoint(&removed));
    }

    #[test]
    fn prop_diff_against_itself_is_empty(ids in user_set_strategy()) {
        prop_assert!(diff(&ids, &ids).is_empty());
    }

    #[test]
    fn prop_actor_never_receives(
        invited in user_set_strategy(),
        explicit in user_set_strategy(),
        actor in 0u8..12,
    ) {
        let alphabet: Vec<Uuid> = (0..12).map(|_| Uuid::new_v4()).collect();
        let to_ids = |raw: &[u8]| raw.iter().map(|i| alphabet[*i as usize]).collect::<Vec<_>>();
        let actor_id = alphabet[actor as usize];

        let recipients = resolve_recipients(&to_ids(&invited), &to_ids(&explicit), actor_id);

        prop_assert!(!recipients.contains(&actor_id));
        let unique: HashSet<&Uuid> = recipients.iter().collect();
        prop_assert_eq!(unique.len(), recipients.len());
    }
}

#[test]
fn test_diff_example_from_board_assignment() {
    let (a, b, c, d) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
    let result = diff(&[a, b, c], &[b, c, d]);
    assert_eq!(result.added_user_ids, vec![d]);
    assert_eq!(result.removed_user_ids, vec![a]);
}
