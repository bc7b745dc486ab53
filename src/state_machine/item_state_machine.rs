use super::events::ItemEvent;
use super::states::ItemStatus;
use crate::error::{BoardError, BoardResult};

/// Outcome of applying a status change request to an item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusTransition {
    /// Requested status equals the current one
    Unchanged,
    /// `active -> archived`
    Archived,
    /// `archived -> active`
    Activated,
}

/// Status lifecycle for board items.
///
/// Both directions are always permitted; there is no guard beyond the item
/// existing, which the caller has already checked.
#[derive(Debug, Clone, Copy, Default)]
pub struct ItemStateMachine;

impl ItemStateMachine {
    /// Determine the target state based on current state and event
    pub fn determine_target_state(
        &self,
        current: ItemStatus,
        event: ItemEvent,
    ) -> BoardResult<ItemStatus> {
        match (current, event) {
            (ItemStatus::Active, ItemEvent::Archive) => Ok(ItemStatus::Archived),
            (ItemStatus::Archived, ItemEvent::Restore) => Ok(ItemStatus::Active),
            (from, event) => Err(BoardError::InvalidOperation(format!(
                "cannot {} an item that is {from}",
                event.event_type()
            ))),
        }
    }

    /// Classify a requested status against the stored one
    pub fn classify(&self, current: ItemStatus, requested: Option<ItemStatus>) -> StatusTransition {
        let Some(requested) = requested else {
            return StatusTransition::Unchanged;
        };

        if requested == current {
            return StatusTransition::Unchanged;
        }

        match self.determine_target_state(current, ItemEvent::toward(requested)) {
            Ok(ItemStatus::Archived) => StatusTransition::Archived,
            Ok(ItemStatus::Active) => StatusTransition::Activated,
            Err(_) => StatusTransition::Unchanged,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_transitions() {
        let sm = ItemStateMachine;

        assert_eq!(
            sm.determine_target_state(ItemStatus::Active, ItemEvent::Archive)
                .unwrap(),
            ItemStatus::Archived
        );
        assert_eq!(
            sm.determine_target_state(ItemStatus::Archived, ItemEvent::Restore)
                .unwrap(),
            ItemStatus::Active
        );
    }

    #[test]
    fn test_invalid_transitions() {
        let sm = ItemStateMachine;

        assert!(sm
            .determine_target_state(ItemStatus::Active, ItemEvent::Restore)
            .is_err());
        assert!(sm
            .determine_target_state(ItemStatus::Archived, ItemEvent::Archive)
            .is_err());
    }

    #[test]
    fn test_classify() {
        let sm = ItemStateMachine;

        assert_eq!(sm.classify(ItemStatus::Active, None), StatusTransition::Unchanged);
        assert_eq!(
            sm.classify(ItemStatus::Active, Some(ItemStatus::Active)),
            StatusTransition::Unchanged
        );
        assert_eq!(
            sm.classify(ItemStatus::Active, Some(ItemStatus::Archived)),
            StatusTransition::Archived
        );
        assert_eq!(
            sm.classify(ItemStatus::Archived, Some(ItemStatus::Active)),
            StatusTransition::Activated
        );
    }
}
