//! Set difference between an old and a new relation set.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::hash::Hash;
use uuid::Uuid;

/// Result of comparing two assignment sets
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentDiff<T = Uuid> {
    pub added_user_ids: Vec<T>,
    pub removed_user_ids: Vec<T>,
}

impl<T> AssignmentDiff<T> {
    pub fn is_empty(&self) -> bool {
        self.added_user_ids.is_empty() && self.removed_user_ids.is_empty()
    }
}

/// Compute `new \ old` and `old \ new`.
///
/// Results keep the order in which ids appear in the inputs and contain no
/// duplicates.
pub fn diff<T>(old_ids: &[T], new_ids: &[T]) -> AssignmentDiff<T>
where
    T: Eq + Hash + Clone,
{
    let old: HashSet<&T> = old_ids.iter().collect();
    let new: HashSet<&T> = new_ids.iter().collect();

    AssignmentDiff {
        added_user_ids: only_in(new_ids, &old),
        removed_user_ids: only_in(old_ids, &new),
    }
}

fn only_in<T>(source: &[T], other: &HashSet<&T>) -> Vec<T>
where
    T: Eq + Hash + Clone,
{
    let mut seen = HashSet::new();
    source
        .iter()
        .filter(|id| !other.contains(id) && seen.insert(*id))
        .cloned()
        .collect()
}
