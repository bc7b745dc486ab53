use parking_lot::Mutex;
use std::collections::HashMap;
use uuid::Uuid;

/// Per-stage running counter used while bulk-creating items.
///
/// Each stage starts at `0` for the lifetime of the counter, regardless of the
/// orders already present in the stage, so imported items may share an order
/// with existing ones.
#[derive(Debug, Default)]
pub struct SequentialOrder {
    counters: Mutex<HashMap<Uuid, u64>>,
}

impl SequentialOrder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Order for the next item created in `stage_id`
    pub fn next(&self, stage_id: Uuid) -> f64 {
        let mut counters = self.counters.lock();
        let counter = counters.entry(stage_id).or_insert(0);
        let order = *counter as f64;
        *counter += 1;
        order
    }

    /// Number of items assigned so far in `stage_id`
    pub fn assigned(&self, stage_id: Uuid) -> u64 {
        self.counters.lock().get(&stage_id).copied().unwrap_or(0)
    }
}
