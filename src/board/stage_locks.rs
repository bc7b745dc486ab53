use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

type LockMap = DashMap<Uuid, Arc<Mutex<()>>>;

/// One async mutex per stage.
///
/// Held across the read-modify-write of `order` so two moves into the same stage
/// cannot compute the same slot. Entries exist only while a guard or a waiter
/// holds them; the last guard out removes its stage from the map.
#[derive(Debug, Default, Clone)]
pub struct StageLocks {
    locks: Arc<LockMap>,
}

impl StageLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, stage_id: Uuid) -> StageGuard {
        let mutex = self
            .locks
            .entry(stage_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        StageGuard {
            stage_id,
            locks: self.locks.clone(),
            guard: Some(mutex.lock_owned().await),
        }
    }

    /// Number of stages currently held or waited on
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

/// Exclusive hold on one stage; releasing it prunes the stage's idle mutex
#[derive(Debug)]
pub struct StageGuard {
    stage_id: Uuid,
    locks: Arc<LockMap>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl StageGuard {
    pub fn stage_id(&self) -> Uuid {
        self.stage_id
    }
}

impl Drop for StageGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        // Only the map's own handle left: nobody holds or awaits this stage.
        self.locks
            .remove_if(&self.stage_id, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_stage_is_exclusive() {
        let locks = StageLocks::new();
        let stage = Uuid::new_v4();

        let guard = locks.lock(stage).await;
        let contender = locks.clone();
        let waiting = tokio::spawn(async move {
            let _guard = contender.lock(stage).await;
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiting.is_finished());

        drop(guard);
        waiting.await.unwrap();
    }

    #[tokio::test]
    async fn test_different_stages_do_not_block() {
        let locks = StageLocks::new();
        let _a = locks.lock(Uuid::new_v4()).await;
        let _b = locks.lock(Uuid::new_v4()).await;
        assert_eq!(locks.len(), 2);
    }

    #[tokio::test]
    async fn test_released_stages_are_pruned() {
        let locks = StageLocks::new();
        for _ in 0..50 {
            let guard = locks.lock(Uuid::new_v4()).await;
            assert_eq!(locks.len(), 1);
            drop(guard);
        }
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_waiter_keeps_stage_entry_alive() {
        let locks = StageLocks::new();
        let stage = Uuid::new_v4();

        let guard = locks.lock(stage).await;
        let contender = locks.clone();
        let (acquired_tx, acquired_rx) = tokio::sync::oneshot::channel();
        let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();
        let waiting = tokio::spawn(async move {
            let guard = contender.lock(stage).await;
            acquired_tx.send(guard.stage_id()).unwrap();
            release_rx.await.unwrap();
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        drop(guard);
        assert_eq!(acquired_rx.await.unwrap(), stage);
        assert_eq!(locks.len(), 1);

        release_tx.send(()).unwrap();
        waiting.await.unwrap();
        assert!(locks.is_empty());
    }
}
