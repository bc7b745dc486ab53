use async_trait::async_trait;
use parking_lot::Mutex;

use super::types::Notification;
use crate::error::BoardResult;

/// Delivery channel for user notifications
#[async_trait]
pub trait NotificationSender: Send + Sync + 'static {
    async fn send_notification(&self, notification: Notification) -> BoardResult<()>;
}

/// Keeps every notification in memory; used by tests and local runs
#[derive(Debug, Default)]
pub struct InMemoryNotificationSender {
    sent: Mutex<Vec<Notification>>,
}

impl InMemoryNotificationSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().clone()
    }

    pub fn clear(&self) {
        self.sent.lock().clear();
    }
}

#[async_trait]
impl NotificationSender for InMemoryNotificationSender {
    async fn send_notification(&self, notification: Notification) -> BoardResult<()> {
        self.sent.lock().push(notification);
        Ok(())
    }
}
