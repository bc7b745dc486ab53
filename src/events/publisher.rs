use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::broadcast;

/// Fire-and-forget publish/subscribe transport
#[async_trait]
pub trait PubSubBus: Send + Sync + 'static {
    /// Push one payload onto a named topic
    async fn publish(&self, topic: &str, payload: Value) -> Result<(), PublishError>;
}

/// In-process broadcast bus backed by `tokio::sync::broadcast`
#[derive(Debug, Clone)]
pub struct BroadcastBus {
    sender: broadcast::Sender<PublishedMessage>,
}

/// Message that has been published
#[derive(Debug, Clone)]
pub struct PublishedMessage {
    pub topic: String,
    pub payload: Value,
    pub published_at: chrono::DateTime<chrono::Utc>,
}

impl BroadcastBus {
    /// Create a new bus with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to every topic
    pub fn subscribe(&self) -> broadcast::Receiver<PublishedMessage> {
        self.sender.subscribe()
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[async_trait]
impl PubSubBus for BroadcastBus {
    async fn publish(&self, topic: &str, payload: Value) -> Result<(), PublishError> {
        let message = PublishedMessage {
            topic: topic.to_string(),
            payload,
            published_at: chrono::Utc::now(),
        };

        // No subscribers is fine: board clients may simply not be connected
        match self.sender.send(message) {
            Ok(_) => Ok(()),
            Err(broadcast::error::SendError(_)) => Ok(()),
        }
    }
}

/// Error types for event publishing
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("Event channel is closed")]
    ChannelClosed,
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Transport error: {0}")]
    Transport(String),
}

impl Default for BroadcastBus {
    fn default() -> Self {
        Self::new(1000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_publish_without_subscribers_is_ok() {
        let bus = BroadcastBus::new(4);
        assert_eq!(bus.subscriber_count(), 0);
        assert!(bus.publish("topic", json!({})).await.is_ok());
    }

    #[tokio::test]
    async fn test_subscriber_receives_topic_and_payload() {
        let bus = BroadcastBus::new(4);
        let mut receiver = bus.subscribe();

        bus.publish("pipelinesChanged", json!({"a": 1})).await.unwrap();

        let message = receiver.recv().await.unwrap();
        assert_eq!(message.topic, "pipelinesChanged");
        assert_eq!(message.payload, json!({"a": 1}));
    }
}
