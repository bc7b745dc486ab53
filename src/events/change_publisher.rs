//! # Change Event Publisher
//!
//! Serializes board changes and import progress onto the pub/sub bus. Publishing
//! is best-effort: the store write has already happened, so failures are logged
//! and swallowed instead of failing the mutation.

use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use super::change_event::{
    ChangeAction, ChangeEvent, ChangeEventData, ImportHistoryChanged, ImportProgress,
    PipelinesChanged,
};
use super::publisher::PubSubBus;
use crate::config::EventsConfig;
use crate::models::ImportHistory;

#[derive(Clone)]
pub struct ChangeEventPublisher {
    bus: Arc<dyn PubSubBus>,
    pipelines_topic: String,
    import_topic: String,
}

impl std::fmt::Debug for ChangeEventPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeEventPublisher")
            .field("bus", &"PubSubBus")
            .field("pipelines_topic", &self.pipelines_topic)
            .field("import_topic", &self.import_topic)
            .finish()
    }
}

impl ChangeEventPublisher {
    pub fn new(bus: Arc<dyn PubSubBus>, config: &EventsConfig) -> Self {
        Self {
            bus,
            pipelines_topic: config.pipelines_topic.clone(),
            import_topic: config.import_topic.clone(),
        }
    }

    pub fn pipelines_topic(&self) -> &str {
        &self.pipelines_topic
    }

    /// Publish one board change for `pipeline_id`
    pub async fn publish(
        &self,
        pipeline_id: Uuid,
        process_id: &str,
        action: ChangeAction,
        data: ChangeEventData,
    ) {
        let item_id = data.item.id;
        let envelope = PipelinesChanged {
            pipelines_changed: ChangeEvent {
                pipeline_id,
                process_id: process_id.to_string(),
                action,
                data,
            },
        };

        let payload = match serde_json::to_value(&envelope) {
            Ok(payload) => payload,
            Err(error) => {
                warn!(%pipeline_id, %item_id, %error, "Failed to serialize change event");
                return;
            }
        };

        match self.bus.publish(&self.pipelines_topic, payload).await {
            Ok(()) => debug!(
                %pipeline_id,
                %item_id,
                action = action.as_str(),
                "Published board change"
            ),
            Err(error) => warn!(
                %pipeline_id,
                %item_id,
                action = action.as_str(),
                %error,
                "Failed to publish board change"
            ),
        }
    }

    /// Publish import progress with the percentage rounded to a whole number
    pub async fn publish_import_progress(&self, history: &ImportHistory, percentage: &str) {
        let envelope = ImportHistoryChanged {
            import_history_changed: ImportProgress {
                import_history_id: history.id,
                status: history.status.as_str().to_string(),
                percentage: percentage.to_string(),
            },
        };

        let payload = match serde_json::to_value(&envelope) {
            Ok(payload) => payload,
            Err(error) => {
                warn!(import_history_id = %history.id, %error, "Failed to serialize import progress");
                return;
            }
        };

        if let Err(error) = self.bus.publish(&self.import_topic, payload).await {
            warn!(import_history_id = %history.id, %error, "Failed to publish import progress");
        }
    }
}
