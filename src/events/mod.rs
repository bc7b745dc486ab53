pub mod change_event;
pub mod change_publisher;
pub mod publisher;

// Re-export key types for convenience
pub use change_event::{
    ChangeAction, ChangeEvent, ChangeEventData, ImportHistoryChanged, ImportProgress,
    PipelinesChanged,
};
pub use change_publisher::ChangeEventPublisher;
pub use publisher::{BroadcastBus, PubSubBus, PublishError, PublishedMessage};
