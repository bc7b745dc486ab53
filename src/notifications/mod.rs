//! User notifications for board item changes.

pub mod dispatcher;
pub mod sender;
pub mod types;

pub use dispatcher::{board_link, resolve_recipients, NotificationDispatcher};
pub use sender::{InMemoryNotificationSender, NotificationSender};
pub use types::{Notification, NotificationKind, NotificationRequest};
