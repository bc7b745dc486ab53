//! # Board Constants
//!
//! Topic names, wire action names and import statuses shared by the board core
//! and the realtime board clients that consume its events.

/// Pub/sub topics the board core publishes to
pub mod topics {
    pub const PIPELINES_CHANGED: &str = "pipelinesChanged";
    pub const IMPORT_HISTORY_CHANGED: &str = "importHistoryChanged";
}

/// Wire names of board change actions
pub mod actions {
    pub const ITEM_ADD: &str = "itemAdd";
    pub const ITEM_REMOVE: &str = "itemRemove";
    pub const ITEM_UPDATE: &str = "itemUpdate";
    pub const ORDER_UPDATED: &str = "orderUpdated";
}

/// Activity log actions written by the transition engine
pub mod activity {
    pub const ARCHIVED: &str = "archived";
    pub const ACTIVATED: &str = "activated";
    pub const ASSIGNEE: &str = "assignee";
}

/// Import history statuses
pub mod import_status {
    pub const IN_PROGRESS: &str = "In Progress";
    pub const DONE: &str = "Done";
    pub const CANCELLED: &str = "Cancelled";
}

/// Error messages raised by contact creators that get enriched with the offending value
pub mod duplicate_errors {
    pub const DUPLICATED_EMAIL: &str = "Duplicated email";
    pub const DUPLICATED_PHONE: &str = "Duplicated phone";
    pub const DUPLICATED_NAME: &str = "Duplicated name";
}

/// Suffix appended to the name of a copied board item
pub const COPY_SUFFIX: &str = " copy";
