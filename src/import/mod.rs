//! # Bulk Import
//!
//! Row-by-row creation of companies, customers, products and board items from
//! an uploaded sheet, with progress tracked in an import history record.
//!
//! ```text
//! rows ──► RecordStager ──► StagedRecord ──► ItemCreator ──► conformity links
//!               │                                   │
//!        ImportDirectory                     ImportHistoryStore ──► importHistoryChanged
//! ```

pub mod creator;
pub mod directory;
pub mod properties;
pub mod staging;
pub mod worker;

pub use creator::{BoardItemCreator, ContentType, ItemCreator, ItemCreatorRegistry};
pub use directory::{ImportDirectory, InMemoryImportDirectory};
pub use properties::PropertyDescriptor;
pub use staging::{CustomFieldValue, RecordStager, StagedRecord, StagedRecordBuilder};
pub use worker::{
    record_error_message, BulkImportWorker, ImportControl, ImportHandle, ImportJob, ImportOutcome,
};
