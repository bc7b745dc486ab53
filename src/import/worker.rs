//! # Bulk Import Worker
//!
//! Creates records from import rows on a spawned tokio task. Rows are processed
//! strictly one after another; a failing row is recorded in the import history
//! and the run moves on. Cancellation is cooperative: the flag is checked before
//! each row and records created before the cancel stay in place.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

use super::creator::{ContentType, ItemCreator, ItemCreatorRegistry};
use super::directory::ImportDirectory;
use super::properties::PropertyDescriptor;
use super::staging::{RecordStager, StagedRecord};
use crate::config::BoardConfig;
use crate::conformity::{ConformityLinker, ConformityType};
use crate::constants::duplicate_errors;
use crate::error::{BoardError, BoardResult};
use crate::events::{ChangeEventPublisher, PubSubBus};
use crate::models::{ImportHistory, ImportIncrement, ImportStatus};
use crate::store::{BoardStore, ImportHistoryStore};

/// One import run
#[derive(Debug, Clone)]
pub struct ImportJob {
    pub import_history_id: Uuid,
    pub content_type: ContentType,
    pub properties: Vec<PropertyDescriptor>,
    pub rows: Vec<Vec<String>>,
    pub user_id: Uuid,
    pub scope_brand_ids: Vec<String>,
}

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportOutcome {
    Completed,
    Cancelled,
}

/// Messages accepted by a running worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportControl {
    Cancel,
}

/// Handle to a spawned import run
#[derive(Debug)]
pub struct ImportHandle {
    import_history_id: Uuid,
    cancelled: Arc<AtomicBool>,
    control: mpsc::UnboundedSender<ImportControl>,
    join: JoinHandle<BoardResult<ImportOutcome>>,
}

impl ImportHandle {
    pub fn import_history_id(&self) -> Uuid {
        self.import_history_id
    }

    /// Stop before the next row. Rows already created are kept.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        // The worker may already be gone; the flag alone is enough then
        let _ = self.control.send(ImportControl::Cancel);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Wait for the run to end
    pub async fn join(self) -> BoardResult<ImportOutcome> {
        self.join
            .await
            .map_err(|e| BoardError::ImportError(format!("import task failed: {e}")))?
    }
}

/// Enrich creator errors that name a duplicated contact field with the value
pub fn record_error_message(message: &str, record: &StagedRecord) -> String {
    match message {
        duplicate_errors::DUPLICATED_EMAIL => format!("{message} {}", record.primary_email()),
        duplicate_errors::DUPLICATED_PHONE => format!("{message} {}", record.primary_phone()),
        duplicate_errors::DUPLICATED_NAME => format!("{message} {}", record.primary_name()),
        _ => message.to_string(),
    }
}

#[derive(Clone)]
pub struct BulkImportWorker {
    histories: Arc<dyn ImportHistoryStore>,
    directory: Arc<dyn ImportDirectory>,
    creators: ItemCreatorRegistry,
    stager: RecordStager,
    conformities: ConformityLinker,
    events: ChangeEventPublisher,
    progress_events: bool,
}

impl std::fmt::Debug for BulkImportWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BulkImportWorker")
            .field("creators", &self.creators)
            .field("progress_events", &self.progress_events)
            .finish()
    }
}

impl BulkImportWorker {
    pub fn new(
        store: Arc<dyn BoardStore>,
        histories: Arc<dyn ImportHistoryStore>,
        directory: Arc<dyn ImportDirectory>,
        creators: ItemCreatorRegistry,
        bus: Arc<dyn PubSubBus>,
        config: &BoardConfig,
    ) -> Self {
        Self {
            histories,
            stager: RecordStager::new(store.clone(), directory.clone()),
            directory,
            creators,
            conformities: ConformityLinker::new(store),
            events: ChangeEventPublisher::new(bus, &config.events),
            progress_events: config.import.progress_events,
        }
    }

    /// Start the run on a tokio task.
    ///
    /// Fails immediately, before any row is touched, when no creator is
    /// registered for the job's content type.
    pub fn spawn(self, job: ImportJob) -> BoardResult<ImportHandle> {
        let creator = self.creator_for(job.content_type)?;
        let cancelled = Arc::new(AtomicBool::new(false));
        let (control, inbox) = mpsc::unbounded_channel();
        let import_history_id = job.import_history_id;

        let flag = cancelled.clone();
        let join = tokio::spawn(async move {
            let result = self.process(job, creator, flag, inbox).await;
            if let Err(error) = &result {
                error!(%import_history_id, %error, "Bulk import aborted");
            }
            result
        });

        Ok(ImportHandle {
            import_history_id,
            cancelled,
            control,
            join,
        })
    }

    /// Run the job on the current task
    pub async fn run(&self, job: ImportJob, cancelled: Arc<AtomicBool>) -> BoardResult<ImportOutcome> {
        let creator = self.creator_for(job.content_type)?;
        let (_control, inbox) = mpsc::unbounded_channel();
        self.process(job, creator, cancelled, inbox).await
    }

    fn creator_for(&self, content_type: ContentType) -> BoardResult<Arc<dyn ItemCreator>> {
        self.creators.get(content_type).ok_or_else(|| {
            BoardError::ImportError(format!("Unsupported content type \"{content_type}\""))
        })
    }

    #[instrument(skip_all, fields(import_history_id = %job.import_history_id, content_type = %job.content_type, rows = job.rows.len()))]
    async fn process(
        &self,
        job: ImportJob,
        creator: Arc<dyn ItemCreator>,
        cancelled: Arc<AtomicBool>,
        mut inbox: mpsc::UnboundedReceiver<ImportControl>,
    ) -> BoardResult<ImportOutcome> {
        let history = self
            .histories
            .find_import_history(job.import_history_id)
            .await?
            .ok_or_else(|| BoardError::not_found("Import history", job.import_history_id))?;

        info!(total = history.total, "Bulk import started");

        if job.rows.is_empty() {
            let history = self.finish(history.id).await?;
            self.publish_progress(&history, "100").await;
            return Ok(ImportOutcome::Completed);
        }

        let percentage_per_row = 100.0 / job.rows.len() as f64;
        let mut published_percentage = String::from("0");

        for row in &job.rows {
            while let Ok(ImportControl::Cancel) = inbox.try_recv() {
                cancelled.store(true, Ordering::SeqCst);
            }

            if cancelled.load(Ordering::SeqCst) {
                let history = self
                    .histories
                    .set_import_status(job.import_history_id, ImportStatus::Cancelled, None)
                    .await?;
                info!(
                    success = history.success,
                    failed = history.failed,
                    "Bulk import cancelled"
                );
                let percentage = format!("{:.0}", history.percentage);
                self.publish_progress(&history, &percentage).await;
                return Ok(ImportOutcome::Cancelled);
            }

            let mut increment = ImportIncrement {
                percentage: percentage_per_row,
                ..ImportIncrement::default()
            };

            match self.import_row(&job, creator.as_ref(), row).await {
                Ok(id) => {
                    increment.success = 1;
                    increment.created_id = Some(id);
                }
                Err(message) => {
                    debug!(%message, "Import row failed");
                    increment.failed = 1;
                    increment.error_msgs.push(message);
                }
            }

            let mut history = self
                .histories
                .apply_import_increment(job.import_history_id, increment)
                .await?;

            if history.processed() == history.total {
                history = self.finish(history.id).await?;
            }

            let percentage = format!("{:.0}", history.percentage);
            if percentage != published_percentage {
                published_percentage = percentage;
                self.publish_progress(&history, &published_percentage).await;
            }
        }

        info!("Bulk import finished");
        Ok(ImportOutcome::Completed)
    }

    /// Stage, create and link one row; the error is the message stored in the history
    async fn import_row(
        &self,
        job: &ImportJob,
        creator: &dyn ItemCreator,
        row: &[String],
    ) -> Result<Uuid, String> {
        let record = self
            .stager
            .stage(
                job.content_type,
                &job.properties,
                row,
                job.user_id,
                &job.scope_brand_ids,
            )
            .await
            .map_err(|e| e.to_string())?;

        let id = creator
            .create(&record, job.user_id)
            .await
            .map_err(|e| record_error_message(&e.to_string(), &record))?;

        self.link_contacts(job.content_type, id, &record)
            .await
            .map_err(|e| e.to_string())?;

        Ok(id)
    }

    async fn link_contacts(
        &self,
        content_type: ContentType,
        id: Uuid,
        record: &StagedRecord,
    ) -> BoardResult<()> {
        let Some(main_type) = content_type.conformity_type() else {
            return Ok(());
        };

        if content_type != ContentType::Company && !record.companies_primary_names.is_empty() {
            let company_ids = self
                .directory
                .find_company_ids_by_primary_names(&record.companies_primary_names)
                .await?;
            self.conformities
                .link_many(main_type, id, ConformityType::Company, &company_ids)
                .await?;
        }

        if content_type != ContentType::Customer && !record.customers_primary_emails.is_empty() {
            let customer_ids = self
                .directory
                .find_customer_ids_by_primary_emails(&record.customers_primary_emails)
                .await?;
            self.conformities
                .link_many(main_type, id, ConformityType::Customer, &customer_ids)
                .await?;
        }

        Ok(())
    }

    async fn finish(&self, import_history_id: Uuid) -> BoardResult<ImportHistory> {
        self.histories
            .set_import_status(import_history_id, ImportStatus::Done, Some(100.0))
            .await
    }

    async fn publish_progress(&self, history: &ImportHistory, percentage: &str) {
        if !self.progress_events {
            return;
        }
        self.events.publish_import_progress(history, percentage).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_with(field: &str, value: &str) -> StagedRecord {
        let mut record = StagedRecord::default();
        record.fields.insert(field.to_string(), value.to_string());
        record
    }

    #[test]
    fn test_duplicate_errors_name_the_value() {
        let record = record_with("primaryEmail", "dup@example.com");
        assert_eq!(
            record_error_message("Duplicated email", &record),
            "Duplicated email dup@example.com"
        );

        let record = record_with("primaryPhone", "555");
        assert_eq!(
            record_error_message("Duplicated phone", &record),
            "Duplicated phone 555"
        );
    }

    #[test]
    fn test_other_errors_keep_their_message() {
        let record = StagedRecord::default();
        assert_eq!(record_error_message("Stage not found", &record), "Stage not found");
    }

    #[tokio::test]
    async fn test_handle_cancel_sets_flag_and_notifies() {
        let (control, mut inbox) = mpsc::unbounded_channel();
        let handle = ImportHandle {
            import_history_id: Uuid::new_v4(),
            cancelled: Arc::new(AtomicBool::new(false)),
            control,
            join: tokio::spawn(async { Ok(ImportOutcome::Completed) }),
        };

        handle.cancel();
        assert!(handle.is_cancelled());
        assert_eq!(inbox.recv().await, Some(ImportControl::Cancel));
        assert_eq!(handle.join().await.unwrap(), ImportOutcome::Completed);
    }
}
