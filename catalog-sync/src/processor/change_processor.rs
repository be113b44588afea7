//! Change event processor.
//!
//! Applies the catalog's change events to the search index. Row payloads are only
//! read for their `id`; the indexed state always comes from re-reading the catalog,
//! so duplicated and reordered events are harmless.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, error, warn};

use crate::errors::{IngestError, SyncError};
use crate::sync::SearchSync;
use catalog_sync_shared::{parse_goods_id, ChangeEvent, ChangeOperation, EntityType, RowImage};

/// Counts from processing one batch of change events.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Events received.
    pub events: usize,
    /// Events dropped for coming from another database or carrying DDL.
    pub filtered_events: usize,
    /// Events accepted but with nothing to apply (non-goods tables, other statements).
    pub ignored_events: usize,
    /// Rows whose document was synced from the catalog.
    pub synced_rows: usize,
    /// Rows whose document was removed by a DELETE.
    pub removed_rows: usize,
    /// Rows skipped because their id could not be parsed.
    pub skipped_rows: usize,
    /// INSERT/UPDATE rows whose record no longer exists; their document was removed.
    pub missing_rows: usize,
}

impl BatchReport {
    /// Rows that touched the index.
    pub fn applied_rows(&self) -> usize {
        self.synced_rows + self.removed_rows + self.missing_rows
    }
}

/// Processor that turns change events into sync calls.
pub struct ChangeProcessor {
    sync: Arc<dyn SearchSync>,
    database: String,
}

impl ChangeProcessor {
    /// Create a processor for events from `database`.
    pub fn new(sync: Arc<dyn SearchSync>, database: impl Into<String>) -> Self {
        Self {
            sync,
            database: database.into(),
        }
    }

    /// Process a batch of events.
    ///
    /// Malformed rows are skipped and logged. Any sync error stops processing and
    /// fails the whole batch so it is redelivered; rows already applied are safe to
    /// apply again.
    pub async fn process_batch(&self, events: &[ChangeEvent]) -> Result<BatchReport, IngestError> {
        let mut report = BatchReport::default();

        for event in events {
            self.process_event(event, &mut report).await?;
        }

        debug!(
            events = report.events,
            filtered = report.filtered_events,
            ignored = report.ignored_events,
            synced = report.synced_rows,
            removed = report.removed_rows,
            skipped = report.skipped_rows,
            "Processed change event batch"
        );
        Ok(report)
    }

    async fn process_event(
        &self,
        event: &ChangeEvent,
        report: &mut BatchReport,
    ) -> Result<(), SyncError> {
        report.events += 1;

        if event.database != self.database {
            debug!(database = %event.database, "Skipping event from another database");
            report.filtered_events += 1;
            return Ok(());
        }
        if event.is_ddl {
            debug!(table = %event.table, "Skipping DDL event");
            report.filtered_events += 1;
            return Ok(());
        }

        match EntityType::from_table(&event.table) {
            EntityType::Goods => self.handle_goods(event, report).await,
            EntityType::Brands
            | EntityType::Category
            | EntityType::CategoryBrand
            | EntityType::Banner => {
                // Dependent goods are not reindexed on reference table changes.
                debug!(table = %event.table, operation = %event.operation, "No handler for catalog table");
                report.ignored_events += 1;
                Ok(())
            }
            EntityType::Unsupported(table) => {
                debug!(table = %table, "Ignoring event for unknown table");
                report.ignored_events += 1;
                Ok(())
            }
        }
    }

    async fn handle_goods(
        &self,
        event: &ChangeEvent,
        report: &mut BatchReport,
    ) -> Result<(), SyncError> {
        match &event.operation {
            ChangeOperation::Insert | ChangeOperation::Update => {
                for id in Self::row_ids(event, &event.data, report) {
                    self.sync_row(id, report).await?;
                }
            }
            ChangeOperation::Delete => {
                for id in Self::row_ids(event, event.deleted_rows(), report) {
                    self.sync.remove_from_search(&EntityType::Goods, id).await?;
                    report.removed_rows += 1;
                }
            }
            ChangeOperation::Other(tag) => {
                debug!(operation = %tag, "Ignoring goods event with unhandled operation");
                report.ignored_events += 1;
            }
        }
        Ok(())
    }

    async fn sync_row(&self, id: u64, report: &mut BatchReport) -> Result<(), SyncError> {
        match self.sync.sync_to_search(&EntityType::Goods, id).await {
            Ok(_) => {
                report.synced_rows += 1;
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                // The row was deleted after this event was produced.
                warn!(goods_id = id, "Goods no longer in catalog, removing its document");
                self.sync.remove_from_search(&EntityType::Goods, id).await?;
                report.missing_rows += 1;
                Ok(())
            }
            Err(e) => {
                error!(goods_id = id, error = %e, "Failed to sync goods");
                Err(e)
            }
        }
    }

    /// Parse the `id` of every row, skipping (and logging) rows where that fails.
    fn row_ids(event: &ChangeEvent, rows: &[RowImage], report: &mut BatchReport) -> Vec<u64> {
        rows.iter()
            .filter_map(|row| {
                let Some(columns) = row.as_object() else {
                    error!(
                        table = %event.table,
                        operation = %event.operation,
                        es = event.es,
                        row = %row,
                        "Skipping row that is not an object"
                    );
                    report.skipped_rows += 1;
                    return None;
                };
                let raw = columns.get("id").unwrap_or(&Value::Null);
                match parse_goods_id(raw) {
                    Ok(id) => Some(id),
                    Err(e) => {
                        error!(
                            table = %event.table,
                            operation = %event.operation,
                            es = event.es,
                            raw_id = %raw,
                            error = %e,
                            "Skipping row with malformed id"
                        );
                        report.skipped_rows += 1;
                        None
                    }
                }
            })
            .collect()
    }
}
