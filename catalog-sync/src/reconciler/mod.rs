//! Bulk reconciliation of the search index against the catalog.
//!
//! Used for initial index population, disaster recovery and operator-triggered
//! resyncs. Every batch is best effort: one id's failure is recorded and the
//! rest of the batch still runs.

mod bulk;

pub use bulk::{BulkReconciler, PruneResult, DEFAULT_PRUNE_PAGE_SIZE};
