use std::collections::HashSet;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::errors::SyncError;
use crate::sync::SearchSync;
use catalog_sync_repository::{CatalogStore, SearchIndexStore};
use catalog_sync_shared::{EntityType, SyncResult};

/// Number of index ids inspected per page while pruning.
pub const DEFAULT_PRUNE_PAGE_SIZE: usize = 500;

/// Outcome of an orphan pruning pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PruneResult {
    /// Documents inspected.
    pub scanned_count: usize,
    /// Documents removed because the catalog has no record for them.
    pub removed_count: usize,
    pub errors: Vec<String>,
}

/// Drives the sync primitive across many ids.
pub struct BulkReconciler {
    catalog: Arc<dyn CatalogStore>,
    index: Arc<dyn SearchIndexStore>,
    sync: Arc<dyn SearchSync>,
    prune_page_size: usize,
}

impl BulkReconciler {
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        index: Arc<dyn SearchIndexStore>,
        sync: Arc<dyn SearchSync>,
    ) -> Self {
        Self {
            catalog,
            index,
            sync,
            prune_page_size: DEFAULT_PRUNE_PAGE_SIZE,
        }
    }

    /// Set the page size used by [`prune_orphaned_documents`](Self::prune_orphaned_documents).
    pub fn with_prune_page_size(mut self, page_size: usize) -> Self {
        self.prune_page_size = page_size.max(1);
        self
    }

    /// Sync every id in `goods_ids`, or every catalog id when `goods_ids` is empty.
    ///
    /// `force_sync` is recorded for the caller's policy; it does not change how each
    /// id is synced. Cancelling `cancel` stops issuing new work; documents already
    /// written stay written and are counted in the result.
    ///
    /// # Returns
    ///
    /// * `Ok(SyncResult)` - Per-id outcome counts, including partial failures
    /// * `Err(SyncError)` - Only if the catalog id set could not be enumerated
    #[instrument(skip(self, goods_ids, cancel), fields(explicit_ids = goods_ids.len()))]
    pub async fn sync_all_goods_to_search(
        &self,
        force_sync: bool,
        goods_ids: &[u64],
        cancel: &CancellationToken,
    ) -> Result<SyncResult, SyncError> {
        let work_set = if goods_ids.is_empty() {
            self.catalog.get_all_goods_ids().await?
        } else {
            goods_ids.to_vec()
        };

        info!(
            force_sync = force_sync,
            total = work_set.len(),
            "Starting bulk sync of goods to search index"
        );

        let mut result = SyncResult::default();
        for id in work_set.iter().copied() {
            if cancel.is_cancelled() {
                warn!(
                    synced = result.synced_count,
                    failed = result.failed_count,
                    remaining = work_set.len() - result.attempted(),
                    "Bulk sync cancelled"
                );
                break;
            }

            match self.sync.sync_to_search(&EntityType::Goods, id).await {
                Ok(_) => result.record_success(),
                Err(e) => {
                    warn!(goods_id = id, error = %e, "Failed to sync goods");
                    result.record_failure(id, &e);
                }
            }
        }

        info!(
            synced = result.synced_count,
            failed = result.failed_count,
            "Bulk sync finished"
        );
        Ok(result)
    }

    /// Remove every search document whose id has no catalog record.
    ///
    /// Pages through the index in id order. Lookups and removals that fail are
    /// recorded and skipped.
    #[instrument(skip(self, cancel))]
    pub async fn prune_orphaned_documents(
        &self,
        cancel: &CancellationToken,
    ) -> Result<PruneResult, SyncError> {
        let mut result = PruneResult::default();
        let mut after = None;

        loop {
            if cancel.is_cancelled() {
                warn!(scanned = result.scanned_count, "Orphan pruning cancelled");
                break;
            }

            let page = self
                .index
                .scan_document_ids(after, self.prune_page_size)
                .await?;
            let Some(last) = page.last().copied() else {
                break;
            };
            result.scanned_count += page.len();

            let existing: HashSet<u64> = self
                .catalog
                .list_goods_by_ids(&page)
                .await?
                .into_iter()
                .map(|record| record.id)
                .collect();

            for id in page.into_iter().filter(|id| !existing.contains(id)) {
                match self.sync.remove_from_search(&EntityType::Goods, id).await {
                    Ok(_) => {
                        debug!(goods_id = id, "Removed orphaned document");
                        result.removed_count += 1;
                    }
                    Err(e) => {
                        warn!(goods_id = id, error = %e, "Failed to remove orphaned document");
                        result.errors.push(format!("goods {}: {}", id, e));
                    }
                }
            }

            after = Some(last);
        }

        info!(
            scanned = result.scanned_count,
            removed = result.removed_count,
            failed = result.errors.len(),
            "Orphan pruning finished"
        );
        Ok(result)
    }
}
