use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::reconciler::BulkReconciler;
use catalog_sync_shared::SyncResult;

/// Request to resync goods into the search index.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SyncGoodsDataRequest {
    #[serde(default)]
    pub force_sync: bool,
    /// Ids to resync. Empty means the whole catalog.
    #[serde(default)]
    pub goods_ids: Vec<u64>,
    /// Prune orphaned documents after the resync even when it was not a forced full pass.
    #[serde(default)]
    pub prune_orphans: bool,
}

impl SyncGoodsDataRequest {
    /// Whether orphan pruning follows the resync.
    pub fn prunes_orphans(&self) -> bool {
        self.prune_orphans || (self.force_sync && self.goods_ids.is_empty())
    }
}

/// Result of a resync request.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SyncGoodsDataResponse {
    /// `false` only when the resync could not run at all; per-id failures are in `errors`.
    pub success: bool,
    pub message: String,
    pub synced_count: i32,
    pub failed_count: i32,
    pub errors: Vec<String>,
    /// Orphaned documents removed after a full pass.
    #[serde(default)]
    pub pruned_count: i32,
}

impl SyncGoodsDataResponse {
    fn completed(result: SyncResult, pruned: usize, prune_errors: Vec<String>) -> Self {
        let mut errors = result.errors;
        errors.extend(prune_errors);
        Self {
            success: true,
            message: "Data sync completed successfully".to_string(),
            synced_count: saturate(result.synced_count),
            failed_count: saturate(result.failed_count),
            errors,
            pruned_count: saturate(pruned),
        }
    }

    fn failed(message: String) -> Self {
        Self {
            success: false,
            message,
            ..Default::default()
        }
    }
}

fn saturate(count: usize) -> i32 {
    i32::try_from(count).unwrap_or(i32::MAX)
}

/// Entry point for operator-triggered resyncs.
pub struct DataSyncService {
    reconciler: Arc<BulkReconciler>,
}

impl DataSyncService {
    pub fn new(reconciler: Arc<BulkReconciler>) -> Self {
        Self { reconciler }
    }

    /// Run a resync and summarize it.
    ///
    /// A forced full-catalog pass, or a request with `prune_orphans`, is followed by
    /// orphan pruning so that documents without a committed row are removed as well.
    pub async fn sync_goods_data(
        &self,
        request: SyncGoodsDataRequest,
        cancel: &CancellationToken,
    ) -> SyncGoodsDataResponse {
        info!(
            force_sync = request.force_sync,
            goods_ids = ?request.goods_ids,
            "Starting data sync"
        );

        let result = match self
            .reconciler
            .sync_all_goods_to_search(request.force_sync, &request.goods_ids, cancel)
            .await
        {
            Ok(result) => result,
            Err(e) => {
                error!(error = %e, "Data sync failed");
                return SyncGoodsDataResponse::failed(e.to_string());
            }
        };

        let (pruned, prune_errors) = if request.prunes_orphans() && !cancel.is_cancelled() {
            self.prune_after_sync(cancel).await
        } else {
            (0, Vec::new())
        };

        info!(
            synced = result.synced_count,
            failed = result.failed_count,
            pruned = pruned,
            "Data sync completed"
        );
        SyncGoodsDataResponse::completed(result, pruned, prune_errors)
    }

    async fn prune_after_sync(&self, cancel: &CancellationToken) -> (usize, Vec<String>) {
        match self.reconciler.prune_orphaned_documents(cancel).await {
            Ok(prune) => (prune.removed_count, prune.errors),
            Err(e) => {
                error!(error = %e, "Orphan pruning failed");
                (0, vec![format!("orphan pruning: {}", e)])
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_wire_shape() {
        let request: SyncGoodsDataRequest =
            serde_json::from_value(json!({ "forceSync": true, "goodsIds": [1, 2] })).unwrap();
        assert!(request.force_sync);
        assert_eq!(request.goods_ids, vec![1, 2]);

        assert!(!request.prunes_orphans());

        let empty: SyncGoodsDataRequest = serde_json::from_value(json!({})).unwrap();
        assert_eq!(empty, SyncGoodsDataRequest::default());
    }

    #[test]
    fn test_full_forced_pass_prunes_orphans() {
        let full = SyncGoodsDataRequest {
            force_sync: true,
            ..Default::default()
        };
        let explicit = SyncGoodsDataRequest {
            prune_orphans: true,
            goods_ids: vec![4],
            ..Default::default()
        };

        assert!(full.prunes_orphans());
        assert!(explicit.prunes_orphans());
        assert!(!SyncGoodsDataRequest::default().prunes_orphans());
    }

    #[test]
    fn test_response_from_partial_failure() {
        let mut result = SyncResult::default();
        result.record_success();
        result.record_failure(2, "timeout");

        let response = SyncGoodsDataResponse::completed(result, 0, Vec::new());
        let value = serde_json::to_value(&response).unwrap();

        assert_eq!(value["success"], json!(true));
        assert_eq!(value["syncedCount"], json!(1));
        assert_eq!(value["failedCount"], json!(1));
        assert_eq!(value["errors"], json!(["goods 2: timeout"]));
    }

    #[test]
    fn test_saturating_counts() {
        assert_eq!(saturate(usize::MAX), i32::MAX);
        assert_eq!(saturate(3), 3);
    }
}
