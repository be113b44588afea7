use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, instrument, warn};

use crate::errors::SyncError;
use catalog_sync_repository::{CatalogStore, SearchIndexError, SearchIndexStore};
use catalog_sync_shared::{EntityType, GoodsSearchDocument};

/// What a sync call did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The document now matches the canonical record.
    Synced,
    /// The document is gone (or was never there).
    Removed,
    /// The entity type has no search projection; nothing was done.
    Unsupported(EntityType),
}

/// Idempotent synchronization of one entity into the search index.
#[async_trait]
pub trait SearchSync: Send + Sync {
    /// Make the search document for `id` match its current canonical record.
    ///
    /// Returns `SyncError::NotFound` when the catalog has no record for `id`.
    async fn sync_to_search(&self, entity: &EntityType, id: u64) -> Result<SyncOutcome, SyncError>;

    /// Remove the search document for `id`. Removing an absent document succeeds.
    async fn remove_from_search(
        &self,
        entity: &EntityType,
        id: u64,
    ) -> Result<SyncOutcome, SyncError>;
}

/// Write `document`, overwriting an existing document or creating it if the index has none.
pub async fn write_document(
    index: &dyn SearchIndexStore,
    document: &GoodsSearchDocument,
) -> Result<(), SearchIndexError> {
    match index.update_document(document).await {
        Ok(()) => Ok(()),
        Err(e) if e.is_not_found() => {
            debug!(goods_id = document.id, "No document to update, creating it");
            index.create_document(document).await
        }
        Err(e) => Err(e),
    }
}

/// [`SearchSync`] over a catalog store and a search index store.
///
/// Holds no state of its own: each call re-reads the catalog, so repeated or
/// reordered calls for the same id converge on the latest committed record.
pub struct SyncManager {
    catalog: Arc<dyn CatalogStore>,
    index: Arc<dyn SearchIndexStore>,
}

impl SyncManager {
    pub fn new(catalog: Arc<dyn CatalogStore>, index: Arc<dyn SearchIndexStore>) -> Self {
        Self { catalog, index }
    }
}

#[async_trait]
impl SearchSync for SyncManager {
    #[instrument(skip(self, entity), fields(entity = %entity))]
    async fn sync_to_search(&self, entity: &EntityType, id: u64) -> Result<SyncOutcome, SyncError> {
        if *entity != EntityType::Goods {
            warn!(goods_id = id, "No search projection for entity type, skipping sync");
            return Ok(SyncOutcome::Unsupported(entity.clone()));
        }

        let record = self.catalog.get_goods(id).await?;
        let document = GoodsSearchDocument::from(&record);
        write_document(self.index.as_ref(), &document).await?;

        debug!(goods_id = id, "Synced goods to search index");
        Ok(SyncOutcome::Synced)
    }

    #[instrument(skip(self, entity), fields(entity = %entity))]
    async fn remove_from_search(
        &self,
        entity: &EntityType,
        id: u64,
    ) -> Result<SyncOutcome, SyncError> {
        if *entity != EntityType::Goods {
            warn!(goods_id = id, "No search projection for entity type, skipping removal");
            return Ok(SyncOutcome::Unsupported(entity.clone()));
        }

        self.index.delete_document(id).await?;

        debug!(goods_id = id, "Removed goods from search index");
        Ok(SyncOutcome::Removed)
    }
}
