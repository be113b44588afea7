use std::sync::Arc;

use tracing::{error, info, instrument, warn};

use crate::errors::SyncError;
use crate::sync::write_document;
use catalog_sync_repository::{CatalogStore, CatalogTransaction, SearchIndexStore};
use catalog_sync_shared::{GoodsRecord, GoodsSearchDocument, NewGoods};

/// Goods mutation service.
///
/// Each mutation runs inside one catalog transaction. With service sync enabled
/// the index write happens after the relational write and before the commit, and
/// an index failure rolls the relational write back:
///
/// 1. validate references
/// 2. write the row (uncommitted)
/// 3. write the search document
/// 4. commit
///
/// A commit that fails after step 3 leaves a document with no committed row. That
/// window is not compensated here; `BulkReconciler::prune_orphaned_documents`
/// removes such documents.
///
/// With service sync disabled only steps 1, 2 and 4 run and the index converges
/// through the change-event consumer.
pub struct GoodsService {
    catalog: Arc<dyn CatalogStore>,
    index: Arc<dyn SearchIndexStore>,
    enable_service_sync: bool,
}

impl GoodsService {
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        index: Arc<dyn SearchIndexStore>,
        enable_service_sync: bool,
    ) -> Self {
        Self {
            catalog,
            index,
            enable_service_sync,
        }
    }

    /// Create a goods row and return it as committed.
    #[instrument(skip(self, goods), fields(name = %goods.name))]
    pub async fn create(&self, goods: NewGoods) -> Result<GoodsRecord, SyncError> {
        self.validate_references(goods.brands_id, goods.category_id)
            .await?;

        let mut tx = self.catalog.begin().await?;
        let created = match tx.create_goods(&goods).await {
            Ok(created) => created,
            Err(e) => return Err(Self::abort(tx, e.into()).await),
        };

        if self.enable_service_sync {
            let document = GoodsSearchDocument::from(&created);
            if let Err(e) = self.index.create_document(&document).await {
                error!(goods_id = created.id, error = %e, "Index write failed, rolling back create");
                return Err(Self::abort(tx, e.into()).await);
            }
        }

        tx.commit().await?;
        info!(goods_id = created.id, "Created goods");

        // Re-read so the caller sees column defaults applied by the store.
        Ok(self.catalog.get_goods(created.id).await?)
    }

    /// Overwrite an existing goods row.
    #[instrument(skip(self, goods), fields(goods_id = goods.id))]
    pub async fn update(&self, goods: GoodsRecord) -> Result<(), SyncError> {
        self.validate_references(goods.brands_id, goods.category_id)
            .await?;

        let mut tx = self.catalog.begin().await?;
        if let Err(e) = tx.update_goods(&goods).await {
            return Err(Self::abort(tx, e.into()).await);
        }

        if self.enable_service_sync {
            let document = GoodsSearchDocument::from(&goods);
            if let Err(e) = write_document(self.index.as_ref(), &document).await {
                error!(goods_id = goods.id, error = %e, "Index write failed, rolling back update");
                return Err(Self::abort(tx, e.into()).await);
            }
        }

        tx.commit().await?;
        info!(goods_id = goods.id, "Updated goods");
        Ok(())
    }

    /// Delete a goods row.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: u64) -> Result<(), SyncError> {
        let mut tx = self.catalog.begin().await?;
        if let Err(e) = tx.delete_goods(id).await {
            return Err(Self::abort(tx, e.into()).await);
        }

        if self.enable_service_sync {
            if let Err(e) = self.index.delete_document(id).await {
                error!(goods_id = id, error = %e, "Index delete failed, rolling back delete");
                return Err(Self::abort(tx, e.into()).await);
            }
        }

        tx.commit().await?;
        info!(goods_id = id, "Deleted goods");
        Ok(())
    }

    async fn validate_references(&self, brand_id: i32, category_id: i32) -> Result<(), SyncError> {
        if !self.catalog.brand_exists(brand_id).await? {
            return Err(SyncError::BrandNotFound(brand_id));
        }
        if !self.catalog.category_exists(category_id).await? {
            return Err(SyncError::CategoryNotFound(category_id));
        }
        Ok(())
    }

    /// Roll back `tx` and hand back the error that caused it.
    async fn abort(tx: Box<dyn CatalogTransaction>, cause: SyncError) -> SyncError {
        if let Err(e) = tx.rollback().await {
            warn!(error = %e, "Rollback failed");
        }
        cause
    }
}
