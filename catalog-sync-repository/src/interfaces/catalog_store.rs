//! Catalog store trait definitions.
//!
//! The catalog is the authoritative store for goods. Reads go straight to the
//! store; mutations go through a [`CatalogTransaction`] so the caller decides when
//! (and whether) they become visible.

use async_trait::async_trait;

use crate::errors::CatalogStoreError;
use catalog_sync_shared::{GoodsRecord, NewGoods};

/// Read access to the catalog plus the entry point for transactional writes.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Load one committed goods row.
    ///
    /// # Returns
    ///
    /// * `Ok(GoodsRecord)` - The latest committed state
    /// * `Err(CatalogStoreError::NotFound)` - If no row has this id
    /// * `Err(CatalogStoreError)` - If the catalog cannot be read
    async fn get_goods(&self, id: u64) -> Result<GoodsRecord, CatalogStoreError>;

    /// Load every existing row among `ids`. Missing ids are simply absent from the result.
    async fn list_goods_by_ids(&self, ids: &[u64]) -> Result<Vec<GoodsRecord>, CatalogStoreError>;

    /// Enumerate the ids of all goods rows, ascending.
    async fn get_all_goods_ids(&self) -> Result<Vec<u64>, CatalogStoreError>;

    async fn brand_exists(&self, brand_id: i32) -> Result<bool, CatalogStoreError>;

    async fn category_exists(&self, category_id: i32) -> Result<bool, CatalogStoreError>;

    /// Open a transaction for goods mutations.
    async fn begin(&self) -> Result<Box<dyn CatalogTransaction>, CatalogStoreError>;
}

/// An open catalog transaction.
///
/// Writes made through it stay invisible to other readers until [`commit`] succeeds.
/// Dropping a transaction without committing rolls it back.
///
/// [`commit`]: CatalogTransaction::commit
#[async_trait]
pub trait CatalogTransaction: Send {
    /// Insert a goods row and return it with its assigned id.
    async fn create_goods(&mut self, goods: &NewGoods) -> Result<GoodsRecord, CatalogStoreError>;

    /// Overwrite an existing goods row. Locks the row for the rest of the transaction.
    ///
    /// Returns `CatalogStoreError::NotFound` if the row does not exist.
    async fn update_goods(&mut self, goods: &GoodsRecord) -> Result<(), CatalogStoreError>;

    /// Delete a goods row. Locks the row for the rest of the transaction.
    ///
    /// Returns `CatalogStoreError::NotFound` if the row does not exist.
    async fn delete_goods(&mut self, id: u64) -> Result<(), CatalogStoreError>;

    async fn commit(self: Box<Self>) -> Result<(), CatalogStoreError>;

    async fn rollback(self: Box<Self>) -> Result<(), CatalogStoreError>;
}
