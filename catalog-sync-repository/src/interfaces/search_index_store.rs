//! Search index store trait definition.
//!
//! This module defines the abstract interface for goods index operations,
//! allowing for different backend implementations (OpenSearch, Elasticsearch, etc.).

use async_trait::async_trait;

use crate::errors::SearchIndexError;
use catalog_sync_shared::{GoodsFilter, GoodsSearchDocument, GoodsSearchPage};

/// Abstracts the underlying goods search index.
///
/// The index is derived state: every document is a projection of a catalog row and
/// is keyed by the row's id. All methods return `Result<T, SearchIndexError>` for
/// consistent error handling across backends.
///
/// # Index Initialization
///
/// Implementations should call `ensure_index_exists` during application startup so
/// the index and alias are in place before any document operation.
#[async_trait]
pub trait SearchIndexStore: Send + Sync {
    /// Ensure the search index and any required aliases exist, creating them if necessary.
    async fn ensure_index_exists(&self) -> Result<(), SearchIndexError>;

    /// Write a document, replacing any document with the same id.
    async fn create_document(&self, document: &GoodsSearchDocument) -> Result<(), SearchIndexError>;

    /// Overwrite an existing document.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - If the document existed and now matches `document`
    /// * `Err(SearchIndexError::DocumentNotFound)` - If there was no document to update
    /// * `Err(SearchIndexError)` - If the operation fails
    async fn update_document(&self, document: &GoodsSearchDocument) -> Result<(), SearchIndexError>;

    /// Delete a document from the search index.
    ///
    /// If the document doesn't exist, the operation is considered successful.
    async fn delete_document(&self, id: u64) -> Result<(), SearchIndexError>;

    /// Run a filtered search and return one page of hits plus the total hit count.
    async fn search(&self, filter: &GoodsFilter) -> Result<GoodsSearchPage, SearchIndexError>;

    /// List indexed document ids in ascending order, starting strictly after `after`.
    ///
    /// Returns at most `limit` ids; an empty result means the scan is complete.
    async fn scan_document_ids(
        &self,
        after: Option<u64>,
        limit: usize,
    ) -> Result<Vec<u64>, SearchIndexError>;
}
