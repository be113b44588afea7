//! Error types for the catalog sync repository.
//!
//! One error type per store, so callers can tell which side of the dual write failed.

mod catalog_store_error;
mod search_index_error;

pub use catalog_store_error::CatalogStoreError;
pub use search_index_error::SearchIndexError;
