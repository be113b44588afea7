//! # Catalog Sync Repository
//!
//! This crate provides the store contracts the sync engine is written against and
//! their concrete implementations: the relational catalog on MySQL and the goods
//! search index on OpenSearch.

pub mod errors;
pub mod interfaces;
pub mod mysql;
pub mod opensearch;
pub mod utils;

pub use errors::{CatalogStoreError, SearchIndexError};
pub use interfaces::{CatalogStore, CatalogTransaction, SearchIndexStore};
pub use mysql::MySqlCatalogStore;
pub use opensearch::OpenSearchGoodsStore;
pub use utils::parse_document_id;
