//! Interface definitions for the catalog and the goods search index.
//!
//! The sync engine only talks to these traits, so backends can be swapped and
//! replaced with in-memory implementations in tests.

mod catalog_store;
mod search_index_store;

pub use catalog_store::{CatalogStore, CatalogTransaction};
pub use search_index_store::SearchIndexStore;
