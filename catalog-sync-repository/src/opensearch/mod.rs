//! OpenSearch implementation of the goods search index.
//!
//! This module provides a concrete implementation of `SearchIndexStore`
//! using OpenSearch as the backend.

mod index_config;
mod provider;
mod query;

pub use index_config::{get_index_settings, IndexConfig};
pub use provider::OpenSearchGoodsStore;
pub use query::build_search_body;
