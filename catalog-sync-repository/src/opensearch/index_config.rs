//! OpenSearch index configuration and mappings.
//!
//! This module defines the index settings and mappings for the goods search index.

use serde_json::{json, Value};

/// Configuration for the search index.
#[derive(Debug, Clone)]
pub struct IndexConfig {
    /// The alias name for the search index (used for all operations).
    pub alias: String,
    /// The version number for the index (e.g., 0 for "goods_v0").
    pub version: u32,
}

impl IndexConfig {
    /// Create a new index configuration.
    ///
    /// # Arguments
    ///
    /// * `alias` - The index alias name
    /// * `version` - The version number
    pub fn new(alias: impl Into<String>, version: u32) -> Self {
        Self {
            alias: alias.into(),
            version,
        }
    }

    /// Name of the concrete index behind the alias.
    pub fn versioned_index_name(&self) -> String {
        format!("{}_v{}", self.alias, self.version)
    }
}

/// Get the index settings and mappings for the goods search index.
///
/// The configuration includes:
/// - **text**: `name` and `goods_brief`, matched by keyword search
/// - **keyword / numeric**: ids, flags and counters used by term and range filters
/// - **scaled_float**: prices, filtered by range
///
/// # Sharding Configuration
///
/// - 1 primary shard
/// - 1 replica for redundancy
pub fn get_index_settings(alias: &str) -> Value {
    json!({
        "settings": {
            "number_of_shards": 1,
            "number_of_replicas": 1
        },
        "aliases": {
            alias: {}
        },
        "mappings": {
            "dynamic": "strict",
            "properties": {
                "id": { "type": "long" },
                "category_id": { "type": "integer" },
                "brands_id": { "type": "integer" },
                "on_sale": { "type": "boolean" },
                "ship_free": { "type": "boolean" },
                "is_new": { "type": "boolean" },
                "is_hot": { "type": "boolean" },
                "name": {
                    "type": "text",
                    "fields": {
                        "raw": { "type": "keyword" }
                    }
                },
                "goods_brief": { "type": "text" },
                "click_num": { "type": "integer" },
                "sold_num": { "type": "integer" },
                "fav_num": { "type": "integer" },
                "market_price": { "type": "scaled_float", "scaling_factor": 100 },
                "shop_price": { "type": "scaled_float", "scaling_factor": 100 }
            }
        }
    })
}
