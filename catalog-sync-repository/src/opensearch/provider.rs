//! OpenSearch goods store implementation.
//!
//! This module provides the concrete implementation of `SearchIndexStore`
//! using the OpenSearch Rust crate.

use async_trait::async_trait;
use opensearch::{
    http::response::Response,
    http::transport::{SingleNodeConnectionPool, TransportBuilder},
    indices::{IndicesCreateParts, IndicesExistsAliasParts},
    params::Refresh,
    DeleteParts, IndexParts, OpenSearch, SearchParts, UpdateParts,
};
use serde_json::{json, Value};
use tracing::{debug, error, info};
use url::Url;

use crate::errors::SearchIndexError;
use crate::interfaces::SearchIndexStore;
use crate::opensearch::index_config::{get_index_settings, IndexConfig};
use crate::opensearch::query::build_search_body;
use crate::utils;
use catalog_sync_shared::{GoodsFilter, GoodsSearchDocument, GoodsSearchPage};

/// OpenSearch goods store.
///
/// All document operations go through the configured alias, so the versioned index
/// behind it can be swapped without touching this type.
///
/// # Example
///
/// ```ignore
/// use catalog_sync_repository::opensearch::{IndexConfig, OpenSearchGoodsStore};
///
/// let config = IndexConfig::new("goods", 0);
/// let store = OpenSearchGoodsStore::new("http://localhost:9200", config).await?;
/// store.ensure_index_exists().await?;
/// ```
pub struct OpenSearchGoodsStore {
    client: OpenSearch,
    index_config: IndexConfig,
}

impl OpenSearchGoodsStore {
    /// Create a new OpenSearch goods store connected to the specified URL.
    ///
    /// # Arguments
    ///
    /// * `url` - The OpenSearch server URL (e.g., "http://localhost:9200")
    /// * `index_config` - The index configuration containing alias and version
    ///
    /// # Returns
    ///
    /// * `Ok(OpenSearchGoodsStore)` - A new store instance
    /// * `Err(SearchIndexError)` - If connection setup fails
    pub async fn new(url: &str, index_config: IndexConfig) -> Result<Self, SearchIndexError> {
        let parsed_url =
            Url::parse(url).map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let conn_pool = SingleNodeConnectionPool::new(parsed_url);
        let transport = TransportBuilder::new(conn_pool)
            .disable_proxy()
            .build()
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let client = OpenSearch::new(transport);

        info!(
            url = %url,
            alias = %index_config.alias,
            version = index_config.version,
            "Created OpenSearch goods store"
        );

        Ok(Self {
            client,
            index_config,
        })
    }

    fn alias(&self) -> &str {
        &self.index_config.alias
    }

    fn document_body(document: &GoodsSearchDocument) -> Result<Value, SearchIndexError> {
        serde_json::to_value(document).map_err(|e| SearchIndexError::serialization(e.to_string()))
    }

    async fn failure_body(response: Response) -> String {
        response.text().await.unwrap_or_default()
    }

    async fn read_json(response: Response) -> Result<Value, SearchIndexError> {
        response
            .json::<Value>()
            .await
            .map_err(|e| SearchIndexError::parse(e.to_string()))
    }
}

/// Extract the search page from a `_search` response body.
fn parse_search_page(body: &Value) -> Result<GoodsSearchPage, SearchIndexError> {
    let total = body["hits"]["total"]["value"]
        .as_u64()
        .ok_or_else(|| SearchIndexError::parse("missing hits.total.value"))?;

    let documents = body["hits"]["hits"]
        .as_array()
        .map(|hits| hits.as_slice())
        .unwrap_or_default()
        .iter()
        .map(|hit| {
            serde_json::from_value::<GoodsSearchDocument>(hit["_source"].clone())
                .map_err(|e| SearchIndexError::parse(e.to_string()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(GoodsSearchPage { total, documents })
}

/// Extract document ids from a `_search` response body that requested no `_source`.
fn parse_hit_ids(body: &Value) -> Result<Vec<u64>, SearchIndexError> {
    body["hits"]["hits"]
        .as_array()
        .map(|hits| hits.as_slice())
        .unwrap_or_default()
        .iter()
        .map(|hit| {
            let id = hit["_id"]
                .as_str()
                .ok_or_else(|| SearchIndexError::parse("hit without _id"))?;
            utils::parse_document_id(id)
        })
        .collect()
}

#[async_trait]
impl SearchIndexStore for OpenSearchGoodsStore {
    /// Create `{alias}_v{version}` with the goods mappings and point the alias at it,
    /// unless the alias already exists.
    async fn ensure_index_exists(&self) -> Result<(), SearchIndexError> {
        let exists = self
            .client
            .indices()
            .exists_alias(IndicesExistsAliasParts::Name(&[self.alias()]))
            .send()
            .await
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        if exists.status_code().is_success() {
            debug!(alias = %self.alias(), "Search index alias already exists");
            return Ok(());
        }

        let index_name = self.index_config.versioned_index_name();
        let response = self
            .client
            .indices()
            .create(IndicesCreateParts::Index(&index_name))
            .body(get_index_settings(self.alias()))
            .send()
            .await
            .map_err(|e| SearchIndexError::index_creation(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let error_body = Self::failure_body(response).await;
            // Another instance may have created it between the check and the create.
            if error_body.contains("resource_already_exists_exception") {
                debug!(index = %index_name, "Search index created concurrently");
                return Ok(());
            }
            error!(status = %status, body = %error_body, "Index creation failed");
            return Err(SearchIndexError::index_creation(format!(
                "Index creation failed with status {}: {}",
                status, error_body
            )));
        }

        info!(index = %index_name, alias = %self.alias(), "Created search index");
        Ok(())
    }

    async fn create_document(&self, document: &GoodsSearchDocument) -> Result<(), SearchIndexError> {
        let doc_id = document.document_id();
        let body = Self::document_body(document)?;

        let response = self
            .client
            .index(IndexParts::IndexId(self.alias(), &doc_id))
            .refresh(Refresh::True)
            .body(body)
            .send()
            .await
            .map_err(|e| SearchIndexError::index(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let error_body = Self::failure_body(response).await;
            error!(status = %status, body = %error_body, "Index request failed");
            return Err(SearchIndexError::index(format!(
                "Index failed with status {}: {}",
                status, error_body
            )));
        }

        debug!(doc_id = %doc_id, "Document created");
        Ok(())
    }

    /// Replace every field of an existing document.
    ///
    /// No upsert: a missing document surfaces as `DocumentNotFound` so the caller can
    /// decide whether to create it.
    async fn update_document(&self, document: &GoodsSearchDocument) -> Result<(), SearchIndexError> {
        let doc_id = document.document_id();
        let doc = Self::document_body(document)?;

        // API reference: https://docs.opensearch.org/latest/api-reference/document-apis/update-document/
        let response = self
            .client
            .update(UpdateParts::IndexId(self.alias(), &doc_id))
            .refresh(Refresh::True)
            .body(json!({ "doc": doc }))
            .send()
            .await
            .map_err(|e| SearchIndexError::update(e.to_string()))?;

        let status = response.status_code();
        if status.as_u16() == 404 {
            return Err(SearchIndexError::document_not_found(document.id));
        }
        if !status.is_success() {
            let error_body = Self::failure_body(response).await;
            error!(status = %status, body = %error_body, "Update request failed");
            return Err(SearchIndexError::update(format!(
                "Update failed with status {}: {}",
                status, error_body
            )));
        }

        debug!(doc_id = %doc_id, "Document updated");
        Ok(())
    }

    async fn delete_document(&self, id: u64) -> Result<(), SearchIndexError> {
        let doc_id = id.to_string();

        let response = self
            .client
            .delete(DeleteParts::IndexId(self.alias(), &doc_id))
            .refresh(Refresh::True)
            .send()
            .await
            .map_err(|e| SearchIndexError::delete(e.to_string()))?;

        let status = response.status_code();

        // 404 is acceptable - document may not exist
        if !status.is_success() && status.as_u16() != 404 {
            let error_body = Self::failure_body(response).await;
            error!(status = %status, body = %error_body, "Delete request failed");
            return Err(SearchIndexError::delete(format!(
                "Delete failed with status {}: {}",
                status, error_body
            )));
        }

        debug!(doc_id = %doc_id, "Document deleted");
        Ok(())
    }

    async fn search(&self, filter: &GoodsFilter) -> Result<GoodsSearchPage, SearchIndexError> {
        let response = self
            .client
            .search(SearchParts::Index(&[self.alias()]))
            .body(build_search_body(filter))
            .send()
            .await
            .map_err(|e| SearchIndexError::search(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let error_body = Self::failure_body(response).await;
            error!(status = %status, body = %error_body, "Search request failed");
            return Err(SearchIndexError::search(format!(
                "Search failed with status {}: {}",
                status, error_body
            )));
        }

        let body = Self::read_json(response).await?;
        parse_search_page(&body)
    }

    async fn scan_document_ids(
        &self,
        after: Option<u64>,
        limit: usize,
    ) -> Result<Vec<u64>, SearchIndexError> {
        let mut body = json!({
            "size": limit,
            "_source": false,
            "sort": [{ "id": "asc" }],
            "query": { "match_all": {} }
        });
        if let Some(after) = after {
            body["search_after"] = json!([after]);
        }

        let response = self
            .client
            .search(SearchParts::Index(&[self.alias()]))
            .body(body)
            .send()
            .await
            .map_err(|e| SearchIndexError::search(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let error_body = Self::failure_body(response).await;
            error!(status = %status, body = %error_body, "Id scan request failed");
            return Err(SearchIndexError::search(format!(
                "Id scan failed with status {}: {}",
                status, error_body
            )));
        }

        let body = Self::read_json(response).await?;
        parse_hit_ids(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(id: u64, name: &str) -> Value {
        json!({
            "_id": id.to_string(),
            "_source": {
                "id": id,
                "category_id": 130364,
                "brands_id": 614,
                "on_sale": true,
                "ship_free": true,
                "is_new": false,
                "is_hot": true,
                "name": name,
                "click_num": 0,
                "sold_num": 12,
                "fav_num": 3,
                "market_price": 23.0,
                "goods_brief": "",
                "shop_price": 19.5
            }
        })
    }

    #[test]
    fn test_parse_search_page() {
        let body = json!({
            "hits": {
                "total": { "value": 42, "relation": "eq" },
                "hits": [hit(1, "green tea"), hit(2, "black tea")]
            }
        });

        let page = parse_search_page(&body).unwrap();

        assert_eq!(page.total, 42);
        assert_eq!(page.documents.len(), 2);
        assert_eq!(page.documents[1].name, "black tea");
        assert_eq!(page.documents[0].brands_id, 614);
    }

    #[test]
    fn test_parse_search_page_no_hits() {
        let body = json!({ "hits": { "total": { "value": 0 }, "hits": [] } });

        let page = parse_search_page(&body).unwrap();

        assert_eq!(page, GoodsSearchPage::default());
    }

    #[test]
    fn test_parse_search_page_missing_total() {
        let result = parse_search_page(&json!({ "hits": { "hits": [] } }));
        assert!(matches!(result.unwrap_err(), SearchIndexError::ParseError(_)));
    }

    #[test]
    fn test_parse_hit_ids() {
        let body = json!({ "hits": { "hits": [{ "_id": "3" }, { "_id": "10" }] } });
        assert_eq!(parse_hit_ids(&body).unwrap(), vec![3, 10]);
    }

    #[test]
    fn test_parse_hit_ids_rejects_foreign_documents() {
        let body = json!({ "hits": { "hits": [{ "_id": "not-a-goods-id" }] } });
        assert!(matches!(
            parse_hit_ids(&body).unwrap_err(),
            SearchIndexError::ValidationError(_)
        ));
    }
}
