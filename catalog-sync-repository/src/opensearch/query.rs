//! Translation of [`GoodsFilter`] into an OpenSearch query body.

use serde_json::{json, Value};

use catalog_sync_shared::GoodsFilter;

/// Build the `_search` request body for a goods filter.
///
/// Keywords become a scored `multi_match` over `name` and `goods_brief`; every other
/// criterion is a non-scoring filter clause.
pub fn build_search_body(filter: &GoodsFilter) -> Value {
    let mut must = Vec::new();
    let mut clauses = Vec::new();

    if let Some(keywords) = filter.keywords.as_deref().filter(|k| !k.is_empty()) {
        must.push(json!({
            "multi_match": {
                "query": keywords,
                "fields": ["name", "goods_brief"]
            }
        }));
    }
    if let Some(is_hot) = filter.is_hot {
        clauses.push(json!({ "term": { "is_hot": is_hot } }));
    }
    if let Some(is_new) = filter.is_new {
        clauses.push(json!({ "term": { "is_new": is_new } }));
    }
    if let Some(on_sale) = filter.on_sale {
        clauses.push(json!({ "term": { "on_sale": on_sale } }));
    }
    if let Some(brand_id) = filter.brand_id {
        clauses.push(json!({ "term": { "brands_id": brand_id } }));
    }
    if !filter.category_ids.is_empty() {
        clauses.push(json!({ "terms": { "category_id": filter.category_ids } }));
    }

    let mut price = serde_json::Map::new();
    if let Some(min) = filter.price_min.filter(|p| *p > 0.0) {
        price.insert("gte".to_string(), json!(min));
    }
    if let Some(max) = filter.price_max.filter(|p| *p > 0.0) {
        price.insert("lte".to_string(), json!(max));
    }
    if !price.is_empty() {
        clauses.push(json!({ "range": { "shop_price": price } }));
    }

    json!({
        "from": filter.offset(),
        "size": filter.page_size(),
        "track_total_hits": true,
        "sort": ["_score", { "id": "asc" }],
        "query": {
            "bool": {
                "must": must,
                "filter": clauses
            }
        }
    })
}
