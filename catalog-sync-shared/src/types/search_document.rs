//! Search document types for the goods index.
//!
//! This module defines the projection of a [`GoodsRecord`] that is stored in the
//! search engine. It only carries the fields needed for filtering and ranking.

use serde::{Deserialize, Serialize};

use crate::types::goods::GoodsRecord;

/// Document representation for the goods search index.
///
/// Derived entirely from the canonical record, so it can be thrown away and rebuilt
/// at any time. The document carries no wall-clock fields: projecting the same
/// record twice yields equal documents.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GoodsSearchDocument {
    pub id: u64,
    pub category_id: i32,
    pub brands_id: i32,
    pub on_sale: bool,
    pub ship_free: bool,
    pub is_new: bool,
    pub is_hot: bool,
    pub name: String,
    pub click_num: i32,
    pub sold_num: i32,
    pub fav_num: i32,
    pub market_price: f32,
    pub goods_brief: String,
    pub shop_price: f32,
}

impl GoodsSearchDocument {
    /// Generate the document ID used in the search index.
    ///
    /// The index is keyed by the catalog id, so a record has at most one document.
    pub fn document_id(&self) -> String {
        self.id.to_string()
    }
}

impl From<&GoodsRecord> for GoodsSearchDocument {
    fn from(goods: &GoodsRecord) -> Self {
        Self {
            id: goods.id,
            category_id: goods.category_id,
            brands_id: goods.brands_id,
            on_sale: goods.on_sale,
            ship_free: goods.ship_free,
            is_new: goods.is_new,
            is_hot: goods.is_hot,
            name: goods.name.clone(),
            click_num: goods.click_num,
            sold_num: goods.sold_num,
            fav_num: goods.fav_num,
            market_price: goods.market_price,
            goods_brief: goods.goods_brief.clone(),
            shop_price: goods.shop_price,
        }
    }
}
