//! Canonical goods records as stored in the relational catalog.

use serde::{Deserialize, Serialize};

/// A goods row as committed in the catalog store.
///
/// This is the source of truth for everything the search index holds. It is only
/// created, updated or deleted through the catalog mutation operations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GoodsRecord {
    pub id: u64,
    pub category_id: i32,
    pub brands_id: i32,
    pub on_sale: bool,
    pub ship_free: bool,
    pub is_new: bool,
    pub is_hot: bool,
    pub goods_sn: String,
    pub name: String,
    pub click_num: i32,
    pub sold_num: i32,
    pub fav_num: i32,
    pub market_price: f32,
    pub shop_price: f32,
    pub goods_brief: String,
    pub goods_desc: String,
    pub goods_front_image: String,
}

/// Attributes of a goods row that has not been inserted yet.
///
/// The catalog assigns the id on insert; [`NewGoods::into_record`] attaches it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NewGoods {
    pub category_id: i32,
    pub brands_id: i32,
    pub on_sale: bool,
    pub ship_free: bool,
    pub is_new: bool,
    pub is_hot: bool,
    pub goods_sn: String,
    pub name: String,
    pub click_num: i32,
    pub sold_num: i32,
    pub fav_num: i32,
    pub market_price: f32,
    pub shop_price: f32,
    pub goods_brief: String,
    pub goods_desc: String,
    pub goods_front_image: String,
}

impl NewGoods {
    /// Attach the id assigned by the catalog.
    pub fn into_record(self, id: u64) -> GoodsRecord {
        GoodsRecord {
            id,
            category_id: self.category_id,
            brands_id: self.brands_id,
            on_sale: self.on_sale,
            ship_free: self.ship_free,
            is_new: self.is_new,
            is_hot: self.is_hot,
            goods_sn: self.goods_sn,
            name: self.name,
            click_num: self.click_num,
            sold_num: self.sold_num,
            fav_num: self.fav_num,
            market_price: self.market_price,
            shop_price: self.shop_price,
            goods_brief: self.goods_brief,
            goods_desc: self.goods_desc,
            goods_front_image: self.goods_front_image,
        }
    }
}
