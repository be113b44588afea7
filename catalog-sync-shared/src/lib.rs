//! # Catalog Sync Shared
//!
//! This crate defines the data structures shared across the catalog sync engine:
//! the canonical goods record, its search projection, the change-data-capture
//! wire message and the outcome of bulk reconciliation.

pub mod types;

pub use types::change_event::{ChangeEvent, ChangeOperation, RowImage};
pub use types::entity_type::EntityType;
pub use types::goods::{GoodsRecord, NewGoods};
pub use types::goods_filter::{GoodsFilter, GoodsSearchPage};
pub use types::goods_id::{parse_goods_id, GoodsIdError};
pub use types::search_document::GoodsSearchDocument;
pub use types::sync_result::SyncResult;
