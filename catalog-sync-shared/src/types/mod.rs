//! This module defines the core data structures used across the catalog sync engine.

pub mod change_event;
pub mod entity_type;
pub mod goods;
pub mod goods_filter;
pub mod goods_id;
pub mod search_document;
pub mod sync_result;
