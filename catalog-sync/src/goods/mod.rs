//! Catalog mutations with synchronous search index writes.

mod service;

pub use service::GoodsService;
