//! MySQL implementation of the catalog store.
//!
//! The catalog tables live in `migrations/`; they are applied by
//! [`MySqlCatalogStore::migrate`] or by the `sqlx::test` harness.

mod catalog_store;

pub use catalog_store::{MySqlCatalogStore, MySqlCatalogTransaction};
