//! Operator-facing resync trigger.

mod data_sync;

pub use data_sync::{DataSyncService, SyncGoodsDataRequest, SyncGoodsDataResponse};
