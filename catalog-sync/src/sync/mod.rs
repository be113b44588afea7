//! The per-entity sync primitive.
//!
//! Every path that touches the search index (dual writes, the change-event
//! consumer and bulk reconciliation) goes through this module, so each index
//! write is derived from the canonical record rather than from a payload.

mod manager;

pub use manager::{write_document, SearchSync, SyncManager, SyncOutcome};
