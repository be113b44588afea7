//! # Catalog Sync
//!
//! Keeps the goods search index consistent with the relational catalog.
//!
//! ## Architecture
//!
//! Every index write goes through one idempotent primitive that re-reads the
//! canonical record, and three paths drive it:
//!
//! 1. **Dual write**: catalog mutations write the index inside their transaction
//! 2. **Change events**: the catalog's replication stream is consumed from Kafka
//!    and applied row by row
//! 3. **Reconciliation**: bulk resyncs and orphan pruning repair drift
//!
//! ## Modules
//!
//! - [`sync`]: The sync primitive
//! - [`goods`]: Catalog mutations with synchronous index writes
//! - [`reconciler`]: Bulk resync and orphan pruning
//! - [`admin`]: Operator resync trigger
//! - [`consumer`]: Kafka consumer for change events
//! - [`processor`]: Filters and routes change events
//! - [`orchestrator`]: Coordinates the ingest flow
//! - [`config`]: Configuration and dependency initialization
//! - [`errors`]: Error types

pub mod admin;
pub mod config;
pub mod consumer;
pub mod errors;
pub mod goods;
pub mod orchestrator;
pub mod processor;
pub mod reconciler;
pub mod sync;

pub use config::{Dependencies, Settings, SyncComponents};
pub use errors::{IngestError, SyncError};

use thiserror::Error;

/// Errors that can occur during engine initialization or execution.
#[derive(Error, Debug)]
pub enum IndexingError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Ingest error.
    #[error("Ingest error: {0}")]
    IngestError(#[from] IngestError),
}

impl IndexingError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}
