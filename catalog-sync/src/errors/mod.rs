//! Error types for the catalog sync engine.

use thiserror::Error;

use catalog_sync_repository::{CatalogStoreError, SearchIndexError};

/// Errors from a single sync or catalog mutation.
#[derive(Error, Debug)]
pub enum SyncError {
    /// No catalog record with this id.
    #[error("goods {0} not found")]
    NotFound(u64),

    /// A mutation referenced a brand that does not exist.
    #[error("brand {0} does not exist")]
    BrandNotFound(i32),

    /// A mutation referenced a category that does not exist.
    #[error("category {0} does not exist")]
    CategoryNotFound(i32),

    /// Catalog store failure.
    #[error("Catalog error: {0}")]
    Catalog(CatalogStoreError),

    /// Search index failure.
    #[error("Search index error: {0}")]
    SearchIndex(#[from] SearchIndexError),
}

impl SyncError {
    /// Create a not found error.
    pub fn not_found(id: u64) -> Self {
        Self::NotFound(id)
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Whether the same call could succeed once the backing store recovers.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Catalog(e) => e.is_retryable(),
            Self::SearchIndex(e) => !matches!(e, SearchIndexError::ValidationError(_)),
            Self::NotFound(_) | Self::BrandNotFound(_) | Self::CategoryNotFound(_) => false,
        }
    }
}

impl From<CatalogStoreError> for SyncError {
    fn from(err: CatalogStoreError) -> Self {
        match err {
            CatalogStoreError::NotFound(id) => Self::NotFound(id),
            other => Self::Catalog(other),
        }
    }
}

/// Errors that can occur in the change-event ingest.
#[derive(Error, Debug)]
pub enum IngestError {
    /// A sync call failed; the batch must be redelivered.
    #[error("Sync error: {0}")]
    SyncError(#[from] SyncError),

    /// Kafka-related error.
    #[error("Kafka error: {0}")]
    KafkaError(String),

    /// Channel communication error.
    #[error("Channel error: {0}")]
    ChannelError(String),
}

impl IngestError {
    /// Create a Kafka error.
    pub fn kafka(msg: impl Into<String>) -> Self {
        Self::KafkaError(msg.into())
    }

    /// Create a channel error.
    pub fn channel(msg: impl Into<String>) -> Self {
        Self::ChannelError(msg.into())
    }
}

impl From<rdkafka::error::KafkaError> for IngestError {
    fn from(err: rdkafka::error::KafkaError) -> Self {
        Self::KafkaError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_not_found_maps_to_sync_not_found() {
        let err = SyncError::from(CatalogStoreError::NotFound(7));
        assert!(matches!(err, SyncError::NotFound(7)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_backend_failures_are_retryable() {
        assert!(SyncError::from(CatalogStoreError::unavailable("down")).is_retryable());
        assert!(SyncError::from(SearchIndexError::connection("refused")).is_retryable());
        assert!(!SyncError::from(SearchIndexError::validation("bad id")).is_retryable());
    }

    #[test]
    fn test_ingest_error_wraps_sync_error() {
        let err = IngestError::from(SyncError::not_found(3));
        assert_eq!(err.to_string(), "Sync error: goods 3 not found");
    }
}
