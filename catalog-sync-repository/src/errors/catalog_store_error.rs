//! Catalog store error types.

use thiserror::Error;

/// Errors from the relational catalog.
#[derive(Debug, Error)]
pub enum CatalogStoreError {
    /// No goods row with this id.
    #[error("goods {0} not found")]
    NotFound(u64),

    /// Error reported by the database driver.
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    /// The catalog could not be reached.
    #[error("Catalog unavailable: {0}")]
    Unavailable(String),
}

impl CatalogStoreError {
    /// Create an unavailable error.
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    /// Whether the goods row is missing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Whether retrying the same call later could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::DatabaseError(_) | Self::Unavailable(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(CatalogStoreError::NotFound(1).is_not_found());
        assert!(!CatalogStoreError::NotFound(1).is_retryable());
        assert!(CatalogStoreError::unavailable("pool timed out").is_retryable());
        assert!(CatalogStoreError::DatabaseError(sqlx::Error::PoolTimedOut).is_retryable());
    }
}
