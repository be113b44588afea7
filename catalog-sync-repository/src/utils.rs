//! Utility functions for the catalog sync repository.

use crate::errors::SearchIndexError;

/// Parse a search document id back into the catalog id it was derived from.
///
/// # Example
///
/// ```
/// use catalog_sync_repository::parse_document_id;
///
/// assert_eq!(parse_document_id("421").unwrap(), 421);
/// ```
pub fn parse_document_id(document_id: &str) -> Result<u64, SearchIndexError> {
    document_id.parse::<u64>().map_err(|e| {
        SearchIndexError::validation(format!("Invalid document id {:?}: {}", document_id, e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_document_id() {
        assert_eq!(parse_document_id("7").unwrap(), 7);
    }

    #[test]
    fn test_parse_document_id_invalid() {
        let result = parse_document_id("goods-7");
        assert!(matches!(
            result.unwrap_err(),
            SearchIndexError::ValidationError(_)
        ));
    }
}
