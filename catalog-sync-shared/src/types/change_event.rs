//! Change-data-capture message types.
//!
//! A [`ChangeEvent`] is one message from the catalog's replication stream: a batch
//! of rows from a single table, all touched by the same kind of statement.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// One row image, as serialized upstream.
///
/// Normally an object of column name to column value. Rows are kept as raw values
/// so one malformed row cannot make its siblings undecodable.
pub type RowImage = Value;

/// The statement kind that produced a change event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ChangeOperation {
    Insert,
    Update,
    Delete,
    /// Any other statement tag (e.g. `ALTER`, `TRUNCATE`), kept verbatim.
    Other(String),
}

impl ChangeOperation {
    pub fn as_str(&self) -> &str {
        match self {
            ChangeOperation::Insert => "INSERT",
            ChangeOperation::Update => "UPDATE",
            ChangeOperation::Delete => "DELETE",
            ChangeOperation::Other(tag) => tag.as_str(),
        }
    }
}

impl From<String> for ChangeOperation {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "INSERT" => ChangeOperation::Insert,
            "UPDATE" => ChangeOperation::Update,
            "DELETE" => ChangeOperation::Delete,
            _ => ChangeOperation::Other(tag),
        }
    }
}

impl From<ChangeOperation> for String {
    fn from(operation: ChangeOperation) -> Self {
        operation.as_str().to_string()
    }
}

impl std::fmt::Display for ChangeOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A change event captured from the catalog store's replication log.
///
/// Delivered at least once. `data` holds post-images for INSERT/UPDATE, `old`
/// holds pre-images (and is the preferred id source for DELETE). Row values are
/// never trusted as the state to index; only the `id` column is read from them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEvent {
    pub database: String,
    pub table: String,
    #[serde(rename = "type")]
    pub operation: ChangeOperation,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub data: Vec<RowImage>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub old: Vec<RowImage>,
    #[serde(default)]
    pub is_ddl: bool,
    #[serde(default)]
    pub es: i64,
    #[serde(default)]
    pub ts: i64,
    #[serde(default)]
    pub execute_time: i64,
}

impl ChangeEvent {
    /// Decode an event from the raw message payload.
    pub fn from_slice(payload: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(payload)
    }

    /// Rows that identify what a DELETE removed.
    ///
    /// The pre-image is preferred; the post-image is only used when no pre-image was sent.
    pub fn deleted_rows(&self) -> &[RowImage] {
        if self.old.is_empty() {
            &self.data
        } else {
            &self.old
        }
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<RowImage>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<RowImage>>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_canal_update() {
        let payload = json!({
            "database": "emshop_goods_srv",
            "table": "goods",
            "type": "UPDATE",
            "data": [{"id": "17", "name": "new name"}],
            "old": [{"name": "old name"}],
            "isDdl": false,
            "es": 1718000000000i64,
            "ts": 1718000000123i64,
            "executeTime": 1718000000000i64
        });

        let event = ChangeEvent::from_slice(payload.to_string().as_bytes()).unwrap();

        assert_eq!(event.database, "emshop_goods_srv");
        assert_eq!(event.table, "goods");
        assert_eq!(event.operation, ChangeOperation::Update);
        assert_eq!(event.data.len(), 1);
        assert_eq!(event.data[0]["id"], json!("17"));
        assert!(!event.is_ddl);
        assert_eq!(event.ts, 1718000000123);
    }

    #[test]
    fn test_decode_ddl_with_null_rows() {
        let payload = json!({
            "database": "emshop_goods_srv",
            "table": "goods",
            "type": "ALTER",
            "data": null,
            "old": null,
            "isDdl": true
        });

        let event: ChangeEvent = serde_json::from_value(payload).unwrap();

        assert_eq!(event.operation, ChangeOperation::Other("ALTER".to_string()));
        assert!(event.data.is_empty());
        assert!(event.old.is_empty());
        assert!(event.is_ddl);
    }

    #[test]
    fn test_deleted_rows_prefers_pre_image() {
        let payload = json!({
            "database": "emshop_goods_srv",
            "table": "goods",
            "type": "DELETE",
            "data": [{"id": 1}],
            "old": [{"id": 2}],
            "isDdl": false
        });
        let event: ChangeEvent = serde_json::from_value(payload).unwrap();

        assert_eq!(event.deleted_rows()[0]["id"], json!(2));
    }

    #[test]
    fn test_deleted_rows_falls_back_to_post_image() {
        let payload = json!({
            "database": "emshop_goods_srv",
            "table": "goods",
            "type": "DELETE",
            "data": [{"id": 1}],
            "isDdl": false
        });
        let event: ChangeEvent = serde_json::from_value(payload).unwrap();

        assert_eq!(event.deleted_rows()[0]["id"], json!(1));
    }

    #[test]
    fn test_malformed_row_keeps_siblings() {
        let payload = br#"{"database":"emshop_goods_srv","table":"goods","type":"UPDATE","data":[{"id":"1"},null,{"id":"3"}],"isDdl":false}"#;

        let event = ChangeEvent::from_slice(payload).unwrap();

        assert_eq!(event.data.len(), 3);
        assert!(event.data[1].is_null());
        assert_eq!(event.data[2]["id"], json!("3"));
    }

    #[test]
    fn test_operation_serializes_as_tag() {
        assert_eq!(
            serde_json::to_value(ChangeOperation::Delete).unwrap(),
            json!("DELETE")
        );
        assert_eq!(ChangeOperation::Other("TRUNCATE".into()).to_string(), "TRUNCATE");
    }
}
