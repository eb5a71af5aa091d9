//! Document snapshots and collection query parameters.

use crate::error::{ProtocolError, ProtocolResult};
use crate::JsonMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A point-in-time snapshot of a server-owned document.
///
/// Snapshots are never patched in place; a newer read produces a new value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Document identifier, unique within its collection.
    pub id: String,
    /// Opaque document payload.
    pub data: JsonMap,
    /// Monotonically increasing version counter.
    #[serde(rename = "_version")]
    pub version: u64,
    /// Creation timestamp as reported by the server.
    #[serde(rename = "_created", default, skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    /// Last update timestamp as reported by the server.
    #[serde(rename = "_updated", default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<String>,
}

impl Document {
    /// Builds a document from a `GET /api/c/{collection}/{id}` response body.
    ///
    /// Fails if `id`, `data` or `_version` is absent.
    pub fn from_value(value: Value) -> ProtocolResult<Self> {
        serde_json::from_value(value).map_err(|e| ProtocolError::invalid_structure(e.to_string()))
    }

    /// Returns a field of the document payload.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.data.get(field)
    }
}

/// Optional paging and ordering parameters for collection listings.
///
/// Only parameters that were explicitly set are sent; nothing is defaulted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentQuery {
    /// Maximum number of documents to return.
    pub limit: Option<u64>,
    /// Number of documents to skip.
    pub skip: Option<u64>,
    /// Field to sort by.
    pub sort: Option<String>,
}

impl DocumentQuery {
    /// Creates an empty query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the limit.
    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Sets the skip count.
    pub fn with_skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    /// Sets the sort field.
    pub fn with_sort(mut self, sort: impl Into<String>) -> Self {
        self.sort = Some(sort.into());
        self
    }

    /// Returns true if no parameter is set.
    pub fn is_empty(&self) -> bool {
        self.limit.is_none() && self.skip.is_none() && self.sort.is_none()
    }

    /// Renders the set parameters as URL query pairs, in `limit`, `skip`,
    /// `sort` order.
    pub fn to_query_params(&self) -> Vec<(String, String)> {
        let mut params = Vec::with_capacity(3);
        if let Some(limit) = self.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }
        if let Some(skip) = self.skip {
            params.push(("skip".to_string(), skip.to_string()));
        }
        if let Some(sort) = &self.sort {
            params.push(("sort".to_string(), sort.clone()));
        }
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn document_from_minimal_response() {
        let doc = Document::from_value(json!({"id": "a", "data": {"x": 1}, "_version": 3})).unwrap();

        assert_eq!(doc.id, "a");
        assert_eq!(doc.get("x"), Some(&json!(1)));
        assert_eq!(doc.data.len(), 1);
        assert_eq!(doc.version, 3);
        assert!(doc.created.is_none());
        assert!(doc.updated.is_none());
    }

    #[test]
    fn document_with_timestamps() {
        let doc = Document::from_value(json!({
            "id": "u1",
            "data": {"name": "Alice"},
            "_version": 12,
            "_created": "2024-01-01T00:00:00Z",
            "_updated": "2024-02-01T00:00:00Z",
        }))
        .unwrap();

        assert_eq!(doc.created.as_deref(), Some("2024-01-01T00:00:00Z"));
        assert_eq!(doc.updated.as_deref(), Some("2024-02-01T00:00:00Z"));
    }

    #[test]
    fn document_missing_required_fields() {
        for body in [
            json!({"data": {}, "_version": 1}),
            json!({"id": "a", "_version": 1}),
            json!({"id": "a", "data": {}}),
        ] {
            let err = Document::from_value(body).unwrap_err();
            assert!(matches!(err, ProtocolError::InvalidStructure { .. }));
        }
    }

    #[test]
    fn empty_query_has_no_params() {
        let query = DocumentQuery::new();
        assert!(query.is_empty());
        assert!(query.to_query_params().is_empty());
    }

    #[test]
    fn explicit_zero_is_sent() {
        let params = DocumentQuery::new().with_skip(0).to_query_params();
        assert_eq!(params, vec![("skip".to_string(), "0".to_string())]);
    }

    proptest! {
        #[test]
        fn params_only_for_set_fields(
            limit in proptest::option::of(0u64..10_000),
            skip in proptest::option::of(0u64..10_000),
            sort in proptest::option::of("[a-z_]{1,12}"),
        ) {
            let query = DocumentQuery { limit, skip, sort: sort.clone() };
            let params = query.to_query_params();

            let expected = usize::from(limit.is_some())
                + usize::from(skip.is_some())
                + usize::from(sort.is_some());
            prop_assert_eq!(params.len(), expected);

            let find = |key: &str| params.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone());
            prop_assert_eq!(find("limit"), limit.map(|v| v.to_string()));
            prop_assert_eq!(find("skip"), skip.map(|v| v.to_string()));
            prop_assert_eq!(find("sort"), sort);
        }
    }
}
