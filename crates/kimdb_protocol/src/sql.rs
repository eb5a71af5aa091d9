//! Bodies for the `/api/sql` endpoint and the aggregate statements built on it.

use crate::error::{ProtocolError, ProtocolResult};
use crate::JsonMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Request body for `POST /api/sql`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqlRequest {
    /// SQL statement.
    pub sql: String,
    /// Collection the statement targets.
    pub collection: String,
    /// Bound parameters. Omitted from the body when empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Vec<Value>>,
}

impl SqlRequest {
    /// Creates a request without parameters.
    pub fn new(sql: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            collection: collection.into(),
            params: None,
        }
    }

    /// Sets bound parameters. An empty list leaves `params` unset.
    pub fn with_params(mut self, params: Vec<Value>) -> Self {
        self.params = if params.is_empty() { None } else { Some(params) };
        self
    }
}

/// Response body of `POST /api/sql`.
///
/// Fields other than `rows` are server-defined and kept in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SqlResponse {
    /// Result rows, empty if the server sent none.
    #[serde(default)]
    pub rows: Vec<JsonMap>,
    /// Remaining response fields (`success`, `count`, ...).
    #[serde(flatten)]
    pub extra: JsonMap,
}

impl SqlResponse {
    /// Parses a response body.
    pub fn from_value(value: Value) -> ProtocolResult<Self> {
        serde_json::from_value(value).map_err(|e| ProtocolError::invalid_structure(e.to_string()))
    }

    /// Reads the `total` column of the first row, as produced by
    /// [`count_statement`]. Returns 0 when there are no rows or the column is
    /// absent.
    pub fn total(&self) -> u64 {
        self.rows
            .first()
            .and_then(|row| row.get("total"))
            .map(as_count)
            .unwrap_or(0)
    }

    /// Folds rows produced by [`group_by_statement`] into a map from the
    /// stringified group value to its count.
    ///
    /// Rows are applied in server order, so a repeated key keeps the last
    /// count. A row without the group field is keyed as `null`.
    pub fn group_counts(&self, field: &str) -> BTreeMap<String, u64> {
        let mut groups = BTreeMap::new();
        for row in &self.rows {
            let key = match row.get(field) {
                Some(Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
                None => Value::Null.to_string(),
            };
            let count = row.get("count").map(as_count).unwrap_or(0);
            groups.insert(key, count);
        }
        groups
    }
}

/// Builds `SELECT COUNT(*) as total FROM <collection>[ WHERE <where>]`.
///
/// The where-clause is concatenated verbatim. Callers are responsible for
/// escaping it.
pub fn count_statement(collection: &str, where_clause: Option<&str>) -> String {
    let mut sql = format!("SELECT COUNT(*) as total FROM {collection}");
    if let Some(clause) = where_clause.filter(|c| !c.is_empty()) {
        sql.push_str(" WHERE ");
        sql.push_str(clause);
    }
    sql
}

/// Builds `SELECT <field>, COUNT(*) as count FROM <collection> GROUP BY <field>`.
pub fn group_by_statement(collection: &str, field: &str) -> String {
    format!("SELECT {field}, COUNT(*) as count FROM {collection} GROUP BY {field}")
}

/// Reads a non-negative count from a JSON number or numeric string.
fn as_count(value: &Value) -> u64 {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .unwrap_or(0),
        Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}
