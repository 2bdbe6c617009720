//! Typed decoding of columnar query responses and sparse row
//! materialization.
//!
//! The query source returns `{"tables": [{"columns": [{"name": ..}],
//! "rows": [[..]]}]}`. Decoding goes through an explicit schema so a shape
//! mismatch surfaces as a [`TableError`] carrying the offending payload,
//! never as a runtime type failure halfway through parsing.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Maximum bytes of raw payload preserved inside a [`TableError`].
/// The full payload is logged at the failure site.
const ERROR_SNIPPET_LEN: usize = 512;

/// Errors from decoding a query response.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum TableError {
    /// The payload did not match the expected table shape.
    #[error("malformed query response ({reason}): {snippet}")]
    Malformed {
        /// Decoder diagnostic.
        reason: String,
        /// Leading bytes of the raw payload.
        snippet: String,
    },

    /// The response decoded but contained no tables.
    #[error("query response contained no tables")]
    NoTables,

    /// A required column was absent from the primary table.
    #[error("query response is missing column '{0}'")]
    MissingColumn(String),
}

/// A materialized row: field name to value, with absent fields omitted.
pub type Record = serde_json::Map<String, Value>;

/// Column metadata. Only the name participates in materialization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueryColumn {
    /// Column name.
    pub name: String,
}

/// One tabular result: column metadata plus row value arrays.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueryTable {
    /// Ordered column metadata.
    pub columns: Vec<QueryColumn>,
    /// Row values, positionally aligned with `columns`.
    pub rows: Vec<Vec<Value>>,
}

/// A full query response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueryResponse {
    /// Result tables; the first is the query's primary result.
    pub tables: Vec<QueryTable>,
}

impl QueryResponse {
    /// Decode a raw response body.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::Malformed`] when the body is not the expected
    /// table shape.
    pub fn parse(raw: &str) -> Result<Self, TableError> {
        serde_json::from_str(raw).map_err(|e| TableError::Malformed {
            reason: e.to_string(),
            snippet: snippet(raw),
        })
    }

    /// The primary result table.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::NoTables`] when the response is empty.
    pub fn primary_table(&self) -> Result<&QueryTable, TableError> {
        self.tables.first().ok_or(TableError::NoTables)
    }
}

impl QueryTable {
    /// Position of a column by name.
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Position of a column by name, or a typed error naming it.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::MissingColumn`] when absent.
    pub fn require_column(&self, name: &str) -> Result<usize, TableError> {
        self.column_index(name)
            .ok_or_else(|| TableError::MissingColumn(name.to_string()))
    }

    /// Materialize rows into sparse field→value records.
    ///
    /// A column whose value is JSON null or an empty string is omitted from
    /// the record entirely. Downstream consumers rely on field absence, not
    /// null, to mean "no value".
    #[must_use]
    pub fn materialize(&self) -> Vec<Record> {
        self.rows
            .iter()
            .map(|row| {
                let mut record = Record::new();
                for (column, value) in self.columns.iter().zip(row.iter()) {
                    if has_value(value) {
                        record.insert(column.name.clone(), value.clone());
                    }
                }
                record
            })
            .collect()
    }
}

fn has_value(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

fn snippet(raw: &str) -> String {
    let mut end = raw.len().min(ERROR_SNIPPET_LEN);
    while !raw.is_char_boundary(end) {
        end -= 1;
    }
    raw[..end].to_string()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn sample() -> QueryResponse {
        QueryResponse {
            tables: vec![QueryTable {
                columns: vec![
                    QueryColumn { name: "cursor".into() },
                    QueryColumn { name: "Message".into() },
                    QueryColumn { name: "Level".into() },
                ],
                rows: vec![
                    vec![
                        json!("2024-03-01 12:00:00.0000001"),
                        json!("hello"),
                        json!("info"),
                    ],
                    vec![json!("2024-03-01 12:00:00.0000002"), json!(""), Value::Null],
                ],
            }],
        }
    }

    #[test]
    fn test_parse_valid_body() {
        let raw = r#"{"tables":[{"columns":[{"name":"cursor"}],"rows":[["a"]]}]}"#;
        let response = QueryResponse::parse(raw).unwrap();
        assert_eq!(response.tables.len(), 1);
        assert_eq!(response.tables[0].columns[0].name, "cursor");
    }

    #[test]
    fn test_parse_malformed_keeps_snippet() {
        let err = QueryResponse::parse("{\"tables\": 3}").unwrap_err();
        match err {
            TableError::Malformed { snippet, .. } => assert!(snippet.contains("tables")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_primary_table_empty_response() {
        let response = QueryResponse { tables: vec![] };
        assert_eq!(response.primary_table().unwrap_err(), TableError::NoTables);
    }

    #[test]
    fn test_materialize_sparse() {
        let records = sample().tables[0].materialize();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].len(), 3);
        // Empty string and null are omitted, not materialized as null.
        assert_eq!(records[1].len(), 1);
        assert!(!records[1].contains_key("Message"));
        assert!(!records[1].contains_key("Level"));
        assert!(records[1].contains_key("cursor"));
    }

    #[test]
    fn test_materialize_keeps_non_string_values() {
        let table = QueryTable {
            columns: vec![
                QueryColumn { name: "n".into() },
                QueryColumn { name: "b".into() },
            ],
            rows: vec![vec![json!(0), json!(false)]],
        };
        let records = table.materialize();
        assert_eq!(records[0]["n"], json!(0));
        assert_eq!(records[0]["b"], json!(false));
    }

    #[test]
    fn test_require_column() {
        let table = &sample().tables[0];
        assert_eq!(table.require_column("cursor").unwrap(), 0);
        assert_eq!(
            table.require_column("missing").unwrap_err(),
            TableError::MissingColumn("missing".into())
        );
    }
}
