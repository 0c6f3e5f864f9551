//! Narrow SQL query interface used by the persistence wrappers

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt::Debug;

use crate::domain::LabError;

#[cfg(test)]
use mockall::automock;

/// One result row, column name to JSON value
pub type Row = serde_json::Map<String, Value>;

/// Executes a parameterized statement and returns its rows.
///
/// Parameters bind positionally (`$1`, `$2`, ...). Statements that do not
/// produce rows return an empty vector.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Queryable: Send + Sync + Debug {
    async fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, LabError>;
}

/// Decode a row into a typed value
pub fn from_row<T: DeserializeOwned>(row: Row) -> Result<T, LabError> {
    serde_json::from_value(Value::Object(row))
        .map_err(|e| LabError::storage(format!("Failed to decode row: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Pair {
        name: String,
        count: u64,
    }

    fn row(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_from_row() {
        let pair: Pair = from_row(row(json!({"name": "a", "count": 3}))).unwrap();
        assert_eq!(
            pair,
            Pair {
                name: "a".to_string(),
                count: 3
            }
        );
    }

    #[test]
    fn test_from_row_reports_storage_error() {
        let err = from_row::<Pair>(row(json!({"name": "a"}))).unwrap_err();
        assert!(matches!(err, LabError::Storage { .. }));
    }
}
