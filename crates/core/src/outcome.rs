use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::{EngineError, ErrorKind};
use crate::router::QueryPath;

pub type Row = Map<String, Value>;

/// Response envelope returned for every request, successful or not.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QueryOutcome {
    pub success: bool,
    #[serde(rename = "data")]
    pub rows: Option<Vec<Row>>,
    pub error: Option<String>,
    pub error_kind: Option<ErrorKind>,
    pub sql: Option<String>,
    #[serde(rename = "execution_time_ms")]
    pub elapsed_ms: f64,
    #[serde(rename = "method")]
    pub path: QueryPath,
    /// Set when the slow path yielded nothing and the fast builder answered instead.
    pub fallback: bool,
}

impl QueryOutcome {
    pub fn succeeded(rows: Vec<Row>, sql: String, path: QueryPath, fallback: bool) -> Self {
        Self {
            success: true,
            rows: Some(rows),
            error: None,
            error_kind: None,
            sql: Some(sql),
            elapsed_ms: 0.0,
            path,
            fallback,
        }
    }

    pub fn failed(
        error: &EngineError,
        sql: Option<String>,
        path: QueryPath,
        fallback: bool,
    ) -> Self {
        Self {
            success: false,
            rows: None,
            error: Some(error.user_message()),
            error_kind: Some(error.kind()),
            sql,
            elapsed_ms: 0.0,
            path,
            fallback,
        }
    }

    pub fn with_elapsed_ms(mut self, elapsed_ms: f64) -> Self {
        self.elapsed_ms = (elapsed_ms * 100.0).round() / 100.0;
        self
    }

    pub fn row_count(&self) -> usize {
        self.rows.as_ref().map_or(0, Vec::len)
    }
}
