use async_trait::async_trait;
use serde_json::{json, Map};
use sqlgate_agent::QueryEngine;
use sqlgate_core::{BuiltQuery, QueryRouter, Row, TableSchema};
use sqlgate_db::{ExecutionError, QueryExecutor};

#[derive(Clone, Copy, PartialEq, Eq)]
enum StubMode {
    Healthy,
    Unreachable,
    Panicking,
}

pub struct StubExecutor {
    mode: StubMode,
}

impl StubExecutor {
    pub fn healthy() -> Self {
        Self { mode: StubMode::Healthy }
    }

    pub fn unreachable() -> Self {
        Self { mode: StubMode::Unreachable }
    }

    /// Healthy for `ping`, panics inside `fetch_rows`.
    pub fn panicking() -> Self {
        Self { mode: StubMode::Panicking }
    }
}

#[async_trait]
impl QueryExecutor for StubExecutor {
    async fn fetch_rows(&self, _query: &BuiltQuery) -> Result<Vec<Row>, ExecutionError> {
        match self.mode {
            StubMode::Healthy => {}
            StubMode::Unreachable => return Err(ExecutionError::Timeout),
            StubMode::Panicking => panic!("row decoder blew up"),
        }
        let mut row = Map::new();
        row.insert("currentbalance".to_string(), json!("1520.75"));
        Ok(vec![row])
    }

    async fn ping(&self) -> Result<(), ExecutionError> {
        match self.mode {
            StubMode::Unreachable => Err(ExecutionError::Timeout),
            StubMode::Healthy | StubMode::Panicking => Ok(()),
        }
    }
}

pub fn engine_with(executor: StubExecutor) -> QueryEngine<StubExecutor> {
    QueryEngine::new(TableSchema::default(), QueryRouter::default(), None, executor)
}
