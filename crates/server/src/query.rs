use std::sync::Arc;

use axum::{extract::State, Json};
use serde::Deserialize;
use sqlgate_agent::QueryEngine;
use sqlgate_core::QueryOutcome;
use sqlgate_db::QueryExecutor;

#[derive(Clone, Debug, Deserialize)]
pub struct QueryRequest {
    #[serde(alias = "prompt")]
    pub query: String,
}

/// Handled failures are part of the outcome body, so this always answers 200.
pub async fn query<E>(
    State(engine): State<Arc<QueryEngine<E>>>,
    Json(request): Json<QueryRequest>,
) -> Json<QueryOutcome>
where
    E: QueryExecutor + 'static,
{
    Json(engine.process_query(&request.query).await)
}
