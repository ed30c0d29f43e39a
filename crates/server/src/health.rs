use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use serde::Serialize;
use sqlgate_agent::QueryEngine;
use sqlgate_db::QueryExecutor;
use tracing::warn;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub engine: HealthCheck,
    pub database: HealthCheck,
    pub checked_at: String,
}

pub async fn health<E>(
    State(engine): State<Arc<QueryEngine<E>>>,
) -> (StatusCode, Json<HealthResponse>)
where
    E: QueryExecutor + 'static,
{
    let database = database_check(&engine).await;
    let ready = database.status == "ready";

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        engine: HealthCheck {
            status: "ready",
            detail: format!(
                "serving table {}, slow path {}",
                engine.schema().table,
                if engine.slow_path_enabled() { "enabled" } else { "disabled" }
            ),
        },
        database,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

async fn database_check<E: QueryExecutor>(engine: &QueryEngine<E>) -> HealthCheck {
    match engine.ping().await {
        Ok(()) => HealthCheck { status: "ready", detail: "database query succeeded".to_string() },
        Err(error) => {
            warn!(
                event_name = "system.health.database_unavailable",
                correlation_id = "health",
                error = %error,
                "health check could not reach the database"
            );
            HealthCheck { status: "degraded", detail: "database is unavailable".to_string() }
        }
    }
}
