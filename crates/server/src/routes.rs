use std::any::Any;
use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use sqlgate_agent::QueryEngine;
use sqlgate_db::QueryExecutor;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tower_http::LatencyUnit;
use tracing::{error, Level};

use crate::health::health;
use crate::query::query;

#[derive(Debug, Serialize)]
struct InternalErrorResponse {
    success: bool,
    error: &'static str,
}

pub fn router<E>(engine: Arc<QueryEngine<E>>) -> Router
where
    E: QueryExecutor + 'static,
{
    let trace = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(
            DefaultOnResponse::new().level(Level::INFO).latency_unit(LatencyUnit::Millis),
        );

    Router::new()
        .route("/health", get(health::<E>))
        .route("/query", post(query::<E>))
        .layer(CatchPanicLayer::custom(internal_error))
        .layer(trace)
        .with_state(engine)
}

fn internal_error(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<&str>()
        .map(|message| message.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string());
    error!(event_name = "server.request.panicked", detail = %detail, "request handler panicked");

    let body = InternalErrorResponse { success: false, error: "Internal Server Error" };
    (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::{Arc, Mutex};

    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request, StatusCode};
    use serde_json::Value;
    use tower::ServiceExt;
    use tracing_subscriber::fmt::MakeWriter;
    use tracing_subscriber::EnvFilter;

    use super::router;
    use crate::test_support::{engine_with, StubExecutor};

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body reads");
        serde_json::from_slice(&bytes).expect("body is json")
    }

    fn post_query(body: &'static str) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri("/query")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .expect("request builds")
    }

    #[tokio::test]
    async fn query_route_answers_with_the_outcome_envelope() {
        let app = router(Arc::new(engine_with(StubExecutor::healthy())));

        let response = app
            .oneshot(post_query(r#"{"prompt":"show balance for account 1234567890123"}"#))
            .await
            .expect("route responds");

        assert_eq!(response.status(), StatusCode::OK);
        let payload = json_body(response).await;
        assert_eq!(payload["success"], Value::Bool(true));
        assert_eq!(payload["method"], "fast");
        assert_eq!(payload["fallback"], Value::Bool(false));
        assert_eq!(payload["sql"], "SELECT currentbalance FROM ccod_bal WHERE accountno = $1");
        assert!(payload["execution_time_ms"].is_number());
    }

    #[tokio::test]
    async fn handled_failures_still_answer_ok() {
        let app = router(Arc::new(engine_with(StubExecutor::unreachable())));

        let response = app
            .oneshot(post_query(r#"{"query":"balance 1234567890"}"#))
            .await
            .expect("route responds");

        assert_eq!(response.status(), StatusCode::OK);
        let payload = json_body(response).await;
        assert_eq!(payload["success"], Value::Bool(false));
        assert_eq!(payload["error_kind"], "execution");
        assert_eq!(payload["data"], Value::Null);
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl CapturedLogs {
        fn contents(&self) -> String {
            let bytes = self.0.lock().expect("log buffer lock").clone();
            String::from_utf8_lossy(&bytes).into_owned()
        }
    }

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().expect("log buffer lock").extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for CapturedLogs {
        type Writer = CapturedLogs;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[tokio::test]
    async fn requests_are_logged_at_info_with_latency() {
        let logs = CapturedLogs::default();
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new("info"))
            .with_writer(logs.clone())
            .with_ansi(false)
            .finish();
        let _default = tracing::subscriber::set_default(subscriber);

        let app = router(Arc::new(engine_with(StubExecutor::healthy())));
        let response = app
            .oneshot(post_query(r#"{"query":"balance 1234567890"}"#))
            .await
            .expect("route responds");
        assert_eq!(response.status(), StatusCode::OK);

        let output = logs.contents();
        assert!(output.contains("finished processing request"), "logs: {output}");
        assert!(output.contains(" ms"), "logs: {output}");
        assert!(output.contains("/query"), "logs: {output}");
    }

    #[tokio::test]
    async fn panicking_request_answers_internal_server_error() {
        let app = router(Arc::new(engine_with(StubExecutor::panicking())));

        let response = app
            .oneshot(post_query(r#"{"query":"balance 1234567890"}"#))
            .await
            .expect("route responds");

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let payload = json_body(response).await;
        assert_eq!(payload["success"], Value::Bool(false));
        assert_eq!(payload["error"], "Internal Server Error");
    }

    #[tokio::test]
    async fn health_route_reports_database_outage() {
        let app = router(Arc::new(engine_with(StubExecutor::unreachable())));

        let request =
            Request::builder().uri("/health").body(Body::empty()).expect("request builds");
        let response = app.oneshot(request).await.expect("route responds");

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let payload = json_body(response).await;
        assert_eq!(payload["status"], "degraded");
        assert_eq!(payload["database"]["status"], "degraded");
    }
}
