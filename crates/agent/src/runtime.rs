use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use sqlgate_core::config::AppConfig;
use sqlgate_core::{
    extract_fast, validate, BuiltQuery, EngineError, QueryBuilder, QueryOutcome, QueryPath,
    QueryRouter, SqlVerdict, TableSchema,
};
use sqlgate_db::{ExecutionError, PgQueryExecutor, PoolSettings, QueryExecutor};
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::intent::IntentRequestor;
use crate::llm::HttpIntentClient;

/// The request pipeline: route, build, validate, execute.
///
/// Built once at startup and shared behind an `Arc`. Every call to
/// [`QueryEngine::process_query`] yields a well-formed [`QueryOutcome`].
pub struct QueryEngine<E = PgQueryExecutor> {
    schema: TableSchema,
    router: QueryRouter,
    intent: Option<IntentRequestor>,
    executor: E,
}

impl QueryEngine<PgQueryExecutor> {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let executor = PgQueryExecutor::new(PoolSettings::from(&config.database));
        let intent = if config.llm.enabled {
            let client = HttpIntentClient::from_config(&config.llm)
                .context("failed to configure the intent service client")?;
            Some(IntentRequestor::new(
                Arc::new(client),
                &config.schema,
                Duration::from_secs(config.llm.timeout_secs),
            ))
        } else {
            None
        };

        Ok(Self::new(
            config.schema.clone(),
            QueryRouter::new(config.router.max_simple_words),
            intent,
            executor,
        ))
    }

    /// Opens the pool eagerly. Safe to call more than once.
    pub async fn connect(&self) -> Result<(), ExecutionError> {
        self.executor.connect().await.map(|_| ())
    }

    pub async fn disconnect(&self) {
        self.executor.close().await;
    }
}

impl<E> QueryEngine<E>
where
    E: QueryExecutor,
{
    pub fn new(
        schema: TableSchema,
        router: QueryRouter,
        intent: Option<IntentRequestor>,
        executor: E,
    ) -> Self {
        Self { schema, router, intent, executor }
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn slow_path_enabled(&self) -> bool {
        self.intent.is_some()
    }

    pub async fn ping(&self) -> Result<(), ExecutionError> {
        self.executor.ping().await
    }

    pub async fn process_query(&self, text: &str) -> QueryOutcome {
        let correlation_id = Uuid::new_v4().to_string();
        self.process_query_with_id(text, &correlation_id).await
    }

    pub async fn process_query_with_id(&self, text: &str, correlation_id: &str) -> QueryOutcome {
        let span = info_span!("query", correlation_id = %correlation_id);
        self.run(text, correlation_id).instrument(span).await
    }

    async fn run(&self, text: &str, correlation_id: &str) -> QueryOutcome {
        let started = Instant::now();
        let path = self.router.route(text, self.slow_path_enabled());
        info!(
            event_name = "engine.query.routed",
            correlation_id = %correlation_id,
            path = path.as_str(),
            "query routed"
        );

        let (query, fallback) = self.build(text, path, correlation_id).await;
        let outcome = self
            .execute(query, path, fallback, correlation_id)
            .await
            .with_elapsed_ms(started.elapsed().as_secs_f64() * 1_000.0);

        info!(
            event_name = "engine.query.completed",
            correlation_id = %correlation_id,
            success = outcome.success,
            rows = outcome.row_count(),
            elapsed_ms = outcome.elapsed_ms,
            "query completed"
        );
        outcome
    }

    async fn build(
        &self,
        text: &str,
        path: QueryPath,
        correlation_id: &str,
    ) -> (BuiltQuery, bool) {
        let builder = QueryBuilder::new(&self.schema);

        if let (QueryPath::Llm, Some(requestor)) = (path, &self.intent) {
            if let Some(intent) = requestor.request_intent(text).await {
                return (builder.build_from_intent(&intent), false);
            }
            warn!(
                event_name = "engine.query.fallback",
                correlation_id = %correlation_id,
                "slow path produced no intent, using the fast builder"
            );
            return (builder.build_fast(&extract_fast(text, &self.schema.aliases)), true);
        }

        (builder.build_fast(&extract_fast(text, &self.schema.aliases)), false)
    }

    async fn execute(
        &self,
        query: BuiltQuery,
        path: QueryPath,
        fallback: bool,
        correlation_id: &str,
    ) -> QueryOutcome {
        if let SqlVerdict::Deny { rule, reason } = validate(&query.sql) {
            warn!(
                event_name = "engine.query.rejected",
                correlation_id = %correlation_id,
                rule,
                reason = %reason,
                sql = %query.sql,
                "statement rejected by the validator"
            );
            let rejection = EngineError::Rejected { rule, reason };
            return QueryOutcome::failed(&rejection, Some(query.sql), path, fallback);
        }

        match self.executor.fetch_rows(&query).await {
            Ok(rows) => QueryOutcome::succeeded(rows, query.sql, path, fallback),
            Err(failure) => {
                error!(
                    event_name = "engine.query.execution_failed",
                    correlation_id = %correlation_id,
                    error = %failure,
                    sql = %query.sql,
                    "statement execution failed"
                );
                let engine_error = EngineError::from(failure);
                QueryOutcome::failed(&engine_error, Some(query.sql), path, fallback)
            }
        }
    }
}
