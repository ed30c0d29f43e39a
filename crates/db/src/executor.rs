use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use sqlgate_core::config::DatabaseConfig;
use sqlgate_core::{BuiltQuery, EngineError, Row, SqlParam};
use sqlx::postgres::PgArguments;
use sqlx::query::Query;
use sqlx::Postgres;
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::info;

use crate::connection::{connect_with_settings, DbPool};
use crate::rows::decode_row;

#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("database connection failed: {0}")]
    Connect(#[source] sqlx::Error),
    #[error("timed out waiting for a database connection")]
    Timeout,
    #[error("database rejected the statement: {0}")]
    Database(#[source] sqlx::Error),
    #[error("could not decode column `{column}` ({type_name}): {message}")]
    Decode { column: String, type_name: String, message: String },
}

impl ExecutionError {
    pub fn classify(error: sqlx::Error) -> Self {
        match error {
            sqlx::Error::PoolTimedOut => Self::Timeout,
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed
            | sqlx::Error::Configuration(_) => Self::Connect(error),
            sqlx::Error::ColumnDecode { index, source } => Self::Decode {
                column: index,
                type_name: "unknown".to_string(),
                message: source.to_string(),
            },
            sqlx::Error::Decode(source) => Self::Decode {
                column: "unknown".to_string(),
                type_name: "unknown".to_string(),
                message: source.to_string(),
            },
            other => Self::Database(other),
        }
    }
}

impl From<ExecutionError> for EngineError {
    fn from(error: ExecutionError) -> Self {
        match error {
            ExecutionError::Connect(_) | ExecutionError::Timeout => {
                Self::Execution { message: "database is unavailable".to_string() }
            }
            ExecutionError::Database(source) => {
                let message = source
                    .as_database_error()
                    .map(|database_error| database_error.message().to_string())
                    .unwrap_or_else(|| "statement could not be executed".to_string());
                Self::Execution { message }
            }
            decode @ ExecutionError::Decode { .. } => Self::Internal { detail: decode.to_string() },
        }
    }
}

/// Seam between the orchestrator and the database.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Runs a validated statement inside a read-only transaction.
    async fn fetch_rows(&self, query: &BuiltQuery) -> Result<Vec<Row>, ExecutionError>;

    async fn ping(&self) -> Result<(), ExecutionError>;
}

#[derive(Clone, Debug)]
pub struct PoolSettings {
    pub url: SecretString,
    pub max_connections: u32,
    pub timeout_secs: u64,
    pub statement_timeout_secs: u64,
}

impl From<&DatabaseConfig> for PoolSettings {
    fn from(config: &DatabaseConfig) -> Self {
        Self {
            url: config.url.clone(),
            max_connections: config.max_connections,
            timeout_secs: config.timeout_secs,
            statement_timeout_secs: config.statement_timeout_secs,
        }
    }
}

/// Postgres executor with a pool that is created on first use unless
/// [`PgQueryExecutor::connect`] already ran at startup.
#[derive(Debug)]
pub struct PgQueryExecutor {
    settings: PoolSettings,
    pool: OnceCell<DbPool>,
}

impl PgQueryExecutor {
    pub fn new(settings: PoolSettings) -> Self {
        Self { settings, pool: OnceCell::new() }
    }

    pub fn with_pool(settings: PoolSettings, pool: DbPool) -> Self {
        Self { settings, pool: OnceCell::new_with(Some(pool)) }
    }

    /// Idempotent: later calls return the pool created by the first one.
    pub async fn connect(&self) -> Result<&DbPool, ExecutionError> {
        self.pool
            .get_or_try_init(|| async {
                info!(
                    event_name = "system.database.connecting",
                    correlation_id = "pool",
                    max_connections = self.settings.max_connections,
                    "initializing database connection pool"
                );
                let pool = connect_with_settings(
                    self.settings.url.expose_secret(),
                    self.settings.max_connections,
                    self.settings.timeout_secs,
                    self.settings.statement_timeout_secs,
                )
                .await
                .map_err(ExecutionError::classify)?;
                info!(
                    event_name = "system.database.connected",
                    correlation_id = "pool",
                    "database connection pool established"
                );
                Ok(pool)
            })
            .await
    }

    pub fn is_connected(&self) -> bool {
        self.pool.get().is_some_and(|pool| !pool.is_closed())
    }

    pub async fn close(&self) {
        if let Some(pool) = self.pool.get() {
            info!(
                event_name = "system.database.closing",
                correlation_id = "shutdown",
                "closing database connection pool"
            );
            pool.close().await;
        }
    }
}

#[async_trait]
impl QueryExecutor for PgQueryExecutor {
    async fn fetch_rows(&self, query: &BuiltQuery) -> Result<Vec<Row>, ExecutionError> {
        let pool = self.connect().await?;
        let mut transaction = pool.begin().await.map_err(ExecutionError::classify)?;

        sqlx::query("SET TRANSACTION READ ONLY")
            .execute(&mut *transaction)
            .await
            .map_err(ExecutionError::classify)?;

        let rows = bind_params(sqlx::query(&query.sql), &query.params)
            .fetch_all(&mut *transaction)
            .await
            .map_err(ExecutionError::classify)?;

        transaction.commit().await.map_err(ExecutionError::classify)?;

        rows.iter().map(decode_row).collect()
    }

    async fn ping(&self) -> Result<(), ExecutionError> {
        let pool = self.connect().await?;
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(pool)
            .await
            .map(|_| ())
            .map_err(ExecutionError::classify)
    }
}

fn bind_params<'q>(
    mut statement: Query<'q, Postgres, PgArguments>,
    params: &'q [SqlParam],
) -> Query<'q, Postgres, PgArguments> {
    for param in params {
        statement = match param {
            SqlParam::Int(value) => statement.bind(*value),
            SqlParam::Float(value) => statement.bind(*value),
            SqlParam::Bool(value) => statement.bind(*value),
            SqlParam::Text(value) => statement.bind(value.as_str()),
        };
    }
    statement
}
