use std::time::Duration;

use sqlx::postgres::PgPoolOptions;

pub type DbPool = sqlx::PgPool;

/// Every pooled session is read-only by default and carries a statement
/// timeout, on top of the per-query `SET TRANSACTION READ ONLY`.
pub async fn connect_with_settings(
    database_url: &str,
    max_connections: u32,
    timeout_secs: u64,
    statement_timeout_secs: u64,
) -> Result<DbPool, sqlx::Error> {
    let statement_timeout_ms = statement_timeout_secs.max(1).saturating_mul(1_000);

    PgPoolOptions::new()
        .max_connections(max_connections.max(1))
        .acquire_timeout(Duration::from_secs(timeout_secs.max(1)))
        .after_connect(move |conn, _meta| {
            Box::pin(async move {
                sqlx::query("SET default_transaction_read_only = on").execute(&mut *conn).await?;
                let statement_timeout = format!("SET statement_timeout = {statement_timeout_ms}");
                sqlx::query(&statement_timeout).execute(&mut *conn).await?;
                Ok(())
            })
        })
        .connect(database_url)
        .await
}
