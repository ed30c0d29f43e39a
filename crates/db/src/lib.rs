pub mod connection;
pub mod executor;
pub mod rows;

pub use connection::{connect_with_settings, DbPool};
pub use executor::{ExecutionError, PgQueryExecutor, PoolSettings, QueryExecutor};
pub use rows::decode_row;
