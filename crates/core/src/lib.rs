//! Deterministic core of the query gate: schema, extraction, routing, query
//! building and the SQL safety validator. Nothing in this crate performs I/O
//! apart from configuration loading.

pub mod config;
pub mod errors;
pub mod extract;
pub mod intent;
pub mod outcome;
pub mod query;
pub mod router;
pub mod schema;
pub mod validator;

pub use errors::{EngineError, ErrorKind};
pub use extract::{extract_fast, FastIntent};
pub use intent::{IntentParseError, ParsedIntent};
pub use outcome::{QueryOutcome, Row};
pub use query::{BuiltQuery, QueryBuilder, SqlParam};
pub use router::{QueryPath, QueryRouter};
pub use schema::{AliasTable, SchemaError, TableSchema};
pub use validator::{validate, SqlVerdict, FORBIDDEN_KEYWORDS};
