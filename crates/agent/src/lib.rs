//! Request orchestration for the query gate.
//!
//! The model is only ever a translator: it proposes a structured intent,
//! and everything that reaches the database is built from the configured
//! schema and checked by the validator.

pub mod intent;
pub mod llm;
pub mod runtime;

pub use intent::{IntentError, IntentRequestor};
pub use llm::{HttpIntentClient, LlmClient};
pub use runtime::QueryEngine;
