use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Execution,
    Internal,
}

/// Failures a request can end in. Slow-path extraction failures never show up
/// here; they are absorbed by falling back to the fast builder.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("query rejected by `{rule}`: {reason}")]
    Rejected { rule: &'static str, reason: String },
    #[error("execution failure: {message}")]
    Execution { message: String },
    #[error("internal failure: {detail}")]
    Internal { detail: String },
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Rejected { .. } => ErrorKind::Validation,
            Self::Execution { .. } => ErrorKind::Execution,
            Self::Internal { .. } => ErrorKind::Internal,
        }
    }

    /// Caller-facing text. Internal detail stays in the server log.
    pub fn user_message(&self) -> String {
        match self {
            Self::Rejected { reason, .. } => reason.clone(),
            Self::Execution { message } => format!("Database retrieval error: {message}"),
            Self::Internal { .. } => "An internal processing error occurred.".to_string(),
        }
    }
}
