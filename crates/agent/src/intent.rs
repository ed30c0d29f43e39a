use std::sync::Arc;
use std::time::Duration;

use sqlgate_core::{IntentParseError, ParsedIntent, TableSchema};
use thiserror::Error;
use tracing::{debug, warn};

use crate::llm::LlmClient;

#[derive(Debug, Error)]
pub enum IntentError {
    #[error("intent service did not answer within {0:?}")]
    TimedOut(Duration),
    #[error("intent service call failed: {0:#}")]
    Transport(anyhow::Error),
    #[error(transparent)]
    Parse(#[from] IntentParseError),
}

impl IntentError {
    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::TimedOut(_) => "timeout",
            Self::Transport(_) => "transport",
            Self::Parse(_) => "parse",
        }
    }
}

/// Slow-path extraction: asks the model for a structured intent and never
/// fails the request. Column validation is left to the query builder.
pub struct IntentRequestor {
    client: Arc<dyn LlmClient>,
    columns: Vec<String>,
    timeout: Duration,
}

impl IntentRequestor {
    pub fn new(client: Arc<dyn LlmClient>, schema: &TableSchema, timeout: Duration) -> Self {
        let columns = schema.aliases.columns().into_iter().map(str::to_string).collect();
        Self { client, columns, timeout }
    }

    pub fn prompt_for(&self, text: &str) -> String {
        format!(
            "You translate banking questions into a JSON object.\n\
             Respond with JSON only, no prose. The object has exactly these keys:\n\
             - \"identifier\": the account number as a string, or null\n\
             - \"columns\": array of requested columns, chosen only from [{columns}]\n\
             - \"filters\": object mapping a listed column to the value it must equal\n\
             - \"limit\": positive integer, maximum number of rows\n\
             Question: {text}",
            columns = self.columns.join(", "),
        )
    }

    pub async fn try_request_intent(&self, text: &str) -> Result<ParsedIntent, IntentError> {
        let prompt = self.prompt_for(text);
        let raw = tokio::time::timeout(self.timeout, self.client.complete(&prompt))
            .await
            .map_err(|_| IntentError::TimedOut(self.timeout))?
            .map_err(IntentError::Transport)?;

        Ok(ParsedIntent::from_json(&raw)?)
    }

    /// `None` on any failure; the reason is logged, never surfaced.
    pub async fn request_intent(&self, text: &str) -> Option<ParsedIntent> {
        match self.try_request_intent(text).await {
            Ok(intent) => {
                debug!(
                    event_name = "engine.intent.parsed",
                    columns = intent.columns.len(),
                    filters = intent.filters.len(),
                    "intent service returned a structured intent"
                );
                Some(intent)
            }
            Err(error) => {
                warn!(
                    event_name = "engine.intent.failed",
                    reason = error.reason_code(),
                    error = %error,
                    "intent extraction failed"
                );
                None
            }
        }
    }
}
