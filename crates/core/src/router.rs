use serde::{Deserialize, Serialize};

use crate::extract::find_identifier;

pub const DEFAULT_MAX_SIMPLE_WORDS: usize = 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryPath {
    Fast,
    Llm,
}

impl QueryPath {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fast => "fast",
            Self::Llm => "llm",
        }
    }
}

/// Cheap pre-filter that keeps trivial lookups away from the intent service.
///
/// A wrong "complex" answer only costs latency, since the slow path is still
/// validated and falls back to the fast builder.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QueryRouter {
    max_simple_words: usize,
}

impl Default for QueryRouter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SIMPLE_WORDS)
    }
}

impl QueryRouter {
    pub fn new(max_simple_words: usize) -> Self {
        Self { max_simple_words }
    }

    pub fn is_simple(&self, text: &str) -> bool {
        find_identifier(text).is_some() && text.split_whitespace().count() < self.max_simple_words
    }

    pub fn route(&self, text: &str, slow_path_available: bool) -> QueryPath {
        if !slow_path_available || self.is_simple(text) {
            QueryPath::Fast
        } else {
            QueryPath::Llm
        }
    }
}
