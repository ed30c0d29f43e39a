//! Structured intent as returned by the external extraction model.
//!
//! The shape mirrors what the model is asked to emit, but every field is
//! attacker-influenced. Parsing only checks the JSON shape; the query builder
//! decides what (if anything) of it is usable.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ParsedIntent {
    /// String or number; anything else is ignored by the builder.
    pub identifier: Option<Value>,
    pub columns: Vec<String>,
    pub filters: BTreeMap<String, Value>,
    /// Kept raw so a non-numeric or negative limit degrades to the default.
    pub limit: Option<Value>,
}

#[derive(Debug, Error)]
pub enum IntentParseError {
    #[error("intent payload is not valid JSON: {0}")]
    Json(#[source] serde_json::Error),
    #[error("intent payload must be a JSON object, got {0}")]
    NotAnObject(&'static str),
    #[error("intent payload does not match the expected shape: {0}")]
    Shape(#[source] serde_json::Error),
}

impl ParsedIntent {
    pub fn from_json(raw: &str) -> Result<Self, IntentParseError> {
        let value: Value = serde_json::from_str(raw).map_err(IntentParseError::Json)?;
        if !value.is_object() {
            return Err(IntentParseError::NotAnObject(json_type_name(&value)));
        }
        serde_json::from_value(value).map_err(IntentParseError::Shape)
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
