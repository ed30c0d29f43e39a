use sqlgate_agent::QueryEngine;
use sqlgate_core::config::{AppConfig, LoadOptions};
use sqlgate_core::QueryOutcome;

use crate::commands::{
    current_thread_runtime, escape_json, CommandResult, EXIT_CONFIG, EXIT_OK, EXIT_QUERY_FAILED,
    EXIT_RUNTIME,
};

pub fn run(text: &str, json_output: bool) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "query",
                "config_validation",
                error.to_string(),
                EXIT_CONFIG,
            )
        }
    };

    let engine = match QueryEngine::from_config(&config) {
        Ok(engine) => engine,
        Err(error) => {
            return CommandResult::failure(
                "query",
                "engine_setup",
                format!("{error:#}"),
                EXIT_CONFIG,
            )
        }
    };

    let runtime = match current_thread_runtime() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "query",
                "runtime",
                format!("failed to initialize async runtime: {error}"),
                EXIT_RUNTIME,
            )
        }
    };

    let outcome = runtime.block_on(async {
        let outcome = engine.process_query(text).await;
        engine.disconnect().await;
        outcome
    });

    let exit_code = if outcome.success { EXIT_OK } else { EXIT_QUERY_FAILED };
    let output = if json_output {
        serde_json::to_string_pretty(&outcome)
            .unwrap_or_else(|error| serialization_failure(&error.to_string()))
    } else {
        render_human(&outcome)
    };

    CommandResult::raw(exit_code, output)
}

fn serialization_failure(error: &str) -> String {
    format!(
        "{{\"success\":false,\"error\":\"outcome serialization failed: {}\"}}",
        escape_json(error)
    )
}

fn render_human(outcome: &QueryOutcome) -> String {
    let mut lines = Vec::new();
    let fallback = if outcome.fallback { ", fast fallback" } else { "" };

    if outcome.success {
        lines.push(format!(
            "ok: {} row(s) via {} path{fallback} in {:.2} ms",
            outcome.row_count(),
            outcome.path.as_str(),
            outcome.elapsed_ms
        ));
    } else {
        let kind = outcome
            .error_kind
            .map(|kind| format!("{kind:?}").to_lowercase())
            .unwrap_or_else(|| "unknown".to_string());
        lines.push(format!(
            "error ({kind}): {}",
            outcome.error.as_deref().unwrap_or("no error message")
        ));
    }

    if let Some(sql) = &outcome.sql {
        lines.push(format!("sql: {sql}"));
    }

    for row in outcome.rows.iter().flatten() {
        lines.push(serde_json::Value::Object(row.clone()).to_string());
    }

    lines.join("\n")
}
