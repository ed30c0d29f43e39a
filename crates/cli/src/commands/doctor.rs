use serde::Serialize;
use sqlgate_agent::HttpIntentClient;
use sqlgate_core::config::{AppConfig, LoadOptions};
use sqlgate_db::{PgQueryExecutor, PoolSettings, QueryExecutor};

use crate::commands::{current_thread_runtime, escape_json, CommandResult, EXIT_CONFIG, EXIT_OK};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

impl DoctorCheck {
    fn pass(name: &'static str, details: impl Into<String>) -> Self {
        Self { name, status: CheckStatus::Pass, details: details.into() }
    }

    fn fail(name: &'static str, details: impl Into<String>) -> Self {
        Self { name, status: CheckStatus::Fail, details: details.into() }
    }

    fn skipped(name: &'static str, details: impl Into<String>) -> Self {
        Self { name, status: CheckStatus::Skipped, details: details.into() }
    }
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool) -> CommandResult {
    let report = build_report();
    let exit_code = if report.overall_status == CheckStatus::Fail { EXIT_CONFIG } else { EXIT_OK };

    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\
                 \"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        })
    } else {
        render_human(&report)
    };

    CommandResult::raw(exit_code, output)
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck::pass(
                "config_validation",
                "configuration loaded and validated",
            ));
            checks.push(check_schema(&config));
            checks.push(check_intent_service(&config));
            checks.push(check_database_connectivity(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck::fail("config_validation", error.to_string()));
            for name in ["schema", "intent_service", "database_connectivity"] {
                checks.push(DoctorCheck::skipped(
                    name,
                    "skipped because configuration did not load",
                ));
            }
        }
    }

    let any_failed = checks.iter().any(|check| check.status == CheckStatus::Fail);
    let overall_status = if any_failed { CheckStatus::Fail } else { CheckStatus::Pass };
    let summary = if any_failed {
        "doctor: one or more readiness checks failed".to_string()
    } else {
        "doctor: all readiness checks passed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_schema(config: &AppConfig) -> DoctorCheck {
    let schema = &config.schema;
    DoctorCheck::pass(
        "schema",
        format!(
            "table `{}` keyed by `{}`, {} alias(es) over {} column(s), limit {}..={}",
            schema.table,
            schema.identifier_column,
            schema.aliases.len(),
            schema.aliases.columns().len(),
            schema.default_limit,
            schema.max_limit
        ),
    )
}

fn check_intent_service(config: &AppConfig) -> DoctorCheck {
    if !config.llm.enabled {
        return DoctorCheck::skipped(
            "intent_service",
            "slow path disabled; every request uses the fast builder",
        );
    }

    match HttpIntentClient::from_config(&config.llm) {
        Ok(client) => DoctorCheck::pass(
            "intent_service",
            format!("model `{}` at {}", config.llm.model, client.endpoint()),
        ),
        Err(error) => DoctorCheck::fail("intent_service", format!("{error:#}")),
    }
}

fn check_database_connectivity(config: &AppConfig) -> DoctorCheck {
    let runtime = match current_thread_runtime() {
        Ok(runtime) => runtime,
        Err(error) => {
            return DoctorCheck::fail(
                "database_connectivity",
                format!("failed to initialize async runtime: {error}"),
            );
        }
    };

    let result = runtime.block_on(async {
        let executor = PgQueryExecutor::new(PoolSettings::from(&config.database));
        let ping = executor.ping().await;
        executor.close().await;
        ping
    });

    match result {
        Ok(()) => {
            DoctorCheck::pass("database_connectivity", "read-only session answered `SELECT 1`")
        }
        Err(error) => DoctorCheck::fail("database_connectivity", error.to_string()),
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = vec![report.summary.clone()];

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}
