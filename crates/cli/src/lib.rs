pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "sqlgate",
    about = "sqlgate operator CLI",
    long_about = "Run natural-language lookups through the read-only query gate, check readiness, \
                  and inspect the effective configuration.",
    after_help = "Examples:\n  sqlgate query \"balance 1234567890\"\n  sqlgate doctor --json\n  \
                  sqlgate config"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Answer one natural-language question and print the query outcome")]
    Query {
        #[arg(required = true, num_args = 1.., help = "Question text")]
        text: Vec<String>,
        #[arg(long, help = "Emit the outcome envelope as JSON")]
        json: bool,
    },
    #[command(about = "Validate config, schema, intent service settings, and DB connectivity")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Query { text, json } => commands::query::run(&text.join(" "), json),
        Command::Doctor { json } => commands::doctor::run(json),
        Command::Config => commands::config::run(),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
