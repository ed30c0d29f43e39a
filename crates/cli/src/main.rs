use std::process::ExitCode;

fn main() -> ExitCode {
    sqlgate_cli::run()
}
