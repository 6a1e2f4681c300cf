//! Binary entrypoint for the `workshop` CLI.

use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("workshop=info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    // Recording is handled in commands::dispatch via WORKSHOP_RECORD=<dir>.
    match workshop::run(std::env::args()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}
