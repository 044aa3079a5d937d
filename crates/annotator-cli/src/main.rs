//! Annotator binary: one extraction and dispatch pass, then exit.

use std::process::ExitCode;

use annotator_cli::{load_config, logging, run, Cli, RunSettings};
use clap::Parser;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(Some(cli.config.as_str())) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("annotator: {e}");
            return ExitCode::FAILURE;
        }
    };

    // Flushes the log file writer when main returns.
    let _guard = match logging::init_tracing(&config.logging) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("annotator: {e}");
            return ExitCode::FAILURE;
        }
    };
    tracing::info!(path = %cli.config, "resolved configuration path");

    let settings = match RunSettings::resolve(&cli, &config) {
        Ok(settings) => settings,
        Err(e) => {
            tracing::error!(error = %e, "invalid configuration");
            eprintln!("annotator: {e}");
            return ExitCode::FAILURE;
        }
    };

    match run(&settings) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "run aborted");
            eprintln!("annotator: {e}");
            ExitCode::FAILURE
        }
    }
}
