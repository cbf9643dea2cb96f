//! resilient-http: send HTTP requests through the resilient client.
//!
//! Entry point for the resilient-http application.

use resilient_http::config::{Cli, Command, ValidatedConfig, write_default_config};
use std::process::ExitCode;

mod app;
mod run;

use app::{exit_code, print_config_hint, setup_trace_context, setup_tracing};

/// Main entry point.
///
/// Excluded from coverage as it's the thin wrapper around testable components.
#[cfg(not(tarpaulin_include))]
fn main() -> ExitCode {
    let cli = Cli::parse_args();

    let (method, path, data) = match &cli.command {
        Command::Init { output } => return handle_init(output),
        Command::Request { method, path, data } => (method, path, data),
    };

    // Load and validate configuration
    let config = match ValidatedConfig::load(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            print_config_hint(&e);
            return exit_code::CONFIG_ERROR;
        }
    };

    let request = match run::RequestArgs::parse(method, path, data.as_deref()) {
        Ok(request) => request,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            return exit_code::CONFIG_ERROR;
        }
    };

    // Setup logging and run
    setup_tracing(config.verbose);
    setup_trace_context();
    tracing::debug!("{config}");

    run_application(config, request)
}

/// Handles the `init` subcommand.
fn handle_init(output: &std::path::Path) -> ExitCode {
    match write_default_config(output) {
        Ok(()) => {
            println!("Configuration template written to: {}", output.display());
            exit_code::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {e}");
            exit_code::CONFIG_ERROR
        }
    }
}

/// Runs one request with the given configuration.
///
/// Excluded from coverage - requires async runtime.
#[cfg(not(tarpaulin_include))]
fn run_application(config: ValidatedConfig, request: run::RequestArgs) -> ExitCode {
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Failed to create Tokio runtime: {e}");
            return exit_code::call_failure();
        }
    };

    match runtime.block_on(run::execute(config, request)) {
        Ok(()) => exit_code::SUCCESS,
        Err(run::RunError::Build(e)) => {
            tracing::error!("Configuration error: {e}");
            exit_code::CONFIG_ERROR
        }
        Err(e) => {
            tracing::error!("{e}");
            exit_code::call_failure()
        }
    }
}
