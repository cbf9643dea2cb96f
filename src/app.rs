//! Application startup and utilities.
//!
//! This module contains exit codes, tracing setup, and error hints
//! that support the main entry point.

use opentelemetry::global;
use opentelemetry_sdk::trace::SdkTracerProvider;
use resilient_http::config::ConfigError;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Application exit codes.
pub mod exit_code {
    use std::process::ExitCode;

    /// Success (exit code 0).
    pub const SUCCESS: ExitCode = ExitCode::SUCCESS;

    /// Configuration error (exit code 1) - invalid args, bad config file, etc.
    pub const CONFIG_ERROR: ExitCode = ExitCode::FAILURE;

    /// Call failure (exit code 2) - transport error or error status.
    ///
    /// Note: This is a function rather than a constant because `ExitCode::from()` is not `const fn`.
    pub fn call_failure() -> ExitCode {
        ExitCode::from(2)
    }
}

/// Prints helpful hints for common configuration errors.
pub fn print_config_hint(error: &ConfigError) {
    match error {
        ConfigError::FileRead { .. } => {
            eprintln!("\nRun 'resilient-http init' to generate a configuration template.");
        }
        ConfigError::UnknownReference { kind, .. } => {
            eprintln!("\nDefine the {kind} under its own section before referencing it.");
        }
        _ => {}
    }
}

/// Sets up the tracing subscriber for logging.
///
/// Logs go to stderr so response bodies on stdout stay clean.
pub fn setup_tracing(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };

    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Installs the tracer provider that client spans are started from.
///
/// Spans are not exported; the provider only assigns trace and span ids so
/// outbound `traceparent` headers and log lines can be correlated.
pub fn setup_trace_context() {
    global::set_tracer_provider(SdkTracerProvider::builder().build());
}
