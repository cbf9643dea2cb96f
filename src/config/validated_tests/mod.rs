//! Tests for validated configuration.

use http::Method;

use super::ConfigError;
use super::cli::Cli;
use super::toml::TomlConfig;
use super::validated::ValidatedConfig;

/// Helper to create CLI args from a slice, ending in a request command
fn cli(args: &[&str]) -> Cli {
    let mut full_args = vec!["resilient-http"];
    full_args.extend(args);
    full_args.extend(["request", "GET", "/"]);
    Cli::parse_from_iter(full_args)
}

/// Helper to parse TOML config
fn toml(content: &str) -> TomlConfig {
    TomlConfig::parse(content).unwrap()
}

mod loading_tests;
mod precedence_tests;
