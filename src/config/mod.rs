//! Configuration layer for the `resilient-http` binary.
//!
//! This module provides:
//! - CLI argument parsing ([`Cli`], [`Command`])
//! - TOML configuration file parsing ([`TomlConfig`])
//! - Endpoint override rules ([`EndpointRules`])
//! - Validated configuration ([`ValidatedConfig`])
//! - Configuration file generation ([`write_default_config`])
//! - Default values ([`defaults`])
//!
//! # Priority
//!
//! Configuration values are resolved with the following priority (highest to lowest):
//!
//! 1. **Explicit CLI arguments** - Values explicitly passed via command line
//! 2. **TOML config file** - Values from the configuration file
//! 3. **Built-in defaults** - Hardcoded default values
//!
//! Headers are merged per name: CLI `--header` values replace TOML
//! `[client.headers]` entries of the same name and keep the rest.
//!
//! # TOML-Only Options
//!
//! Backoff, cache, metrics, rate limiters, breakers and endpoint rules
//! are only configurable from a config file.
//!
//! # Endpoint Rules
//!
//! `[[endpoints]]` are tried in file order and the first rule whose method
//! and path regex match wins. Rate limiters and breakers are defined once
//! by name and shared by every rule that references them.

mod cli;
pub mod defaults;
mod endpoints;
mod error;
mod toml;
mod validated;

#[cfg(test)]
mod validated_tests;

pub use cli::{Cli, Command};
pub use endpoints::{EndpointRule, EndpointRules};
pub use error::ConfigError;
pub use toml::{TomlConfig, default_config_template};
pub use validated::{ValidatedConfig, write_default_config};
