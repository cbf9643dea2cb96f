//! CLI argument parsing using clap.
//!
//! Defines the command-line interface with all options and subcommands.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use super::defaults;

/// resilient-http: HTTP calls with per-endpoint retry, rate limiting,
/// circuit breaking and caching.
#[derive(Debug, Parser)]
#[command(name = "resilient-http")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,

    /// Path to configuration file
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,

    /// Base URL that request paths are appended to
    #[arg(long = "base-url", global = true)]
    pub base_url: Option<String>,

    /// Per-call timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Retries after the first attempt
    #[arg(long, global = true)]
    pub retries: Option<u32>,

    /// HTTP headers in 'Key=Value' or 'Key: Value' format (can be specified multiple times)
    #[arg(long = "header", value_name = "K=V", global = true)]
    pub headers: Vec<String>,

    /// Enable verbose logging
    #[arg(long, short, global = true)]
    pub verbose: bool,
}

/// Subcommands for resilient-http
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Send one request and print the response body
    Request {
        /// HTTP method
        method: String,

        /// Path relative to the base URL, or an absolute URL
        path: String,

        /// Request body
        #[arg(long, short)]
        data: Option<String>,
    },

    /// Generate a default configuration file
    Init {
        /// Output path for the configuration file
        #[arg(long, short, default_value = defaults::CONFIG_FILE)]
        output: PathBuf,
    },
}

impl Cli {
    /// Parses CLI arguments from the command line.
    #[must_use]
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Parses CLI arguments from an iterator (useful for testing).
    pub fn parse_from_iter<I, T>(iter: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Self::parse_from(iter)
    }

    /// Returns true if this is the init command.
    #[must_use]
    pub const fn is_init(&self) -> bool {
        matches!(self.command, Command::Init { .. })
    }
}
