//! Error types for configuration parsing and validation.

use std::path::PathBuf;

use thiserror::Error;

/// Error type for configuration operations.
///
/// Covers errors from parsing, validation, and file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("Failed to read config file '{}': {source}", path.display())]
    FileRead {
        /// Path to the config file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse the TOML configuration.
    #[error("Failed to parse TOML config: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Failed to write configuration file (for init command).
    #[error("Failed to write config file '{}': {source}", path.display())]
    FileWrite {
        /// Path to the config file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Invalid URL provided.
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl {
        /// The invalid URL string
        url: String,
        /// Reason for invalidity
        reason: String,
    },

    /// Invalid regex pattern for endpoint matching.
    #[error("Invalid regex pattern '{pattern}': {source}")]
    InvalidRegex {
        /// The invalid pattern
        pattern: String,
        /// Underlying regex error
        #[source]
        source: regex::Error,
    },

    /// Invalid duration value (zero or too large).
    #[error("Invalid duration for {field}: {reason}")]
    InvalidDuration {
        /// Name of the field
        field: &'static str,
        /// Reason for invalidity
        reason: String,
    },

    /// Invalid backoff configuration.
    #[error("Invalid backoff configuration: {0}")]
    InvalidBackoff(String),

    /// Invalid rate limiter or breaker definition.
    #[error("Invalid {kind} '{name}': {reason}")]
    InvalidResilience {
        /// "rate limiter" or "breaker"
        kind: &'static str,
        /// Name of the definition
        name: String,
        /// Reason for invalidity
        reason: String,
    },

    /// An endpoint references a limiter or breaker that is not defined.
    #[error("Endpoint '{pattern}' references unknown {kind} '{name}'")]
    UnknownReference {
        /// Endpoint path pattern
        pattern: String,
        /// "rate limiter" or "breaker"
        kind: &'static str,
        /// The missing name
        name: String,
    },

    /// Invalid HTTP method.
    #[error("Invalid HTTP method '{0}'")]
    InvalidMethod(String),

    /// Invalid status code.
    #[error("Invalid status code {0}")]
    InvalidStatus(u16),

    /// Invalid header format.
    #[error("Invalid header format '{value}': expected 'Key=Value' or 'Key: Value'")]
    InvalidHeader {
        /// The invalid header string
        value: String,
    },

    /// Invalid header name.
    #[error("Invalid header name '{name}': {reason}")]
    InvalidHeaderName {
        /// The invalid header name
        name: String,
        /// Reason for invalidity
        reason: String,
    },

    /// Invalid header value.
    #[error("Invalid header value for '{name}': {reason}")]
    InvalidHeaderValue {
        /// The header name
        name: String,
        /// Reason for invalidity
        reason: String,
    },
}

/// Kind names used in resilience-related errors.
pub mod kind {
    /// A `[[rate_limiters]]` entry.
    pub const RATE_LIMITER: &str = "rate limiter";
    /// A `[[breakers]]` entry.
    pub const BREAKER: &str = "breaker";
}
