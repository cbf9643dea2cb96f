//! TOML configuration file parsing.
//!
//! Defines the structure of the configuration file with serde.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::Deserialize;

use super::ConfigError;

/// Root configuration structure from TOML file.
///
/// All fields are optional to allow partial configuration
/// that can be merged with CLI arguments.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TomlConfig {
    /// Client-wide defaults
    #[serde(default)]
    pub client: ClientSection,

    /// Backoff between attempts
    #[serde(default)]
    pub backoff: BackoffSection,

    /// Response cache
    #[serde(default)]
    pub cache: CacheSection,

    /// Metrics naming
    #[serde(default)]
    pub metrics: MetricsSection,

    /// Named rate limiters
    #[serde(default)]
    pub rate_limiters: Vec<RateLimiterSection>,

    /// Named circuit breakers
    #[serde(default)]
    pub breakers: Vec<BreakerSection>,

    /// Endpoint override rules, first match wins
    #[serde(default)]
    pub endpoints: Vec<EndpointSection>,
}

/// Client-wide defaults section.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientSection {
    /// Base URL that request paths are appended to
    pub base_url: Option<String>,

    /// Per-call timeout in seconds
    pub timeout_secs: Option<u64>,

    /// Retries after the first attempt
    pub max_retries: Option<u32>,

    /// Propagate the inbound credential by default
    pub require_auth: Option<bool>,

    /// Upper bound on buffered response bytes
    pub max_response_size: Option<u64>,

    /// Static headers applied to every call
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

/// Backoff section.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BackoffSection {
    /// "constant", "exponential" or "jittered"
    pub strategy: Option<String>,

    /// Delay before the first retry (the constant delay for "constant")
    pub initial_delay_ms: Option<u64>,

    /// Upper bound on any delay
    pub max_delay_ms: Option<u64>,

    /// Growth factor per retry
    pub multiplier: Option<f64>,
}

/// Response cache section.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheSection {
    /// Enable caching for every endpoint by default
    #[serde(default)]
    pub enabled: bool,

    /// Entry lifetime when an endpoint sets none
    pub default_ttl_secs: Option<u64>,

    /// Cacheable methods (default: GET, HEAD)
    pub methods: Option<Vec<String>>,

    /// Cacheable statuses (default: 200)
    pub status_codes: Option<Vec<u16>>,

    /// Request header that bypasses the cache
    pub skip_header: Option<String>,
}

/// Metrics section.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsSection {
    /// Metric namespace (default: `http_client`)
    pub namespace: Option<String>,

    /// Metric subsystem
    pub subsystem: Option<String>,
}

/// A named token-bucket rate limiter.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RateLimiterSection {
    /// Name referenced by endpoints
    pub name: String,

    /// Sustained refill rate
    pub requests_per_second: f64,

    /// Bucket capacity
    pub burst: u32,
}

/// A named consecutive-failure circuit breaker.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BreakerSection {
    /// Name referenced by endpoints
    pub name: String,

    /// Consecutive failures before opening
    pub failure_threshold: Option<u32>,

    /// Seconds to stay open before probing
    pub open_timeout_secs: Option<u64>,

    /// Successful trial calls needed to close again
    pub half_open_max_requests: Option<u32>,
}

/// An endpoint override rule.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EndpointSection {
    /// Method to match; any method when absent
    pub method: Option<String>,

    /// Regex matched against the URL path
    pub path: String,

    /// Per-call timeout in seconds
    pub timeout_secs: Option<u64>,

    /// Retries after the first attempt
    pub max_retries: Option<u32>,

    /// Propagate the inbound credential
    pub require_auth: Option<bool>,

    /// Enable response caching
    pub cache: Option<bool>,

    /// Cache entry lifetime in seconds
    pub cache_ttl_secs: Option<u64>,

    /// Name of a `[[rate_limiters]]` entry
    pub rate_limiter: Option<String>,

    /// Name of a `[[breakers]]` entry
    pub breaker: Option<String>,

    /// Upper bound on buffered response bytes
    pub max_response_size: Option<u64>,

    /// Static headers for matching calls
    #[serde(default)]
    pub headers: HashMap<String, String>,

    /// Free-form labels
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

impl TomlConfig {
    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        Self::parse(&content)
    }

    /// Parses configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(ConfigError::from)
    }
}

/// Generates a default configuration file with comments.
#[must_use]
pub fn default_config_template() -> String {
    r#"# resilient-http configuration file

[client]
# Base URL that request paths are appended to
# base_url = "https://api.example.com"

# Per-call timeout in seconds, all attempts included (default: 10)
timeout_secs = 10

# Retries after the first attempt (default: 2)
max_retries = 2

# Copy the caller's credential into Authorization (default: false)
# require_auth = false

# Upper bound on buffered response bytes (default: unbounded)
# max_response_size = 10485760

# Static headers; a header already on the request wins
# [client.headers]
# User-Agent = "resilient-http"

[backoff]
# "constant", "exponential" or "jittered" (default: constant)
strategy = "constant"

# Delay before the first retry in milliseconds (default: 200)
initial_delay_ms = 200

# Upper bound on any delay, exponential strategies only (default: 10000)
# max_delay_ms = 10000

# Growth factor per retry, exponential strategies only (default: 2.0)
# multiplier = 2.0

[cache]
# Cache responses for every endpoint (default: false)
enabled = false

# Entry lifetime when an endpoint sets none (default: 60)
# default_ttl_secs = 60

# methods = ["GET", "HEAD"]
# status_codes = [200]
# skip_header = "X-Skip-Cache"

[metrics]
# namespace = "http_client"
# subsystem = ""

# [[rate_limiters]]
# name = "search"
# requests_per_second = 5.0
# burst = 10

# [[breakers]]
# name = "payments"
# failure_threshold = 5
# open_timeout_secs = 10
# half_open_max_requests = 1

# Endpoint rules are tried in order; the first match wins
# [[endpoints]]
# method = "GET"
# path = "^/search"
# rate_limiter = "search"
# cache = true
# cache_ttl_secs = 30

# [[endpoints]]
# path = "^/payments/"
# breaker = "payments"
# max_retries = 0
# require_auth = true
"#
    .to_string()
}
