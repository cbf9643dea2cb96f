//! Default values for configuration options.
//!
//! Centralized constants to avoid magic numbers scattered across the codebase.

use std::time::Duration;

/// Default per-call timeout in seconds.
pub const TIMEOUT_SECS: u64 = 10;

/// Default number of retries after the first attempt.
pub const MAX_RETRIES: u32 = 2;

/// Default backoff strategy name.
pub const BACKOFF_STRATEGY: &str = "constant";

/// Default (initial) backoff delay in milliseconds.
pub const BACKOFF_INITIAL_DELAY_MS: u64 = 200;

/// Default maximum backoff delay in milliseconds.
pub const BACKOFF_MAX_DELAY_MS: u64 = 10_000;

/// Default backoff multiplier.
pub const BACKOFF_MULTIPLIER: f64 = 2.0;

/// Default cache entry lifetime in seconds.
pub const CACHE_TTL_SECS: u64 = 60;

/// Default metrics namespace.
pub const METRICS_NAMESPACE: &str = "http_client";

/// Default consecutive failures before a breaker opens.
pub const BREAKER_FAILURE_THRESHOLD: u32 = 5;

/// Default time a breaker stays open, in seconds.
pub const BREAKER_OPEN_TIMEOUT_SECS: u64 = 10;

/// Default successful trial calls needed to close a half-open breaker.
pub const BREAKER_HALF_OPEN_MAX_REQUESTS: u32 = 1;

/// Default output path for `init`.
pub const CONFIG_FILE: &str = "resilient-http.toml";

/// Default per-call timeout as Duration.
#[must_use]
pub const fn timeout() -> Duration {
    Duration::from_secs(TIMEOUT_SECS)
}

/// Default backoff delay as Duration.
#[must_use]
pub const fn backoff_initial_delay() -> Duration {
    Duration::from_millis(BACKOFF_INITIAL_DELAY_MS)
}

/// Default cache entry lifetime as Duration.
#[must_use]
pub const fn cache_ttl() -> Duration {
    Duration::from_secs(CACHE_TTL_SECS)
}
