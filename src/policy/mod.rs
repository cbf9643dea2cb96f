//! Per-endpoint policy: what governs one logical call.
//!
//! This module provides:
//! - Partial, mergeable settings ([`PolicySettings`])
//! - The resolved, immutable per-call policy ([`EndpointPolicy`])
//! - Resolution of defaults plus endpoint overrides ([`PolicyResolver`])
//! - Backoff strategies and retry predicates ([`Backoff`], [`RetryPredicate`])
//!
//! # Structural Defaults
//!
//! Anything still unset after merging resolves to: timeout 10s, 2 retries,
//! constant 200ms backoff, retry on transport error or 5xx, no static
//! headers, and a pass-through circuit breaker.

mod resolver;
mod retry;
mod settings;

#[cfg(test)]
mod resolver_tests;
#[cfg(test)]
mod retry_tests;

pub use resolver::{EndpointFn, PolicyResolver};
pub use retry::{
    AttemptOutcome, Backoff, ExponentialBackoff, RetryPredicate, default_retry_predicate,
    retry_on_error_or_server_error, retry_transient_only,
};
pub use settings::{
    AuthTokenFn, DEFAULT_MAX_RETRIES, DEFAULT_TIMEOUT, EndpointPolicy, FallbackFn, PolicySettings,
};

/// Method and path of a call, as seen by hooks and token providers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestInfo {
    /// HTTP method
    pub method: http::Method,
    /// URL path (no query string)
    pub path: String,
}

impl RequestInfo {
    /// Creates request info from a method and path.
    #[must_use]
    pub fn new(method: http::Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
        }
    }
}
