//! Error types for transport operations.

use std::time::Duration;

use thiserror::Error;

/// Boxed error used where the concrete failure type belongs to a collaborator.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Error type for a single trip through the transport chain.
///
/// Describes what went wrong without dictating recovery strategy.
/// Whether an attempt is retried is decided by the resolved retry predicate.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Network connection failed.
    ///
    /// This includes DNS resolution failures, connection refused,
    /// TLS failures and other network-level errors.
    #[error("Connection error: {0}")]
    Connection(#[source] BoxError),

    /// The call's deadline elapsed before a response arrived.
    #[error("Request timed out")]
    Timeout,

    /// The provided URL is invalid.
    ///
    /// This typically indicates a configuration error rather than
    /// a transient failure.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The rate limiter could not grant a token before the call's deadline.
    #[error("Rate limiter wait failed: {0}")]
    RateLimited(#[from] RateLimitError),

    /// The circuit breaker rejected the call without contacting the server.
    #[error("Circuit breaker '{name}' is open")]
    CircuitOpen {
        /// Name of the breaker that rejected the call
        name: String,
    },

    /// Reading the response body failed.
    #[error("Response body error: {0}")]
    Body(#[from] BodyError),

    /// A decorator failed for a reason of its own.
    #[error("Interceptor '{name}' failed: {source}")]
    Interceptor {
        /// Name of the failing decorator
        name: &'static str,
        /// Underlying error
        #[source]
        source: BoxError,
    },
}

impl TransportError {
    /// Wraps any error as a connection failure.
    pub fn connection(err: impl Into<BoxError>) -> Self {
        Self::Connection(err.into())
    }

    /// Returns true if the error is potentially transient and worth retrying.
    ///
    /// Configuration problems and local rejections (breaker open, limiter
    /// deadline) are not transient from the caller's point of view.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Connection(_) | Self::Timeout | Self::Body(BodyError::Read(_)) => true,
            Self::InvalidUrl(_)
            | Self::RateLimited(_)
            | Self::CircuitOpen { .. }
            | Self::Body(BodyError::TooLarge { .. })
            | Self::Interceptor { .. } => false,
        }
    }

    /// Short, stable name of the error kind, suitable as a metric label.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Connection(_) => "connection",
            Self::Timeout => "timeout",
            Self::InvalidUrl(_) => "invalid_url",
            Self::RateLimited(_) => "rate_limited",
            Self::CircuitOpen { .. } => "circuit_open",
            Self::Body(_) => "body",
            Self::Interceptor { .. } => "interceptor",
        }
    }

    /// Returns true if no request reached the wire because of a local gate.
    #[must_use]
    pub const fn is_local_rejection(&self) -> bool {
        matches!(self, Self::RateLimited(_) | Self::CircuitOpen { .. })
    }
}

/// Error raised while reading a response body.
#[derive(Debug, Error)]
pub enum BodyError {
    /// The body exceeded the configured maximum response size.
    #[error("Response body exceeds limit of {limit} bytes")]
    TooLarge {
        /// Configured limit in bytes
        limit: u64,
    },

    /// The underlying stream failed.
    #[error("Failed to read response body: {0}")]
    Read(#[source] BoxError),
}

/// Error returned by a rate limiter wait.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RateLimitError {
    /// The call's deadline passed while waiting.
    #[error("deadline exceeded while waiting for a token")]
    DeadlineExceeded,

    /// The next token would only be available after the call's deadline.
    #[error("next token available in {wait:?}, which exceeds the call deadline")]
    WouldExceedDeadline {
        /// Time until the next token
        wait: Duration,
    },
}
