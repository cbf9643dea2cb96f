//! Backoff strategies and retry predicates.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::transport::{HttpResponse, TransportError};

/// The outcome of one attempt, as seen by a retry predicate.
pub type AttemptOutcome = Result<HttpResponse, TransportError>;

/// Decides whether an attempt's outcome warrants another attempt.
pub type RetryPredicate = Arc<dyn Fn(&AttemptOutcome) -> bool + Send + Sync>;

/// Default predicate: retry on any transport error or any 5xx response.
#[must_use]
pub fn retry_on_error_or_server_error(outcome: &AttemptOutcome) -> bool {
    match outcome {
        Err(_) => true,
        Ok(response) => response.status.is_server_error(),
    }
}

/// Conservative predicate: retry only transient failures.
///
/// Transport errors are retried when [`TransportError::is_retryable`] says
/// so; responses are retried on 5xx, 429 (Too Many Requests) and
/// 408 (Request Timeout).
#[must_use]
pub fn retry_transient_only(outcome: &AttemptOutcome) -> bool {
    match outcome {
        Err(e) => e.is_retryable(),
        Ok(response) => {
            response.status.is_server_error()
                || response.status == http::StatusCode::TOO_MANY_REQUESTS
                || response.status == http::StatusCode::REQUEST_TIMEOUT
        }
    }
}

/// Returns the default retry predicate as a shareable value.
#[must_use]
pub fn default_retry_predicate() -> RetryPredicate {
    Arc::new(retry_on_error_or_server_error)
}

/// Configuration for exponential backoff between attempts.
///
/// # Defaults
///
/// - `initial_delay`: 200 milliseconds
/// - `max_delay`: 10 seconds
/// - `multiplier`: 2.0
///
/// # Example
///
/// ```
/// use resilient_http::policy::ExponentialBackoff;
/// use std::time::Duration;
///
/// let backoff = ExponentialBackoff::new()
///     .with_initial_delay(Duration::from_millis(100))
///     .with_max_delay(Duration::from_secs(2))
///     .with_multiplier(1.5);
/// assert_eq!(backoff.delay_for_retry(0), Duration::from_millis(100));
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExponentialBackoff {
    /// Delay before the first retry.
    pub initial_delay: Duration,

    /// Upper bound for any computed delay.
    pub max_delay: Duration,

    /// Factor applied to the delay after each retry.
    pub multiplier: f64,
}

impl ExponentialBackoff {
    /// Default initial delay (200 milliseconds).
    pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_millis(200);

    /// Default maximum delay (10 seconds).
    pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(10);

    /// Default multiplier (2.0).
    pub const DEFAULT_MULTIPLIER: f64 = 2.0;

    /// Creates exponential backoff settings with default values.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            initial_delay: Self::DEFAULT_INITIAL_DELAY,
            max_delay: Self::DEFAULT_MAX_DELAY,
            multiplier: Self::DEFAULT_MULTIPLIER,
        }
    }

    /// Sets the delay before the first retry.
    #[must_use]
    pub const fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Sets the maximum delay between retries.
    #[must_use]
    pub const fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Sets the delay multiplier.
    ///
    /// # Panics
    ///
    /// Panics if `multiplier` is not positive (must be > 0.0).
    #[must_use]
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        assert!(multiplier > 0.0, "multiplier must be positive");
        self.multiplier = multiplier;
        self
    }

    /// Computes the delay for a given retry number (0-indexed), capped at `max_delay`.
    #[must_use]
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        // Retry counts are small; saturate rather than wrap for absurd inputs
        let exponent = i32::try_from(retry).unwrap_or(i32::MAX);
        let delay_secs = self.initial_delay.as_secs_f64() * self.multiplier.powi(exponent);
        let capped = delay_secs.min(self.max_delay.as_secs_f64());
        Duration::try_from_secs_f64(capped).unwrap_or(self.max_delay)
    }
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self::new()
    }
}

/// The delay function applied between attempts.
#[derive(Clone)]
pub enum Backoff {
    /// The same delay before every retry.
    Constant(Duration),
    /// Exponentially growing delay, capped.
    Exponential(ExponentialBackoff),
    /// "Full jitter": a uniformly random delay between zero and the
    /// exponential delay for that retry.
    Jittered(ExponentialBackoff),
    /// Caller-supplied delay function.
    Custom(Arc<dyn Fn(u32) -> Duration + Send + Sync>),
}

impl Backoff {
    /// Default constant delay (200 milliseconds).
    pub const DEFAULT_DELAY: Duration = Duration::from_millis(200);

    /// Wraps a closure as a backoff strategy.
    pub fn custom(f: impl Fn(u32) -> Duration + Send + Sync + 'static) -> Self {
        Self::Custom(Arc::new(f))
    }

    /// Returns the delay to wait after attempt `attempt` (0-indexed) failed.
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Duration {
        match self {
            Self::Constant(delay) => *delay,
            Self::Exponential(exp) => exp.delay_for_retry(attempt),
            Self::Jittered(exp) => exp.delay_for_retry(attempt).mul_f64(rand::random::<f64>()),
            Self::Custom(f) => f(attempt),
        }
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::Constant(Self::DEFAULT_DELAY)
    }
}

impl fmt::Debug for Backoff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constant(delay) => f.debug_tuple("Constant").field(delay).finish(),
            Self::Exponential(exp) => f.debug_tuple("Exponential").field(exp).finish(),
            Self::Jittered(exp) => f.debug_tuple("Jittered").field(exp).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}
