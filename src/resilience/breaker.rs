//! Circuit breaker contract and reference implementations.

use std::fmt;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::future::BoxFuture;
use thiserror::Error;
use tokio::time::Instant;

use crate::transport::{HttpResponse, TransportError};

/// Why a guarded call counts as a failure.
///
/// A server-error response is a failure even though a response arrived;
/// it is carried back intact so the caller can still see it.
#[derive(Debug)]
pub enum GuardedFailure {
    /// No response was received.
    Transport(TransportError),
    /// A response arrived but its status counts as a failure.
    Status(HttpResponse),
}

/// The operation a breaker decides whether to run.
pub type GuardedCall<'a> = BoxFuture<'a, Result<HttpResponse, GuardedFailure>>;

/// Error returned by [`CircuitBreaker::execute`].
#[derive(Debug, Error)]
pub enum BreakerError {
    /// The breaker rejected the call without running it.
    #[error("circuit breaker is open")]
    Open,
    /// The call ran and failed.
    #[error("guarded call failed")]
    Failed(GuardedFailure),
}

/// Observable breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    /// Calls flow; failures are being counted.
    Closed,
    /// Calls are rejected until the open timeout passes.
    Open,
    /// A limited number of trial calls decide whether to close again.
    HalfOpen,
}

impl fmt::Display for BreakerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Closed => "closed",
            Self::Open => "open",
            Self::HalfOpen => "half-open",
        })
    }
}

/// A shared gate that stops calling a failing dependency.
///
/// Implementations are shared across concurrent calls and must be safe for
/// concurrent use.
#[async_trait]
pub trait CircuitBreaker: Send + Sync {
    /// Name used in logs and errors.
    fn name(&self) -> &str;

    /// Runs `call` if the breaker admits it, recording the outcome.
    ///
    /// # Errors
    ///
    /// Returns [`BreakerError::Open`] without polling `call` when rejected,
    /// or [`BreakerError::Failed`] when the call itself failed.
    async fn execute(&self, call: GuardedCall<'_>) -> Result<HttpResponse, BreakerError>;
}

/// A breaker that admits everything and never opens.
///
/// Used when a policy names no breaker.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThroughBreaker;

impl PassThroughBreaker {
    /// Creates a pass-through breaker.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CircuitBreaker for PassThroughBreaker {
    fn name(&self) -> &str {
        "pass-through"
    }

    async fn execute(&self, call: GuardedCall<'_>) -> Result<HttpResponse, BreakerError> {
        call.await.map_err(BreakerError::Failed)
    }
}

/// Settings for [`ConsecutiveFailureBreaker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakerSettings {
    /// Consecutive failures that open the breaker.
    pub failure_threshold: u32,
    /// How long the breaker stays open before allowing trial calls.
    pub open_timeout: Duration,
    /// Concurrent trial calls while half-open; this many consecutive
    /// successes close the breaker again.
    pub half_open_max_requests: u32,
}

impl BreakerSettings {
    /// Default failure threshold.
    pub const DEFAULT_FAILURE_THRESHOLD: u32 = 5;

    /// Default open timeout (10 seconds).
    pub const DEFAULT_OPEN_TIMEOUT: Duration = Duration::from_secs(10);

    /// Default number of half-open trial calls.
    pub const DEFAULT_HALF_OPEN_MAX_REQUESTS: u32 = 1;

    /// Creates settings with default values.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            failure_threshold: Self::DEFAULT_FAILURE_THRESHOLD,
            open_timeout: Self::DEFAULT_OPEN_TIMEOUT,
            half_open_max_requests: Self::DEFAULT_HALF_OPEN_MAX_REQUESTS,
        }
    }

    /// Sets the consecutive-failure threshold (at least 1).
    #[must_use]
    pub const fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = if threshold == 0 { 1 } else { threshold };
        self
    }

    /// Sets the open timeout.
    #[must_use]
    pub const fn with_open_timeout(mut self, timeout: Duration) -> Self {
        self.open_timeout = timeout;
        self
    }

    /// Sets the number of half-open trial calls (at least 1).
    #[must_use]
    pub const fn with_half_open_max_requests(mut self, max: u32) -> Self {
        self.half_open_max_requests = if max == 0 { 1 } else { max };
        self
    }
}

impl Default for BreakerSettings {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
enum State {
    Closed { consecutive_failures: u32 },
    Open { opened_at: Instant },
    HalfOpen { in_flight: u32, successes: u32 },
}

/// A breaker that opens after N consecutive failures.
///
/// Closed → Open after `failure_threshold` consecutive failures.
/// Open → `HalfOpen` once `open_timeout` has elapsed.
/// `HalfOpen` → Closed after `half_open_max_requests` consecutive successes,
/// or back to Open on the first failure.
#[derive(Debug)]
pub struct ConsecutiveFailureBreaker {
    name: String,
    settings: BreakerSettings,
    state: Mutex<State>,
}

impl ConsecutiveFailureBreaker {
    /// Creates a closed breaker.
    #[must_use]
    pub fn new(name: impl Into<String>, settings: BreakerSettings) -> Self {
        Self {
            name: name.into(),
            settings,
            state: Mutex::new(State::Closed {
                consecutive_failures: 0,
            }),
        }
    }

    /// Returns the breaker settings.
    #[must_use]
    pub const fn settings(&self) -> &BreakerSettings {
        &self.settings
    }

    /// Returns the current state, treating an expired open period as half-open.
    #[must_use]
    pub fn state(&self) -> BreakerState {
        match *self.lock() {
            State::Closed { .. } => BreakerState::Closed,
            State::Open { opened_at } if opened_at.elapsed() < self.settings.open_timeout => {
                BreakerState::Open
            }
            State::Open { .. } | State::HalfOpen { .. } => BreakerState::HalfOpen,
        }
    }

    fn try_acquire(&self) -> Option<Permit<'_>> {
        let mut state = self.lock();
        match *state {
            State::Closed { .. } => {}
            State::Open { opened_at } => {
                if opened_at.elapsed() < self.settings.open_timeout {
                    return None;
                }
                tracing::info!(breaker = %self.name, "Circuit breaker half-open");
                *state = State::HalfOpen {
                    in_flight: 1,
                    successes: 0,
                };
            }
            State::HalfOpen {
                ref mut in_flight, ..
            } => {
                if *in_flight >= self.settings.half_open_max_requests {
                    return None;
                }
                *in_flight += 1;
            }
        }
        Some(Permit {
            breaker: self,
            settled: false,
        })
    }

    fn record(&self, success: bool) {
        let mut state = self.lock();
        let next = match *state {
            State::Closed {
                consecutive_failures,
            } => {
                if success {
                    State::Closed {
                        consecutive_failures: 0,
                    }
                } else if consecutive_failures + 1 >= self.settings.failure_threshold {
                    tracing::warn!(breaker = %self.name, "Circuit breaker opened");
                    State::Open {
                        opened_at: Instant::now(),
                    }
                } else {
                    State::Closed {
                        consecutive_failures: consecutive_failures + 1,
                    }
                }
            }
            // A call admitted before the breaker opened; its outcome is stale
            State::Open { opened_at } => State::Open { opened_at },
            State::HalfOpen {
                in_flight,
                successes,
            } => {
                if !success {
                    tracing::warn!(breaker = %self.name, "Circuit breaker re-opened");
                    State::Open {
                        opened_at: Instant::now(),
                    }
                } else if successes + 1 >= self.settings.half_open_max_requests {
                    tracing::info!(breaker = %self.name, "Circuit breaker closed");
                    State::Closed {
                        consecutive_failures: 0,
                    }
                } else {
                    State::HalfOpen {
                        in_flight: in_flight.saturating_sub(1),
                        successes: successes + 1,
                    }
                }
            }
        };
        *state = next;
    }

    fn release(&self) {
        let mut state = self.lock();
        if let State::HalfOpen {
            ref mut in_flight, ..
        } = *state
        {
            *in_flight = in_flight.saturating_sub(1);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Admission to run one call; releases its half-open slot if abandoned.
struct Permit<'a> {
    breaker: &'a ConsecutiveFailureBreaker,
    settled: bool,
}

impl Permit<'_> {
    fn settle(mut self, success: bool) {
        self.settled = true;
        self.breaker.record(success);
    }
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.breaker.release();
        }
    }
}

#[async_trait]
impl CircuitBreaker for ConsecutiveFailureBreaker {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, call: GuardedCall<'_>) -> Result<HttpResponse, BreakerError> {
        let Some(permit) = self.try_acquire() else {
            tracing::debug!(breaker = %self.name, "Circuit breaker rejected call");
            return Err(BreakerError::Open);
        };

        let result = call.await;
        permit.settle(result.is_ok());
        result.map_err(BreakerError::Failed)
    }
}
