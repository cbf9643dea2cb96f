//! Shared resilience collaborators: rate limiters and circuit breakers.
//!
//! The client only depends on the [`RateLimiter`] and [`CircuitBreaker`]
//! contracts. The implementations here ([`TokenBucket`],
//! [`ConsecutiveFailureBreaker`], [`PassThroughBreaker`]) are ready to use
//! and deterministic enough to drive in tests with tokio's paused clock.

mod breaker;
mod limiter;

#[cfg(test)]
mod breaker_tests;

pub use breaker::{
    BreakerError, BreakerSettings, BreakerState, CircuitBreaker, ConsecutiveFailureBreaker,
    GuardedCall, GuardedFailure, PassThroughBreaker,
};
pub use limiter::{RateLimiter, TokenBucket};
