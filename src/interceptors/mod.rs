//! Built-in transport decorators.
//!
//! Each decorator implements [`Interceptor`](crate::transport::Interceptor)
//! and reads the per-call policy from the
//! [`CallContext`](crate::transport::CallContext) it receives, so one chain
//! serves every endpoint.
//!
//! Decorators that find nothing to do for a call (no limiter configured,
//! caching disabled, no caller address) pass the request through unchanged.

mod auth;
mod breaker;
mod cache;
mod identity;
mod max_size;
mod metrics;
mod observer;
mod rate_limit;
mod request_id;
mod trace;

#[cfg(test)]
mod auth_tests;
#[cfg(test)]
mod test_support;

pub use auth::{APP_TOKEN_ENV, APP_TOKEN_HEADER, AppToken, AuthPropagation};
pub use breaker::CircuitBreaking;
pub use cache::{
    CACHE_STATUS_HEADER, CacheConfig, CacheEntry, DEFAULT_CACHE_TTL, ResponseCache,
    SKIP_CACHE_HEADER,
};
pub use identity::{FORWARDED_FOR_HEADER, ForwardedFor};
pub use max_size::MaxResponseSize;
pub use metrics::Metrics;
pub use observer::AttemptObserver;
pub use rate_limit::RateLimit;
pub use request_id::{REQUEST_ID_HEADER, RequestId};
pub use trace::{TRACEPARENT_HEADER, TRACER_NAME, Tracing};
