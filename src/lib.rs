//! resilient-http: a resilient HTTP client engine.
//!
//! Every call resolves a per-endpoint policy, runs through an ordered
//! chain of interceptors, and is retried with backoff inside a single
//! deadline. Rate limiting, circuit breaking, response caching, size
//! bounding, tracing and metrics plug in as interceptors over shared,
//! externally owned collaborators.

pub mod cache;
pub mod client;
pub mod config;
pub mod interceptors;
pub mod metrics;
pub mod policy;
pub mod resilience;
pub mod transport;
