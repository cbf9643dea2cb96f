//! Key/value cache backends used by the response-caching decorator.

mod memory;


use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::transport::BoxError;

pub use memory::MemoryCache;

/// Error type for cache backend operations.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The backend failed to serve the operation.
    #[error("Cache backend error: {0}")]
    Backend(#[source] BoxError),
}

/// A TTL-respecting key/value store.
///
/// Shared by every call through the client, so implementations must
/// tolerate concurrent `get`/`set`.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Returns the value for `key`, or `None` when absent or expired.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] when the backend is unavailable.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Stores `value` under `key` for `ttl`.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] when the backend is unavailable.
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;
}
