//! Response caching over a pluggable key/value backend.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use serde::{Deserialize, Serialize};
use tokio::time::timeout_at;

use super::REQUEST_ID_HEADER;
use crate::cache::CacheBackend;
use crate::transport::{
    CallContext, HttpRequest, HttpResponse, Interceptor, SharedTransport, Transport,
    TransportError,
};

/// Request header that bypasses the cache when set to `true`.
pub const SKIP_CACHE_HEADER: HeaderName = HeaderName::from_static("x-skip-cache");

/// Response header marking a cache hit.
pub const CACHE_STATUS_HEADER: HeaderName = HeaderName::from_static("x-cache");

/// Default entry lifetime when the policy sets none.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60);

type KeyFn = Arc<dyn Fn(&HttpRequest) -> String + Send + Sync>;

/// Configuration for [`ResponseCache`].
#[derive(Clone)]
pub struct CacheConfig {
    backend: Option<Arc<dyn CacheBackend>>,
    default_ttl: Duration,
    methods: Vec<Method>,
    status_codes: Vec<StatusCode>,
    key_fn: Option<KeyFn>,
    skip_header: HeaderName,
}

impl CacheConfig {
    /// Creates a configuration with no backend.
    ///
    /// Caches `GET` and `HEAD` responses with status 200 for
    /// [`DEFAULT_CACHE_TTL`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            backend: None,
            default_ttl: DEFAULT_CACHE_TTL,
            methods: vec![Method::GET, Method::HEAD],
            status_codes: vec![StatusCode::OK],
            key_fn: None,
            skip_header: SKIP_CACHE_HEADER,
        }
    }

    /// Sets the backend.
    #[must_use]
    pub fn with_backend(mut self, backend: Arc<dyn CacheBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Sets the lifetime used when the policy has no TTL.
    #[must_use]
    pub const fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    /// Sets which methods are cacheable.
    #[must_use]
    pub fn with_methods(mut self, methods: impl IntoIterator<Item = Method>) -> Self {
        self.methods = methods.into_iter().collect();
        self
    }

    /// Sets which response statuses are stored.
    #[must_use]
    pub fn with_status_codes(mut self, codes: impl IntoIterator<Item = StatusCode>) -> Self {
        self.status_codes = codes.into_iter().collect();
        self
    }

    /// Sets a custom cache-key function. The default key is `METHOD:URL`.
    #[must_use]
    pub fn with_key_fn(mut self, f: impl Fn(&HttpRequest) -> String + Send + Sync + 'static) -> Self {
        self.key_fn = Some(Arc::new(f));
        self
    }

    /// Sets the bypass header name.
    #[must_use]
    pub fn with_skip_header(mut self, name: HeaderName) -> Self {
        self.skip_header = name;
        self
    }

    /// Returns true if a backend is configured.
    #[must_use]
    pub fn has_backend(&self) -> bool {
        self.backend.is_some()
    }

    fn key(&self, req: &HttpRequest) -> String {
        self.key_fn
            .as_ref()
            .map_or_else(|| format!("{}:{}", req.method, req.url), |f| f(req))
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CacheConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheConfig")
            .field("backend", &self.backend.is_some())
            .field("default_ttl", &self.default_ttl)
            .field("methods", &self.methods)
            .field("status_codes", &self.status_codes)
            .field("key_fn", &self.key_fn.is_some())
            .field("skip_header", &self.skip_header)
            .finish()
    }
}

/// A cached response, serialized as JSON in the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Status line, e.g. `200 OK`
    pub status: String,
    /// Numeric status code
    pub status_code: u16,
    /// Response headers, minus the request id
    pub headers: Vec<(String, String)>,
    /// Response body
    pub body: Vec<u8>,
}

impl CacheEntry {
    fn from_response(response: &HttpResponse, body: &[u8]) -> Self {
        let headers = response
            .headers
            .iter()
            .filter(|(name, _)| **name != REQUEST_ID_HEADER)
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        Self {
            status: response.status.to_string(),
            status_code: response.status.as_u16(),
            headers,
            body: body.to_vec(),
        }
    }

    fn into_response(self) -> Option<HttpResponse> {
        let status = StatusCode::from_u16(self.status_code).ok()?;
        let mut headers = HeaderMap::with_capacity(self.headers.len() + 1);
        for (name, value) in self.headers {
            let name = HeaderName::try_from(name).ok()?;
            let value = HeaderValue::try_from(value).ok()?;
            headers.append(name, value);
        }
        headers.insert(CACHE_STATUS_HEADER, HeaderValue::from_static("HIT"));
        Some(HttpResponse::new(status, headers, self.body))
    }
}

/// Serves cacheable requests from a backend and stores fresh responses.
///
/// Only engages when the resolved policy enables caching. Backend failures
/// and undecodable entries degrade to a miss; they never fail the call.
#[derive(Debug, Clone, Default)]
pub struct ResponseCache {
    config: Arc<CacheConfig>,
}

impl ResponseCache {
    /// Creates the decorator.
    #[must_use]
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }
}

impl Interceptor for ResponseCache {
    fn wrap(&self, next: SharedTransport) -> SharedTransport {
        Arc::new(CacheTransport {
            next,
            config: Arc::clone(&self.config),
        })
    }
}

struct CacheTransport {
    next: SharedTransport,
    config: Arc<CacheConfig>,
}

impl CacheTransport {
    async fn lookup(
        &self,
        backend: &dyn CacheBackend,
        key: &str,
        cx: &CallContext,
    ) -> Option<HttpResponse> {
        let value = match timeout_at(cx.deadline(), backend.get(key)).await {
            Ok(Ok(value)) => value?,
            Ok(Err(e)) => {
                tracing::warn!(key, error = %e, "Cache lookup failed, treating as miss");
                return None;
            }
            Err(_) => return None,
        };
        let response = serde_json::from_str::<CacheEntry>(&value)
            .ok()
            .and_then(CacheEntry::into_response);
        if response.is_none() {
            tracing::warn!(key, "Corrupt cache entry, treating as miss");
        }
        response
    }

    async fn store(
        &self,
        backend: &dyn CacheBackend,
        key: &str,
        entry: &CacheEntry,
        ttl: Duration,
        cx: &CallContext,
    ) {
        let value = match serde_json::to_string(entry) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key, error = %e, "Failed to encode cache entry");
                return;
            }
        };
        match timeout_at(cx.deadline(), backend.set(key, value, ttl)).await {
            Ok(Ok(())) => tracing::trace!(key, ?ttl, "Cached response"),
            Ok(Err(e)) => tracing::warn!(key, error = %e, "Cache store failed"),
            Err(_) => tracing::debug!(key, "Cache store abandoned at deadline"),
        }
    }
}

#[async_trait]
impl Transport for CacheTransport {
    async fn send(
        &self,
        mut req: HttpRequest,
        cx: &CallContext,
    ) -> Result<HttpResponse, TransportError> {
        let skip = req
            .headers
            .remove(&self.config.skip_header)
            .is_some_and(|value| value.as_bytes().eq_ignore_ascii_case(b"true"));

        let policy = cx.policy();
        if !policy.cache_enabled || skip || !self.config.methods.contains(&req.method) {
            return self.next.send(req, cx).await;
        }
        let Some(backend) = self.config.backend.as_deref() else {
            tracing::warn!(
                method = %req.method,
                path = req.path(),
                "Caching enabled for endpoint but no cache backend configured"
            );
            return self.next.send(req, cx).await;
        };

        let key = self.config.key(&req);
        if let Some(hit) = self.lookup(backend, &key, cx).await {
            tracing::debug!(key, "Cache hit");
            return Ok(hit);
        }

        let mut response = self.next.send(req, cx).await?;
        if self.config.status_codes.contains(&response.status) {
            let body = response.body.materialize().await?;
            let entry = CacheEntry::from_response(&response, &body);
            let ttl = policy.cache_ttl.unwrap_or(self.config.default_ttl);
            self.store(backend, &key, &entry, ttl, cx).await;
        }
        Ok(response)
    }
}
