//! Production transport implementation using reqwest.

use std::fmt;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use super::{Body, CallContext, HttpRequest, HttpResponse, Transport, TransportError};

type ClientFactory = Arc<dyn Fn() -> reqwest::Client + Send + Sync>;

/// Production transport using reqwest.
///
/// This is a thin wrapper around `reqwest::Client` that implements the
/// [`Transport`] trait. Response bodies are returned as streams so the
/// client decides when (and whether) to buffer them.
///
/// The connection pool lives inside the current `reqwest::Client`.
/// Releasing idle connections swaps in a freshly built client; in-flight
/// calls keep the old pool alive until they finish.
///
/// # Example
///
/// ```no_run
/// use resilient_http::transport::ReqwestTransport;
/// use std::time::Duration;
///
/// let transport = ReqwestTransport::with_factory(|| {
///     reqwest::Client::builder()
///         .pool_idle_timeout(Duration::from_secs(30))
///         .build()
///         .unwrap_or_default()
/// });
/// ```
pub struct ReqwestTransport {
    inner: RwLock<reqwest::Client>,
    factory: ClientFactory,
}

impl ReqwestTransport {
    /// Creates a transport with reqwest's default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_factory(reqwest::Client::new)
    }

    /// Creates a transport that builds its reqwest client with `factory`.
    ///
    /// The factory runs once now and again whenever idle connections are
    /// released, so every pool shares the same configuration.
    #[must_use]
    pub fn with_factory(factory: impl Fn() -> reqwest::Client + Send + Sync + 'static) -> Self {
        let factory: ClientFactory = Arc::new(factory);
        Self {
            inner: RwLock::new(factory()),
            factory,
        }
    }

    fn current(&self) -> reqwest::Client {
        match self.inner.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ReqwestTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReqwestTransport").finish_non_exhaustive()
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(
        &self,
        req: HttpRequest,
        cx: &CallContext,
    ) -> Result<HttpResponse, TransportError> {
        // Build the reqwest request
        let mut builder = self
            .current()
            .request(req.method, req.url.as_str())
            .headers(req.headers);

        // Add body if present
        if let Some(body) = req.body {
            builder = builder.body(body);
        }

        // Send the request, bounded by the call deadline
        let response = tokio::time::timeout_at(cx.deadline(), builder.send())
            .await
            .map_err(|_| TransportError::Timeout)?
            .map_err(|e| {
                if e.is_timeout() {
                    TransportError::Timeout
                } else if e.is_builder() {
                    TransportError::InvalidUrl(e.to_string())
                } else {
                    TransportError::connection(e)
                }
            })?;

        // Extract response parts; the body stays a stream
        let status = response.status();
        let headers = response.headers().clone();
        let body = Body::from_stream(response.bytes_stream());

        Ok(HttpResponse::new(status, headers, body))
    }

    fn close_idle_connections(&self) {
        let fresh = (self.factory)();
        match self.inner.write() {
            Ok(mut guard) => *guard = fresh,
            Err(poisoned) => *poisoned.into_inner() = fresh,
        }
        tracing::debug!("Released idle connections");
    }
}
