//! HTTP request/response types and the transport trait.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use super::{Body, CallContext, TransportError};

/// An HTTP request to be sent.
///
/// This is a value type that can be constructed and passed to any
/// [`Transport`] implementation. It uses standard `http` crate types
/// for method and headers, ensuring compatibility with the broader ecosystem.
///
/// The body is held as [`Bytes`], so cloning a request for another retry
/// attempt never copies the payload.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// HTTP method (GET, POST, PUT, DELETE, etc.)
    pub method: http::Method,
    /// Target URL
    pub url: url::Url,
    /// HTTP headers to send
    pub headers: http::HeaderMap,
    /// Optional request body
    pub body: Option<Bytes>,
}

impl HttpRequest {
    /// Creates a new HTTP request with the given method and URL.
    ///
    /// Headers are initialized to an empty map and body is `None`.
    #[must_use]
    pub fn new(method: http::Method, url: url::Url) -> Self {
        Self {
            method,
            url,
            headers: http::HeaderMap::new(),
            body: None,
        }
    }

    /// Creates a GET request to the given URL.
    #[must_use]
    pub fn get(url: url::Url) -> Self {
        Self::new(http::Method::GET, url)
    }

    /// Creates a POST request to the given URL.
    #[must_use]
    pub fn post(url: url::Url) -> Self {
        Self::new(http::Method::POST, url)
    }

    /// Sets the request body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Adds a header to the request.
    ///
    /// If the header name already exists, the value is appended
    /// (HTTP headers can have multiple values).
    #[must_use]
    pub fn with_header(mut self, name: http::HeaderName, value: http::HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Returns the URL path, which is what endpoint routing keys on.
    #[must_use]
    pub fn path(&self) -> &str {
        self.url.path()
    }

    /// Returns the length of the request body in bytes, if any.
    #[must_use]
    pub fn content_length(&self) -> Option<usize> {
        self.body.as_ref().map(Bytes::len)
    }
}

/// An HTTP response received from a server or synthesized by a decorator.
///
/// Responses returned by the client always carry a buffered body; responses
/// travelling through the chain may still be streaming.
#[derive(Debug)]
pub struct HttpResponse {
    /// HTTP status code
    pub status: http::StatusCode,
    /// Response headers
    pub headers: http::HeaderMap,
    /// Response body
    pub body: Body,
}

impl HttpResponse {
    /// Creates a new HTTP response.
    #[must_use]
    pub fn new(status: http::StatusCode, headers: http::HeaderMap, body: impl Into<Body>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    /// Creates a response with the given status, no headers and an empty body.
    #[must_use]
    pub fn with_status(status: http::StatusCode) -> Self {
        Self::new(status, http::HeaderMap::new(), Body::empty())
    }

    /// Returns true if the status code indicates success (2xx).
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Returns true if the status code is a server error (5xx).
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        self.status.is_server_error()
    }

    /// Returns the buffered body bytes, or an empty slice while still streaming.
    #[must_use]
    pub fn body_bytes(&self) -> &[u8] {
        self.body.as_bytes().map_or(&[], |bytes| bytes.as_ref())
    }

    /// Returns the body as a UTF-8 string, if buffered and valid.
    #[must_use]
    pub fn body_text(&self) -> Option<&str> {
        self.body
            .as_bytes()
            .and_then(|bytes| std::str::from_utf8(bytes).ok())
    }

    /// Returns the response length from `Content-Length`, or the buffered size.
    #[must_use]
    pub fn content_length(&self) -> Option<u64> {
        self.headers
            .get(http::header::CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse().ok())
            .or_else(|| self.body.as_bytes().map(|bytes| bytes.len() as u64))
    }
}

/// Trait for sending HTTP requests.
///
/// # Design
///
/// This trait abstracts the HTTP client implementation, enabling:
/// - Dependency injection for testing with mock transports
/// - Swapping HTTP libraries without changing calling code
/// - Adding cross-cutting concerns (caching, breaking, metrics) via decorators
///
/// Implementations must be safe to call concurrently: one client serves
/// many simultaneous calls through the same transport.
///
/// # Example
///
/// ```ignore
/// use resilient_http::transport::{CallContext, HttpRequest, HttpResponse, Transport, TransportError};
///
/// struct Fixed;
///
/// #[async_trait::async_trait]
/// impl Transport for Fixed {
///     async fn send(&self, _req: HttpRequest, _cx: &CallContext) -> Result<HttpResponse, TransportError> {
///         Ok(HttpResponse::with_status(http::StatusCode::NO_CONTENT))
///     }
/// }
/// ```
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends an HTTP request and returns the response.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when no response could be produced.
    async fn send(
        &self,
        req: HttpRequest,
        cx: &CallContext,
    ) -> Result<HttpResponse, TransportError>;

    /// Releases idle pooled connections. Transports without a pool ignore this.
    fn close_idle_connections(&self) {}
}

/// A transport shared between the client and the decorators wrapping it.
pub type SharedTransport = Arc<dyn Transport>;

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn send(
        &self,
        req: HttpRequest,
        cx: &CallContext,
    ) -> Result<HttpResponse, TransportError> {
        (**self).send(req, cx).await
    }

    fn close_idle_connections(&self) {
        (**self).close_idle_connections();
    }
}
