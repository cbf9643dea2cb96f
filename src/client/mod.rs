//! The resilient HTTP client.
//!
//! A [`Client`] resolves the policy for each call, runs the attempts
//! through its interceptor chain with bounded retries, buffers the final
//! body, classifies the outcome and optionally hands failures to a
//! fallback. Call-level [`Hooks`] wrap the whole sequence.
//!
//! One client serves any number of concurrent calls; all per-call state
//! lives in the call's own [`CallContext`].

mod builder;
mod error;
mod execute;
mod hooks;

#[cfg(test)]
mod error_tests;
#[cfg(test)]
mod test_support;

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use http::{HeaderMap, Method};
use tokio::time::Instant;

use crate::policy::{PolicyResolver, RequestInfo};
use crate::transport::{
    CallContext, CallerContext, HttpRequest, HttpResponse, SharedTransport, TransportError,
};

pub use builder::{ClientBuilder, standard_chain};
pub use error::{BuildError, CallError, Cause};
pub use hooks::Hooks;

/// A client shared by every caller; immutable after construction.
pub struct Client {
    base_url: Option<String>,
    resolver: PolicyResolver,
    transport: SharedTransport,
    base: SharedTransport,
    hooks: Hooks,
}

impl Client {
    /// Starts building a client.
    #[must_use]
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Returns the base URL, without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    /// Returns the policy resolver.
    #[must_use]
    pub const fn resolver(&self) -> &PolicyResolver {
        &self.resolver
    }

    /// Executes one logical call.
    ///
    /// # Errors
    ///
    /// Returns [`CallError`] on a transport failure or a status >= 400,
    /// unless a fallback supplies a response instead.
    pub async fn execute(
        &self,
        caller: &CallerContext,
        req: HttpRequest,
    ) -> Result<HttpResponse, CallError> {
        let info = RequestInfo::new(req.method.clone(), req.path());
        self.hooks.dispatch_pre(&info);
        let result = self.run(caller, req, &info).await;
        self.dispatch_outcome(&info, &result);
        result
    }

    async fn run(
        &self,
        caller: &CallerContext,
        mut req: HttpRequest,
        info: &RequestInfo,
    ) -> Result<HttpResponse, CallError> {
        let start = Instant::now();
        let policy = Arc::new(self.resolver.resolve(&req.method, req.path()));
        let cx = CallContext::for_call(Arc::clone(&policy), caller, start);

        execute::apply_static_headers(&mut req, &policy.headers);
        execute::apply_auth_token(&mut req, &policy, info);

        let (outcome, attempts) = execute::run_attempts(&*self.transport, &req, &cx).await;
        let outcome = execute::materialize(outcome, &cx).await;

        match execute::classify(&req, outcome, attempts) {
            Ok(response) => Ok(response),
            Err(err) => match &policy.fallback {
                Some(fallback) => execute::run_fallback(fallback, &req, err).await,
                None => Err(err),
            },
        }
    }

    fn dispatch_outcome(&self, info: &RequestInfo, result: &Result<HttpResponse, CallError>) {
        match result {
            Ok(response) => {
                tracing::debug!(
                    method = %info.method,
                    path = %info.path,
                    status = response.status.as_u16(),
                    "HTTP call completed"
                );
                self.hooks.dispatch_post(info, response.status);
            }
            Err(err) => {
                tracing::debug!(
                    method = %info.method,
                    path = %info.path,
                    error = %err,
                    "HTTP call failed"
                );
                if let Some(status) = err.status() {
                    self.hooks.dispatch_post(info, status);
                }
                self.hooks.dispatch_error(info, err);
            }
        }
    }

    /// Builds and executes a request for `path` relative to the base URL.
    ///
    /// A path that does not form a valid URL fails without any attempt.
    ///
    /// # Errors
    ///
    /// See [`Client::execute`].
    pub async fn request(
        &self,
        caller: &CallerContext,
        method: Method,
        path: &str,
        body: Option<Bytes>,
        headers: Option<HeaderMap>,
    ) -> Result<HttpResponse, CallError> {
        let raw = self
            .base_url
            .as_deref()
            .map_or_else(|| path.to_string(), |base| format!("{base}{path}"));
        let url = match url::Url::parse(&raw) {
            Ok(url) => url,
            Err(e) => {
                let info = RequestInfo::new(method.clone(), path);
                self.hooks.dispatch_pre(&info);
                let result = Err(CallError::from_transport(
                    method,
                    raw,
                    0,
                    TransportError::InvalidUrl(e.to_string()),
                ));
                self.dispatch_outcome(&info, &result);
                return result;
            }
        };

        let mut req = HttpRequest::new(method, url);
        if let Some(headers) = headers {
            req.headers = headers;
        }
        req.body = body;
        self.execute(caller, req).await
    }

    /// Sends a GET request.
    ///
    /// # Errors
    ///
    /// See [`Client::execute`].
    pub async fn get(
        &self,
        caller: &CallerContext,
        path: &str,
        headers: Option<HeaderMap>,
    ) -> Result<HttpResponse, CallError> {
        self.request(caller, Method::GET, path, None, headers).await
    }

    /// Sends a POST request.
    ///
    /// # Errors
    ///
    /// See [`Client::execute`].
    pub async fn post(
        &self,
        caller: &CallerContext,
        path: &str,
        body: impl Into<Bytes>,
        headers: Option<HeaderMap>,
    ) -> Result<HttpResponse, CallError> {
        self.request(caller, Method::POST, path, Some(body.into()), headers)
            .await
    }

    /// Sends a PUT request.
    ///
    /// # Errors
    ///
    /// See [`Client::execute`].
    pub async fn put(
        &self,
        caller: &CallerContext,
        path: &str,
        body: impl Into<Bytes>,
        headers: Option<HeaderMap>,
    ) -> Result<HttpResponse, CallError> {
        self.request(caller, Method::PUT, path, Some(body.into()), headers)
            .await
    }

    /// Sends a PATCH request.
    ///
    /// # Errors
    ///
    /// See [`Client::execute`].
    pub async fn patch(
        &self,
        caller: &CallerContext,
        path: &str,
        body: impl Into<Bytes>,
        headers: Option<HeaderMap>,
    ) -> Result<HttpResponse, CallError> {
        self.request(caller, Method::PATCH, path, Some(body.into()), headers)
            .await
    }

    /// Sends a DELETE request.
    ///
    /// # Errors
    ///
    /// See [`Client::execute`].
    pub async fn delete(
        &self,
        caller: &CallerContext,
        path: &str,
        headers: Option<HeaderMap>,
    ) -> Result<HttpResponse, CallError> {
        self.request(caller, Method::DELETE, path, None, headers).await
    }

    /// Sends a HEAD request.
    ///
    /// # Errors
    ///
    /// See [`Client::execute`].
    pub async fn head(
        &self,
        caller: &CallerContext,
        path: &str,
        headers: Option<HeaderMap>,
    ) -> Result<HttpResponse, CallError> {
        self.request(caller, Method::HEAD, path, None, headers).await
    }

    /// Releases idle pooled connections of the base transport.
    ///
    /// The client stays usable; later calls open fresh connections.
    pub fn shutdown(&self) {
        tracing::debug!("Releasing idle connections");
        self.base.close_idle_connections();
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.base_url)
            .field("resolver", &self.resolver)
            .field("hooks", &self.hooks)
            .finish_non_exhaustive()
    }
}
