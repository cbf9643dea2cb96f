//! Credential propagation and application tokens.

use std::sync::Arc;

use async_trait::async_trait;
use http::header::AUTHORIZATION;
use http::{HeaderName, HeaderValue};

use crate::transport::{
    CallContext, HttpRequest, HttpResponse, Interceptor, SharedTransport, Transport,
    TransportError,
};

/// Header carrying the calling application's token.
pub const APP_TOKEN_HEADER: HeaderName = HeaderName::from_static("x-auth-app-token");

/// Environment variable read by [`AppToken::from_env`].
pub const APP_TOKEN_ENV: &str = "X_AUTH_APP_TOKEN";

/// Copies the caller's inbound credential into `Authorization`.
///
/// Only engages when the resolved policy requires authentication. A call
/// without a credential is sent as-is: enforcement belongs to the server
/// being called, not to this client.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthPropagation;

impl AuthPropagation {
    /// Creates the decorator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Interceptor for AuthPropagation {
    fn wrap(&self, next: SharedTransport) -> SharedTransport {
        Arc::new(AuthTransport { next })
    }
}

struct AuthTransport {
    next: SharedTransport,
}

#[async_trait]
impl Transport for AuthTransport {
    async fn send(
        &self,
        mut req: HttpRequest,
        cx: &CallContext,
    ) -> Result<HttpResponse, TransportError> {
        if cx.policy().require_auth {
            match cx
                .credential()
                .filter(|token| !token.is_empty())
                .and_then(|token| HeaderValue::from_str(token).ok())
            {
                Some(mut value) => {
                    value.set_sensitive(true);
                    req.headers.insert(AUTHORIZATION, value);
                }
                None => tracing::debug!(
                    method = %req.method,
                    path = req.path(),
                    "Endpoint requires auth but no usable credential; sending without"
                ),
            }
        }
        self.next.send(req, cx).await
    }
}

/// Sets `X-Auth-App-Token` on every request when a token is configured.
#[derive(Debug, Clone, Default)]
pub struct AppToken {
    value: Option<HeaderValue>,
}

impl AppToken {
    /// Uses the given token; an empty or invalid token disables the decorator.
    #[must_use]
    pub fn new(token: &str) -> Self {
        let value = Some(token)
            .filter(|token| !token.is_empty())
            .and_then(|token| HeaderValue::from_str(token).ok())
            .map(|mut value| {
                value.set_sensitive(true);
                value
            });
        Self { value }
    }

    /// Reads the token from the `X_AUTH_APP_TOKEN` environment variable.
    #[must_use]
    pub fn from_env() -> Self {
        std::env::var(APP_TOKEN_ENV).map_or_else(|_| Self::default(), |token| Self::new(&token))
    }

    /// Returns true if a token will be attached.
    #[must_use]
    pub const fn is_configured(&self) -> bool {
        self.value.is_some()
    }
}

impl Interceptor for AppToken {
    fn wrap(&self, next: SharedTransport) -> SharedTransport {
        Arc::new(AppTokenTransport {
            next,
            value: self.value.clone(),
        })
    }
}

struct AppTokenTransport {
    next: SharedTransport,
    value: Option<HeaderValue>,
}

#[async_trait]
impl Transport for AppTokenTransport {
    async fn send(
        &self,
        mut req: HttpRequest,
        cx: &CallContext,
    ) -> Result<HttpResponse, TransportError> {
        if let Some(value) = &self.value {
            req.headers.insert(APP_TOKEN_HEADER, value.clone());
        }
        self.next.send(req, cx).await
    }
}
