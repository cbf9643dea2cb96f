//! Caller identity propagation via `X-Forwarded-For`.

use std::sync::Arc;

use async_trait::async_trait;
use http::{HeaderName, HeaderValue};

use crate::transport::{
    CallContext, HttpRequest, HttpResponse, Interceptor, SharedTransport, Transport,
    TransportError,
};

/// Header carrying the chain of forwarded client addresses.
pub const FORWARDED_FOR_HEADER: HeaderName = HeaderName::from_static("x-forwarded-for");

/// Appends the caller's address to `X-Forwarded-For`.
///
/// The address comes from the call context. An address already present in
/// the chain is not appended again. Calls without a known address pass
/// through untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct ForwardedFor;

impl ForwardedFor {
    /// Creates the decorator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Interceptor for ForwardedFor {
    fn wrap(&self, next: SharedTransport) -> SharedTransport {
        Arc::new(ForwardedForTransport { next })
    }
}

struct ForwardedForTransport {
    next: SharedTransport,
}

/// Returns the new header value, or `None` when nothing changes.
pub(crate) fn chain_address(existing: Option<&str>, addr: &str) -> Option<String> {
    match existing.map(str::trim).filter(|chain| !chain.is_empty()) {
        None => Some(addr.to_string()),
        Some(chain) if chain.split(',').any(|hop| hop.trim() == addr) => None,
        Some(chain) => Some(format!("{chain}, {addr}")),
    }
}

#[async_trait]
impl Transport for ForwardedForTransport {
    async fn send(
        &self,
        mut req: HttpRequest,
        cx: &CallContext,
    ) -> Result<HttpResponse, TransportError> {
        if let Some(addr) = cx.remote_addr() {
            let existing = req
                .headers
                .get(&FORWARDED_FOR_HEADER)
                .and_then(|value| value.to_str().ok());
            if let Some(value) = chain_address(existing, &addr.to_string())
                .and_then(|chain| HeaderValue::from_str(&chain).ok())
            {
                req.headers.insert(FORWARDED_FOR_HEADER, value);
            }
        }
        self.next.send(req, cx).await
    }
}
