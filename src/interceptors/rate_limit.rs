//! Rate limiting against the policy's shared limiter.

use std::sync::Arc;

use async_trait::async_trait;

use crate::transport::{
    CallContext, HttpRequest, HttpResponse, Interceptor, SharedTransport, Transport,
    TransportError,
};

/// Waits for the resolved policy's rate limiter before sending.
///
/// The wait is bounded by the call deadline. When no token can be granted
/// in time the attempt fails without reaching the wire.
#[derive(Debug, Clone, Copy, Default)]
pub struct RateLimit;

impl RateLimit {
    /// Creates the decorator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Interceptor for RateLimit {
    fn wrap(&self, next: SharedTransport) -> SharedTransport {
        Arc::new(RateLimitTransport { next })
    }
}

struct RateLimitTransport {
    next: SharedTransport,
}

#[async_trait]
impl Transport for RateLimitTransport {
    async fn send(
        &self,
        req: HttpRequest,
        cx: &CallContext,
    ) -> Result<HttpResponse, TransportError> {
        if let Some(limiter) = &cx.policy().rate_limiter {
            if let Err(e) = limiter.wait(cx.deadline()).await {
                tracing::debug!(method = %req.method, path = req.path(), "Rate limiter wait failed: {e}");
                return Err(e.into());
            }
        }
        self.next.send(req, cx).await
    }
}
