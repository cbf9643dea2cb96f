//! Circuit breaking against the policy's breaker.

use std::sync::Arc;

use async_trait::async_trait;

use crate::resilience::{BreakerError, GuardedCall, GuardedFailure};
use crate::transport::{
    CallContext, HttpRequest, HttpResponse, Interceptor, SharedTransport, Transport,
    TransportError,
};

/// Runs each attempt through the resolved policy's circuit breaker.
///
/// Server-error responses (5xx) are reported to the breaker as failures
/// even though the inner transport returned no error, then handed back to
/// the caller unchanged. An open breaker fails the attempt without
/// reaching the wire.
#[derive(Debug, Clone, Copy, Default)]
pub struct CircuitBreaking;

impl CircuitBreaking {
    /// Creates the decorator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Interceptor for CircuitBreaking {
    fn wrap(&self, next: SharedTransport) -> SharedTransport {
        Arc::new(BreakerTransport { next })
    }
}

struct BreakerTransport {
    next: SharedTransport,
}

#[async_trait]
impl Transport for BreakerTransport {
    async fn send(
        &self,
        req: HttpRequest,
        cx: &CallContext,
    ) -> Result<HttpResponse, TransportError> {
        let breaker = &cx.policy().breaker;
        let next = &self.next;

        let call: GuardedCall<'_> = Box::pin(async move {
            match next.send(req, cx).await {
                Ok(response) if response.is_server_error() => {
                    Err(GuardedFailure::Status(response))
                }
                Ok(response) => Ok(response),
                Err(e) => Err(GuardedFailure::Transport(e)),
            }
        });

        match breaker.execute(call).await {
            Ok(response) | Err(BreakerError::Failed(GuardedFailure::Status(response))) => {
                Ok(response)
            }
            Err(BreakerError::Failed(GuardedFailure::Transport(e))) => Err(e),
            Err(BreakerError::Open) => Err(TransportError::CircuitOpen {
                name: breaker.name().to_string(),
            }),
        }
    }
}
