//! Response size bounding.

use std::sync::Arc;

use async_trait::async_trait;

use crate::transport::{
    CallContext, HttpRequest, HttpResponse, Interceptor, SharedTransport, Transport,
    TransportError,
};

/// Bounds how many response bytes any later read may buffer.
///
/// The policy's `max_response_size` wins over the decorator's own limit.
/// Reading a body past the limit fails with a body error instead of
/// growing memory.
#[derive(Debug, Clone, Copy, Default)]
pub struct MaxResponseSize {
    limit: Option<u64>,
}

impl MaxResponseSize {
    /// Uses only the policy's limit.
    #[must_use]
    pub const fn new() -> Self {
        Self { limit: None }
    }

    /// Uses `limit` unless the policy sets its own. Zero disables the bound.
    #[must_use]
    pub const fn with_limit(limit: u64) -> Self {
        Self { limit: Some(limit) }
    }
}

impl Interceptor for MaxResponseSize {
    fn wrap(&self, next: SharedTransport) -> SharedTransport {
        Arc::new(MaxSizeTransport {
            next,
            limit: self.limit,
        })
    }
}

struct MaxSizeTransport {
    next: SharedTransport,
    limit: Option<u64>,
}

#[async_trait]
impl Transport for MaxSizeTransport {
    async fn send(
        &self,
        req: HttpRequest,
        cx: &CallContext,
    ) -> Result<HttpResponse, TransportError> {
        let mut response = self.next.send(req, cx).await?;
        let limit = cx.policy().max_response_size.or(self.limit);
        if let Some(limit) = limit.filter(|limit| *limit > 0) {
            response.body = std::mem::take(&mut response.body).limited(limit);
        }
        Ok(response)
    }
}
