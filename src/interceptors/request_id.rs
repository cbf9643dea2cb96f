//! Request-id propagation.

use std::sync::Arc;

use async_trait::async_trait;
use http::{HeaderName, HeaderValue};
use uuid::Uuid;

use crate::transport::{
    CallContext, HttpRequest, HttpResponse, Interceptor, SharedTransport, Transport,
    TransportError,
};

/// Header carrying the request identifier.
pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Attaches an `X-Request-ID` header when the request has none.
///
/// The generated id is stored on the call context, so every retry attempt
/// of one call carries the same id.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestId;

impl RequestId {
    /// Creates the decorator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Interceptor for RequestId {
    fn wrap(&self, next: SharedTransport) -> SharedTransport {
        Arc::new(RequestIdTransport { next })
    }
}

struct RequestIdTransport {
    next: SharedTransport,
}

#[async_trait]
impl Transport for RequestIdTransport {
    async fn send(
        &self,
        mut req: HttpRequest,
        cx: &CallContext,
    ) -> Result<HttpResponse, TransportError> {
        if !req.headers.contains_key(&REQUEST_ID_HEADER) {
            let id = cx.request_id_or_init(|| {
                HeaderValue::from_str(&Uuid::new_v4().to_string())
                    .unwrap_or_else(|_| HeaderValue::from_static("unknown"))
            });
            req.headers.insert(REQUEST_ID_HEADER, id.clone());
        }
        self.next.send(req, cx).await
    }
}
