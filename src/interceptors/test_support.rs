//! Shared fixtures for decorator tests.

use crate::policy::PolicySettings;
use crate::transport::{
    CallContext, HttpRequest, HttpResponse, SharedTransport, Transport, TransportError,
};
use async_trait::async_trait;
use http::StatusCode;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

type Responder = Box<dyn Fn(u32) -> Result<HttpResponse, TransportError> + Send + Sync>;

/// Base transport that records every request and answers from a script.
pub struct Scripted {
    seen: Mutex<Vec<HttpRequest>>,
    calls: AtomicU32,
    respond: Responder,
}

impl Scripted {
    /// Answers every call with the response built by `respond(call_index)`.
    pub fn new(
        respond: impl Fn(u32) -> Result<HttpResponse, TransportError> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            seen: Mutex::new(Vec::new()),
            calls: AtomicU32::new(0),
            respond: Box::new(respond),
        })
    }

    /// Answers every call with an empty response of `status`.
    pub fn status(status: StatusCode) -> Arc<Self> {
        Self::new(move |_| Ok(HttpResponse::with_status(status)))
    }

    /// Answers every call with `status` and `body`.
    pub fn body(status: StatusCode, body: &'static str) -> Arc<Self> {
        Self::new(move |_| Ok(HttpResponse::new(status, http::HeaderMap::new(), body)))
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Returns the last request that reached this transport.
    pub fn last(&self) -> HttpRequest {
        self.seen.lock().unwrap().last().cloned().expect("no request reached the wire")
    }

    pub fn shared(self: &Arc<Self>) -> SharedTransport {
        Arc::clone(self) as SharedTransport
    }
}

#[async_trait]
impl Transport for Scripted {
    async fn send(
        &self,
        req: HttpRequest,
        _cx: &CallContext,
    ) -> Result<HttpResponse, TransportError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(req);
        (self.respond)(call)
    }
}

/// A context for `settings` with a five-second deadline.
pub fn context(settings: PolicySettings) -> CallContext {
    CallContext::new(
        Arc::new(settings.resolve()),
        Instant::now() + Duration::from_secs(5),
    )
}

pub fn get(url: &str) -> HttpRequest {
    HttpRequest::get(url::Url::parse(url).unwrap())
}
