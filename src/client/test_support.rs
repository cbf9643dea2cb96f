//! Shared fixtures for client tests.

use crate::transport::{
    Body, CallContext, HttpRequest, HttpResponse, SharedTransport, Transport, TransportError,
};
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream;
use http::{HeaderMap, StatusCode};
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

type Responder = Box<dyn Fn(u32) -> Result<HttpResponse, TransportError> + Send + Sync>;

/// What the base transport saw for one attempt.
#[derive(Debug, Clone)]
pub struct Seen {
    pub request: HttpRequest,
    pub deadline: Instant,
    pub attempt: u32,
}

/// Base transport that records attempts and answers from a script.
pub struct Wire {
    seen: Mutex<Vec<Seen>>,
    calls: AtomicU32,
    closes: AtomicU32,
    delay: Option<Duration>,
    respond: Responder,
}

impl Wire {
    pub fn new(
        respond: impl Fn(u32) -> Result<HttpResponse, TransportError> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Self::build(None, respond)
    }

    /// Like [`Wire::new`], but every attempt first sleeps for `delay`.
    pub fn slow(
        delay: Duration,
        respond: impl Fn(u32) -> Result<HttpResponse, TransportError> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Self::build(Some(delay), respond)
    }

    fn build(
        delay: Option<Duration>,
        respond: impl Fn(u32) -> Result<HttpResponse, TransportError> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            seen: Mutex::new(Vec::new()),
            calls: AtomicU32::new(0),
            closes: AtomicU32::new(0),
            delay,
            respond: Box::new(respond),
        })
    }

    pub fn status(status: StatusCode) -> Arc<Self> {
        Self::new(move |_| Ok(HttpResponse::with_status(status)))
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> u32 {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn seen(&self) -> Vec<Seen> {
        self.seen.lock().unwrap().clone()
    }

    pub fn last(&self) -> HttpRequest {
        self.seen().pop().expect("no attempt reached the wire").request
    }

    pub fn shared(self: &Arc<Self>) -> SharedTransport {
        Arc::clone(self) as SharedTransport
    }
}

#[async_trait]
impl Transport for Wire {
    async fn send(
        &self,
        req: HttpRequest,
        cx: &CallContext,
    ) -> Result<HttpResponse, TransportError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(Seen {
            request: req,
            deadline: cx.deadline(),
            attempt: cx.attempt(),
        });
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        (self.respond)(call)
    }

    fn close_idle_connections(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

/// Increments a counter when dropped.
struct DropGuard(Arc<AtomicUsize>);

impl Drop for DropGuard {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// A one-chunk streaming body that counts its release in `drops`.
pub fn tracked_body(drops: &Arc<AtomicUsize>, content: &'static str) -> Body {
    let guard = DropGuard(Arc::clone(drops));
    Body::from_stream(stream::unfold(
        (Some(Bytes::from_static(content.as_bytes())), guard),
        |(chunk, guard)| async move {
            chunk.map(|chunk| (Ok::<_, std::io::Error>(chunk), (None, guard)))
        },
    ))
}

/// A response with a tracked streaming body.
pub fn tracked_response(
    drops: &Arc<AtomicUsize>,
    status: StatusCode,
    content: &'static str,
) -> HttpResponse {
    HttpResponse::new(status, HeaderMap::new(), tracked_body(drops, content))
}
