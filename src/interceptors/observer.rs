//! Per-attempt observation callbacks.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::transport::{
    CallContext, HttpRequest, HttpResponse, Interceptor, SharedTransport, Transport,
    TransportError,
};

type BeforeFn = Arc<dyn Fn(&HttpRequest, u32) + Send + Sync>;
type AfterFn = Arc<dyn Fn(&HttpRequest, &HttpResponse, u32) + Send + Sync>;
type ErrorFn = Arc<dyn Fn(&HttpRequest, &TransportError, u32) + Send + Sync>;

/// Invokes callbacks around every attempt, with the attempt number.
///
/// Unlike the client's call-level hooks, these fire once per attempt
/// and see the request exactly as it leaves this point of the chain.
#[derive(Clone, Default)]
pub struct AttemptObserver {
    before: Option<BeforeFn>,
    after: Option<AfterFn>,
    on_error: Option<ErrorFn>,
}

impl AttemptObserver {
    /// Creates an observer with no callbacks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Called before each attempt is sent.
    #[must_use]
    pub fn before(mut self, f: impl Fn(&HttpRequest, u32) + Send + Sync + 'static) -> Self {
        self.before = Some(Arc::new(f));
        self
    }

    /// Called after each attempt that produced a response.
    #[must_use]
    pub fn after(
        mut self,
        f: impl Fn(&HttpRequest, &HttpResponse, u32) + Send + Sync + 'static,
    ) -> Self {
        self.after = Some(Arc::new(f));
        self
    }

    /// Called after each attempt that failed without a response.
    #[must_use]
    pub fn on_error(
        mut self,
        f: impl Fn(&HttpRequest, &TransportError, u32) + Send + Sync + 'static,
    ) -> Self {
        self.on_error = Some(Arc::new(f));
        self
    }
}

impl fmt::Debug for AttemptObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttemptObserver")
            .field("before", &self.before.is_some())
            .field("after", &self.after.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

impl Interceptor for AttemptObserver {
    fn wrap(&self, next: SharedTransport) -> SharedTransport {
        Arc::new(ObserverTransport {
            next,
            observer: self.clone(),
        })
    }
}

struct ObserverTransport {
    next: SharedTransport,
    observer: AttemptObserver,
}

#[async_trait]
impl Transport for ObserverTransport {
    async fn send(
        &self,
        req: HttpRequest,
        cx: &CallContext,
    ) -> Result<HttpResponse, TransportError> {
        let attempt = cx.attempt();
        if let Some(before) = &self.observer.before {
            before(&req, attempt);
        }
        let needs_copy = self.observer.after.is_some() || self.observer.on_error.is_some();
        let seen = needs_copy.then(|| req.clone());

        let result = self.next.send(req, cx).await;
        if let Some(seen) = &seen {
            match &result {
                Ok(response) => {
                    if let Some(after) = &self.observer.after {
                        after(seen, response, attempt);
                    }
                }
                Err(e) => {
                    if let Some(on_error) = &self.observer.on_error {
                        on_error(seen, e, attempt);
                    }
                }
            }
        }
        result
    }
}
