//! Client spans and W3C trace-context propagation.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use http::HeaderName;
use opentelemetry::KeyValue;
use opentelemetry::global::{self, BoxedTracer};
use opentelemetry::propagation::TextMapPropagator;
use opentelemetry::trace::{SpanKind, Status, TraceContextExt, Tracer};
use opentelemetry_http::{HeaderExtractor, HeaderInjector};
use opentelemetry_sdk::propagation::TraceContextPropagator;
use tracing::Instrument;
use tracing::field::Empty;

use crate::transport::{
    CallContext, HttpRequest, HttpResponse, Interceptor, SharedTransport, Transport,
    TransportError,
};

/// W3C trace-context header.
pub const TRACEPARENT_HEADER: HeaderName = HeaderName::from_static("traceparent");

/// Instrumentation scope of the client spans.
pub const TRACER_NAME: &str = "resilient-http";

type SpanNameFn = Arc<dyn Fn(&HttpRequest) -> String + Send + Sync>;

/// Opens one client span per attempt and propagates trace context.
///
/// Each attempt starts an OpenTelemetry client span from the globally
/// installed tracer provider and injects its context as `traceparent`.
/// A `traceparent` already on the request becomes the parent, so the
/// caller's trace continues with a fresh span id. A matching `tracing`
/// span carries the same ids along with method, URL, content lengths and
/// status for the logs. Both are marked as errored on transport failure
/// or status >= 400.
///
/// Without an installed provider the spans are no-ops: an inbound trace
/// context is forwarded unchanged and no new trace is started.
#[derive(Clone)]
pub struct Tracing {
    span_name: SpanNameFn,
}

impl Tracing {
    /// Creates the decorator with span names like `HTTP GET`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            span_name: Arc::new(|req: &HttpRequest| format!("HTTP {}", req.method)),
        }
    }

    /// Sets a custom span-name formatter.
    #[must_use]
    pub fn with_span_name(
        mut self,
        f: impl Fn(&HttpRequest) -> String + Send + Sync + 'static,
    ) -> Self {
        self.span_name = Arc::new(f);
        self
    }
}

impl Default for Tracing {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Tracing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tracing").finish_non_exhaustive()
    }
}

impl Interceptor for Tracing {
    fn wrap(&self, next: SharedTransport) -> SharedTransport {
        Arc::new(TracingTransport {
            next,
            span_name: Arc::clone(&self.span_name),
            tracer: global::tracer(TRACER_NAME),
            propagator: TraceContextPropagator::new(),
        })
    }
}

struct TracingTransport {
    next: SharedTransport,
    span_name: SpanNameFn,
    tracer: BoxedTracer,
    propagator: TraceContextPropagator,
}

fn size_attribute(key: &'static str, len: impl TryInto<i64>) -> KeyValue {
    KeyValue::new(key, len.try_into().unwrap_or(i64::MAX))
}

#[async_trait]
impl Transport for TracingTransport {
    async fn send(
        &self,
        mut req: HttpRequest,
        cx: &CallContext,
    ) -> Result<HttpResponse, TransportError> {
        let parent = self.propagator.extract(&HeaderExtractor(&req.headers));
        let name = (self.span_name)(&req);
        let client_span = self
            .tracer
            .span_builder(name.clone())
            .with_kind(SpanKind::Client)
            .with_attributes([
                KeyValue::new("http.request.method", req.method.to_string()),
                KeyValue::new("url.full", req.url.to_string()),
                KeyValue::new("url.path", req.url.path().to_string()),
                KeyValue::new("url.scheme", req.url.scheme().to_string()),
                KeyValue::new("server.address", req.url.host_str().unwrap_or_default().to_string()),
            ])
            .start_with_context(&self.tracer, &parent);
        let otel_cx = parent.with_span(client_span);
        let span_context = otel_cx.span().span_context().clone();

        let span = tracing::info_span!(
            "http.client",
            otel.name = %name,
            otel.kind = "client",
            otel.status_code = Empty,
            trace_id = %span_context.trace_id(),
            span_id = %span_context.span_id(),
            attempt = cx.attempt(),
            http.method = %req.method,
            http.url = %req.url,
            http.target = req.url.path(),
            http.scheme = req.url.scheme(),
            http.host = req.url.host_str().unwrap_or_default(),
            http.request_content_length = Empty,
            http.status_code = Empty,
            http.response_content_length = Empty,
        );
        if let Some(len) = req.content_length().filter(|len| *len > 0) {
            span.record("http.request_content_length", len);
            otel_cx
                .span()
                .set_attribute(size_attribute("http.request.body.size", len));
        }
        self.propagator
            .inject_context(&otel_cx, &mut HeaderInjector(&mut req.headers));

        let result = self.next.send(req, cx).instrument(span.clone()).await;

        let client_span = otel_cx.span();
        match &result {
            Ok(response) => {
                let status = response.status.as_u16();
                span.record("http.status_code", status);
                client_span.set_attribute(KeyValue::new(
                    "http.response.status_code",
                    i64::from(status),
                ));
                if let Some(len) = response.content_length().filter(|len| *len > 0) {
                    span.record("http.response_content_length", len);
                    client_span.set_attribute(size_attribute("http.response.body.size", len));
                }
                if status >= 400 {
                    span.record("otel.status_code", "ERROR");
                    client_span.set_status(Status::error(response.status.to_string()));
                } else {
                    span.record("otel.status_code", "OK");
                    client_span.set_status(Status::Ok);
                }
            }
            Err(e) => {
                span.record("otel.status_code", "ERROR");
                client_span.set_status(Status::error(e.to_string()));
                span.in_scope(|| tracing::warn!(error = %e, "HTTP attempt failed"));
            }
        }
        client_span.end();
        result
    }
}
