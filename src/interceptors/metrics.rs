//! Request metrics recording.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::metrics::{ClientMetrics, ErrorLabels, MetricsConfig, MetricsRegistry, RequestLabels};
use crate::transport::{
    CallContext, HttpRequest, HttpResponse, Interceptor, SharedTransport, Transport,
    TransportError,
};

/// Records duration, count and errors for every attempt.
///
/// Series are labeled by method, host, path and status (or error kind).
/// Construction registers the family with a [`MetricsRegistry`];
/// building several decorators for the same namespace and subsystem
/// reuses one family.
#[derive(Debug, Clone)]
pub struct Metrics {
    metrics: Arc<ClientMetrics>,
}

impl Metrics {
    /// Registers `config` with the process-wide registry.
    #[must_use]
    pub fn new(config: MetricsConfig) -> Self {
        Self::with_registry(MetricsRegistry::global(), config)
    }

    /// Registers `config` with the given registry.
    #[must_use]
    pub fn with_registry(registry: &MetricsRegistry, config: MetricsConfig) -> Self {
        Self {
            metrics: registry.register(config),
        }
    }

    /// Returns the metric family this decorator records into.
    #[must_use]
    pub fn metrics(&self) -> Arc<ClientMetrics> {
        Arc::clone(&self.metrics)
    }
}

impl Interceptor for Metrics {
    fn wrap(&self, next: SharedTransport) -> SharedTransport {
        Arc::new(MetricsTransport {
            next,
            metrics: Arc::clone(&self.metrics),
        })
    }
}

struct MetricsTransport {
    next: SharedTransport,
    metrics: Arc<ClientMetrics>,
}

#[async_trait]
impl Transport for MetricsTransport {
    async fn send(
        &self,
        req: HttpRequest,
        cx: &CallContext,
    ) -> Result<HttpResponse, TransportError> {
        let start = Instant::now();
        let method = req.method.to_string();
        let host = req.url.host_str().unwrap_or_default().to_string();
        let path = req.path().to_string();

        let result = self.next.send(req, cx).await;
        match &result {
            Ok(response) => self.metrics.observe_request(
                RequestLabels {
                    method,
                    host,
                    path,
                    status: response.status.as_u16().to_string(),
                },
                start.elapsed(),
            ),
            Err(e) => self.metrics.observe_error(ErrorLabels {
                method,
                host,
                path,
                error: e.kind().to_string(),
            }),
        }
        result
    }
}
