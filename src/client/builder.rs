//! Client construction.

use std::fmt;
use std::sync::Arc;

use http::Method;

use super::{BuildError, Client, Hooks};
use crate::interceptors::{
    AppToken, AuthPropagation, CacheConfig, CircuitBreaking, ForwardedFor, MaxResponseSize,
    Metrics, RateLimit, RequestId, ResponseCache, Tracing,
};
use crate::metrics::MetricsConfig;
use crate::policy::{EndpointFn, PolicyResolver, PolicySettings};
use crate::transport::{Chain, Interceptor, ReqwestTransport, SharedTransport};

/// Builds a [`Client`] from ordered options.
///
/// Interceptors run in registration order: the first one registered is
/// outermost, the last one sits closest to the wire.
///
/// # Example
///
/// ```no_run
/// use resilient_http::client::ClientBuilder;
/// use resilient_http::policy::PolicySettings;
/// use std::time::Duration;
///
/// let client = ClientBuilder::new()
///     .base_url("https://api.example.com")
///     .default_policy(PolicySettings::new().with_timeout(Duration::from_secs(5)))
///     .build()
///     .unwrap();
/// ```
#[derive(Default)]
pub struct ClientBuilder {
    base_url: Option<String>,
    defaults: PolicySettings,
    endpoints: Option<EndpointFn>,
    chain: Chain,
    hooks: Hooks,
    transport: Option<SharedTransport>,
}

impl ClientBuilder {
    /// Creates a builder with default policy, no interceptors and the
    /// reqwest transport.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the base URL that call paths are appended to.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the client-wide default policy settings.
    #[must_use]
    pub fn default_policy(mut self, settings: PolicySettings) -> Self {
        self.defaults = settings;
        self
    }

    /// Sets the per-endpoint override function.
    #[must_use]
    pub fn endpoint_policy(
        mut self,
        f: impl Fn(&Method, &str) -> Option<PolicySettings> + Send + Sync + 'static,
    ) -> Self {
        self.endpoints = Some(Arc::new(f));
        self
    }

    /// Appends an interceptor.
    #[must_use]
    pub fn interceptor(mut self, interceptor: impl Interceptor + 'static) -> Self {
        self.chain.push(Arc::new(interceptor));
        self
    }

    /// Appends every interceptor of `chain`, keeping its order.
    #[must_use]
    pub fn interceptors(mut self, chain: Chain) -> Self {
        self.chain.extend(chain);
        self
    }

    /// Sets the call-level hooks.
    #[must_use]
    pub fn hooks(mut self, hooks: Hooks) -> Self {
        self.hooks = hooks;
        self
    }

    /// Replaces the base transport.
    #[must_use]
    pub fn transport(mut self, transport: SharedTransport) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Builds the client.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::InvalidBaseUrl`] when the base URL does not parse.
    pub fn build(self) -> Result<Client, BuildError> {
        let base_url = self
            .base_url
            .map(|url| {
                url::Url::parse(&url)
                    .map(|_| url.trim_end_matches('/').to_string())
                    .map_err(|source| BuildError::InvalidBaseUrl { url, source })
            })
            .transpose()?;

        let base: SharedTransport = self
            .transport
            .unwrap_or_else(|| Arc::new(ReqwestTransport::new()));
        tracing::debug!(
            interceptors = self.chain.len(),
            base_url = base_url.as_deref().unwrap_or(""),
            "Building HTTP client"
        );
        let transport = self.chain.build(Arc::clone(&base));

        let mut resolver = PolicyResolver::new(self.defaults);
        if let Some(endpoints) = self.endpoints {
            resolver = resolver.with_endpoints(endpoints);
        }

        Ok(Client {
            base_url,
            resolver,
            transport,
            base,
            hooks: self.hooks,
        })
    }
}

impl fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("base_url", &self.base_url)
            .field("defaults", &self.defaults)
            .field("endpoints", &self.endpoints.is_some())
            .field("chain", &self.chain)
            .field("hooks", &self.hooks)
            .field("transport", &self.transport.is_some())
            .finish()
    }
}

/// The standard decorator stack, outermost first.
///
/// Tracing, metrics, caching, size bounding, circuit breaking, rate
/// limiting, forwarded-for, app token, auth propagation, request id.
#[must_use]
pub fn standard_chain(cache: CacheConfig, metrics: MetricsConfig) -> Chain {
    Chain::new()
        .with(Tracing::new())
        .with(Metrics::new(metrics))
        .with(ResponseCache::new(cache))
        .with(MaxResponseSize::new())
        .with(CircuitBreaking::new())
        .with(RateLimit::new())
        .with(ForwardedFor::new())
        .with(AppToken::from_env())
        .with(AuthPropagation::new())
        .with(RequestId::new())
}
