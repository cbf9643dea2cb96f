//! Endpoint policy resolution.

use std::fmt;
use std::sync::Arc;

use http::Method;

use super::settings::{EndpointPolicy, PolicySettings};

/// Per-endpoint override lookup: `(method, path) → settings`.
///
/// Returning `None` (or empty settings) declines, leaving the defaults.
pub type EndpointFn = Arc<dyn Fn(&Method, &str) -> Option<PolicySettings> + Send + Sync>;

/// Resolves the effective policy for a method and path.
///
/// The path excludes the query string; routing never looks at it.
#[derive(Clone, Default)]
pub struct PolicyResolver {
    defaults: PolicySettings,
    endpoints: Option<EndpointFn>,
}

impl PolicyResolver {
    /// Creates a resolver with the given defaults and no endpoint overrides.
    #[must_use]
    pub fn new(defaults: PolicySettings) -> Self {
        Self {
            defaults,
            endpoints: None,
        }
    }

    /// Sets the endpoint override function.
    #[must_use]
    pub fn with_endpoints(mut self, endpoints: EndpointFn) -> Self {
        self.endpoints = Some(endpoints);
        self
    }

    /// Returns the default settings.
    #[must_use]
    pub const fn defaults(&self) -> &PolicySettings {
        &self.defaults
    }

    /// Produces the effective policy for one call.
    ///
    /// No configuration state makes this fail: absent settings degrade to
    /// structural defaults.
    #[must_use]
    pub fn resolve(&self, method: &Method, path: &str) -> EndpointPolicy {
        let endpoint = self
            .endpoints
            .as_ref()
            .and_then(|lookup| lookup(method, path))
            .filter(|settings| !settings.is_empty());

        let settings = match endpoint {
            Some(endpoint) => {
                tracing::debug!(%method, path, "Applying endpoint policy override");
                endpoint.merge_over(&self.defaults)
            }
            None => self.defaults.clone(),
        };

        if settings.breaker.is_none() {
            tracing::trace!(%method, path, "No breaker configured, using pass-through");
        }

        settings.resolve()
    }
}

impl fmt::Debug for PolicyResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PolicyResolver")
            .field("defaults", &self.defaults)
            .field("endpoints", &self.endpoints.is_some())
            .finish()
    }
}
