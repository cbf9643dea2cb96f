//! Partial policy settings and the resolved per-call policy.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use http::HeaderMap;

use super::retry::{Backoff, RetryPredicate, default_retry_predicate};
use super::RequestInfo;
use crate::client::CallError;
use crate::resilience::{CircuitBreaker, PassThroughBreaker, RateLimiter};
use crate::transport::{BoxError, HttpRequest, HttpResponse};

/// Produces a bearer token for a call.
pub type AuthTokenFn = Arc<dyn Fn(&RequestInfo) -> Result<String, BoxError> + Send + Sync>;

/// Replaces a failed call's outcome.
///
/// Receives the original request and the classified error. Whatever error
/// it returns is normalized into a [`CallError`] by the client.
pub type FallbackFn =
    Arc<dyn Fn(&HttpRequest, &CallError) -> Result<HttpResponse, BoxError> + Send + Sync>;

/// Default per-call timeout when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default number of retries after the first attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Policy settings where every field may be left unset.
///
/// Used both for the client-wide defaults and for endpoint overrides.
/// Merging layers an override over the defaults field by field; whatever
/// is still unset afterwards gets a structural default on resolution.
///
/// # Example
///
/// ```
/// use resilient_http::policy::PolicySettings;
/// use std::time::Duration;
///
/// let defaults = PolicySettings::new().with_timeout(Duration::from_secs(15));
/// let public = PolicySettings::new().with_max_retries(1).with_require_auth(false);
///
/// let policy = public.merge_over(&defaults).resolve();
/// assert_eq!(policy.timeout, Duration::from_secs(15));
/// assert_eq!(policy.max_retries, 1);
/// ```
#[derive(Clone, Default)]
pub struct PolicySettings {
    /// Per-call timeout (all attempts together)
    pub timeout: Option<Duration>,
    /// Retries after the first attempt
    pub max_retries: Option<u32>,
    /// Retry decision for each attempt outcome
    pub retry_predicate: Option<RetryPredicate>,
    /// Delay between attempts
    pub backoff: Option<Backoff>,
    /// Static headers; merged key by key
    pub headers: HeaderMap,
    /// Whether the inbound credential is propagated
    pub require_auth: Option<bool>,
    /// Shared rate limiter
    pub rate_limiter: Option<Arc<dyn RateLimiter>>,
    /// Shared circuit breaker
    pub breaker: Option<Arc<dyn CircuitBreaker>>,
    /// Bearer token provider
    pub auth_token: Option<AuthTokenFn>,
    /// Whether responses may be served from and stored in the cache
    pub cache_enabled: Option<bool>,
    /// Cache entry lifetime
    pub cache_ttl: Option<Duration>,
    /// Fallback for failed calls
    pub fallback: Option<FallbackFn>,
    /// Upper bound on buffered response bytes
    pub max_response_size: Option<u64>,
    /// Free-form labels; merged key by key
    pub tags: BTreeMap<String, String>,
}

impl PolicySettings {
    /// Creates empty settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the per-call timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the number of retries after the first attempt.
    #[must_use]
    pub const fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    /// Sets the retry predicate.
    #[must_use]
    pub fn with_retry_predicate(
        mut self,
        predicate: impl Fn(&super::AttemptOutcome) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.retry_predicate = Some(Arc::new(predicate));
        self
    }

    /// Sets the backoff strategy.
    #[must_use]
    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = Some(backoff);
        self
    }

    /// Adds a static header.
    #[must_use]
    pub fn with_header(mut self, name: http::HeaderName, value: http::HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Sets whether the endpoint requires authentication.
    #[must_use]
    pub const fn with_require_auth(mut self, require_auth: bool) -> Self {
        self.require_auth = Some(require_auth);
        self
    }

    /// Attaches a shared rate limiter.
    #[must_use]
    pub fn with_rate_limiter(mut self, limiter: Arc<dyn RateLimiter>) -> Self {
        self.rate_limiter = Some(limiter);
        self
    }

    /// Attaches a shared circuit breaker.
    #[must_use]
    pub fn with_breaker(mut self, breaker: Arc<dyn CircuitBreaker>) -> Self {
        self.breaker = Some(breaker);
        self
    }

    /// Sets the bearer token provider.
    #[must_use]
    pub fn with_auth_token(
        mut self,
        f: impl Fn(&RequestInfo) -> Result<String, BoxError> + Send + Sync + 'static,
    ) -> Self {
        self.auth_token = Some(Arc::new(f));
        self
    }

    /// Enables caching with the given TTL.
    #[must_use]
    pub const fn with_cache(mut self, ttl: Duration) -> Self {
        self.cache_enabled = Some(true);
        self.cache_ttl = Some(ttl);
        self
    }

    /// Sets whether caching is enabled without touching the TTL.
    #[must_use]
    pub const fn with_cache_enabled(mut self, enabled: bool) -> Self {
        self.cache_enabled = Some(enabled);
        self
    }

    /// Sets the fallback function.
    #[must_use]
    pub fn with_fallback(
        mut self,
        f: impl Fn(&HttpRequest, &CallError) -> Result<HttpResponse, BoxError> + Send + Sync + 'static,
    ) -> Self {
        self.fallback = Some(Arc::new(f));
        self
    }

    /// Sets the maximum response size in bytes.
    #[must_use]
    pub const fn with_max_response_size(mut self, max: u64) -> Self {
        self.max_response_size = Some(max);
        self
    }

    /// Adds a custom tag.
    #[must_use]
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Returns true if nothing is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.timeout.is_none()
            && self.max_retries.is_none()
            && self.retry_predicate.is_none()
            && self.backoff.is_none()
            && self.headers.is_empty()
            && self.require_auth.is_none()
            && self.rate_limiter.is_none()
            && self.breaker.is_none()
            && self.auth_token.is_none()
            && self.cache_enabled.is_none()
            && self.cache_ttl.is_none()
            && self.fallback.is_none()
            && self.max_response_size.is_none()
            && self.tags.is_empty()
    }

    /// Layers `self` over `base`: set fields win, unset fields fall back.
    ///
    /// Headers and tags are merged per key with `self` taking precedence.
    #[must_use]
    pub fn merge_over(self, base: &Self) -> Self {
        let mut headers = base.headers.clone();
        for (name, value) in &self.headers {
            headers.insert(name.clone(), value.clone());
        }
        let mut tags = base.tags.clone();
        tags.extend(self.tags);

        Self {
            timeout: self.timeout.or(base.timeout),
            max_retries: self.max_retries.or(base.max_retries),
            retry_predicate: self.retry_predicate.or_else(|| base.retry_predicate.clone()),
            backoff: self.backoff.or_else(|| base.backoff.clone()),
            headers,
            require_auth: self.require_auth.or(base.require_auth),
            rate_limiter: self.rate_limiter.or_else(|| base.rate_limiter.clone()),
            breaker: self.breaker.or_else(|| base.breaker.clone()),
            auth_token: self.auth_token.or_else(|| base.auth_token.clone()),
            cache_enabled: self.cache_enabled.or(base.cache_enabled),
            cache_ttl: self.cache_ttl.or(base.cache_ttl),
            fallback: self.fallback.or_else(|| base.fallback.clone()),
            max_response_size: self.max_response_size.or(base.max_response_size),
            tags,
        }
    }

    /// Applies structural defaults to every unset field.
    ///
    /// Never fails: a missing breaker becomes a pass-through breaker that
    /// never opens, a missing timeout becomes [`DEFAULT_TIMEOUT`], and so on.
    #[must_use]
    pub fn resolve(self) -> EndpointPolicy {
        EndpointPolicy {
            timeout: self.timeout.unwrap_or(DEFAULT_TIMEOUT),
            max_retries: self.max_retries.unwrap_or(DEFAULT_MAX_RETRIES),
            retry_predicate: self.retry_predicate.unwrap_or_else(default_retry_predicate),
            backoff: self.backoff.unwrap_or_default(),
            headers: self.headers,
            require_auth: self.require_auth.unwrap_or(false),
            rate_limiter: self.rate_limiter,
            breaker: self
                .breaker
                .unwrap_or_else(|| Arc::new(PassThroughBreaker::new())),
            auth_token: self.auth_token,
            cache_enabled: self.cache_enabled.unwrap_or(false),
            cache_ttl: self.cache_ttl,
            fallback: self.fallback,
            max_response_size: self.max_response_size,
            tags: self.tags,
        }
    }
}

impl fmt::Debug for PolicySettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PolicySettings")
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .field("backoff", &self.backoff)
            .field("headers", &self.headers)
            .field("require_auth", &self.require_auth)
            .field("rate_limiter", &self.rate_limiter.is_some())
            .field("breaker", &self.breaker.as_ref().map(|b| b.name().to_string()))
            .field("cache_enabled", &self.cache_enabled)
            .field("cache_ttl", &self.cache_ttl)
            .field("fallback", &self.fallback.is_some())
            .field("max_response_size", &self.max_response_size)
            .field("tags", &self.tags)
            .finish_non_exhaustive()
    }
}

/// The effective settings governing every attempt of one logical call.
///
/// Built fresh per call by [`PolicySettings::resolve`] and never mutated
/// afterwards. Rate limiters and breakers are shared references owned by
/// whoever configured them.
#[derive(Clone)]
pub struct EndpointPolicy {
    /// Per-call timeout
    pub timeout: Duration,
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Retry decision for each attempt outcome
    pub retry_predicate: RetryPredicate,
    /// Delay between attempts
    pub backoff: Backoff,
    /// Static headers applied where the request has none
    pub headers: HeaderMap,
    /// Whether the inbound credential is propagated
    pub require_auth: bool,
    /// Shared rate limiter, if any
    pub rate_limiter: Option<Arc<dyn RateLimiter>>,
    /// Circuit breaker gating each attempt
    pub breaker: Arc<dyn CircuitBreaker>,
    /// Bearer token provider
    pub auth_token: Option<AuthTokenFn>,
    /// Whether caching is enabled
    pub cache_enabled: bool,
    /// Cache entry lifetime; the cache decorator's default applies when unset
    pub cache_ttl: Option<Duration>,
    /// Fallback for failed calls
    pub fallback: Option<FallbackFn>,
    /// Upper bound on buffered response bytes
    pub max_response_size: Option<u64>,
    /// Free-form labels
    pub tags: BTreeMap<String, String>,
}

impl EndpointPolicy {
    /// Returns true if the outcome should be retried under this policy.
    #[must_use]
    pub fn should_retry(&self, outcome: &super::AttemptOutcome) -> bool {
        (self.retry_predicate)(outcome)
    }
}

impl Default for EndpointPolicy {
    fn default() -> Self {
        PolicySettings::default().resolve()
    }
}

impl fmt::Debug for EndpointPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointPolicy")
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .field("backoff", &self.backoff)
            .field("headers", &self.headers)
            .field("require_auth", &self.require_auth)
            .field("rate_limiter", &self.rate_limiter.is_some())
            .field("breaker", &self.breaker.name())
            .field("cache_enabled", &self.cache_enabled)
            .field("cache_ttl", &self.cache_ttl)
            .field("fallback", &self.fallback.is_some())
            .field("max_response_size", &self.max_response_size)
            .field("tags", &self.tags)
            .finish_non_exhaustive()
    }
}
