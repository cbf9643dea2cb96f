//! Per-call context threaded alongside every request.

use std::net::IpAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, OnceLock};

use http::HeaderValue;
use tokio::time::Instant;

use crate::policy::EndpointPolicy;

/// What the caller knows about the call it is making.
///
/// This carries the caller's own deadline, the inbound credential to
/// propagate on endpoints that require authentication, and the caller's
/// network address for forwarded-for chaining.
#[derive(Debug, Clone, Default)]
pub struct CallerContext {
    deadline: Option<Instant>,
    credential: Option<String>,
    remote_addr: Option<IpAddr>,
}

impl CallerContext {
    /// Creates an empty caller context (no deadline, no credential).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the caller's deadline.
    #[must_use]
    pub const fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Sets the caller's deadline relative to now.
    #[must_use]
    pub fn with_timeout(self, timeout: std::time::Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Sets the inbound credential (a full `Authorization` header value).
    #[must_use]
    pub fn with_credential(mut self, credential: impl Into<String>) -> Self {
        self.credential = Some(credential.into());
        self
    }

    /// Sets the caller's network address.
    #[must_use]
    pub const fn with_remote_addr(mut self, addr: IpAddr) -> Self {
        self.remote_addr = Some(addr);
        self
    }

    /// Returns the caller's deadline, if any.
    #[must_use]
    pub const fn deadline(&self) -> Option<Instant> {
        self.deadline
    }
}

/// Per-call state shared by every attempt and every decorator.
///
/// Built once per logical call after policy resolution. The effective
/// deadline is the earlier of the caller's deadline and the policy timeout.
#[derive(Debug)]
pub struct CallContext {
    policy: Arc<EndpointPolicy>,
    deadline: Instant,
    credential: Option<String>,
    remote_addr: Option<IpAddr>,
    request_id: OnceLock<HeaderValue>,
    attempt: AtomicU32,
}

impl CallContext {
    /// Creates a context with an explicit deadline.
    #[must_use]
    pub const fn new(policy: Arc<EndpointPolicy>, deadline: Instant) -> Self {
        Self {
            policy,
            deadline,
            credential: None,
            remote_addr: None,
            request_id: OnceLock::new(),
            attempt: AtomicU32::new(0),
        }
    }

    /// Creates a context whose deadline intersects the caller's deadline
    /// with the policy timeout, measured from `start`.
    #[must_use]
    pub fn for_call(policy: Arc<EndpointPolicy>, caller: &CallerContext, start: Instant) -> Self {
        let policy_deadline = start + policy.timeout;
        let deadline = caller
            .deadline
            .map_or(policy_deadline, |d| d.min(policy_deadline));
        let mut cx = Self::new(policy, deadline);
        if let Some(credential) = &caller.credential {
            cx = cx.with_credential(credential.clone());
        }
        if let Some(addr) = caller.remote_addr {
            cx = cx.with_remote_addr(addr);
        }
        cx
    }

    /// Sets the inbound credential.
    #[must_use]
    pub fn with_credential(mut self, credential: impl Into<String>) -> Self {
        self.credential = Some(credential.into());
        self
    }

    /// Sets the caller's network address.
    #[must_use]
    pub const fn with_remote_addr(mut self, addr: IpAddr) -> Self {
        self.remote_addr = Some(addr);
        self
    }

    /// The policy resolved for this call.
    #[must_use]
    pub fn policy(&self) -> &EndpointPolicy {
        &self.policy
    }

    /// The effective deadline of the whole call.
    #[must_use]
    pub const fn deadline(&self) -> Instant {
        self.deadline
    }

    /// The inbound credential supplied by the caller, if any.
    #[must_use]
    pub fn credential(&self) -> Option<&str> {
        self.credential.as_deref()
    }

    /// The caller's network address, if known.
    #[must_use]
    pub const fn remote_addr(&self) -> Option<IpAddr> {
        self.remote_addr
    }

    /// Returns the request id for this call, generating it on first use.
    ///
    /// All attempts of one call share the same id.
    pub fn request_id_or_init(&self, init: impl FnOnce() -> HeaderValue) -> &HeaderValue {
        self.request_id.get_or_init(init)
    }

    /// Zero-based index of the attempt currently in flight.
    #[must_use]
    pub fn attempt(&self) -> u32 {
        self.attempt.load(Ordering::Relaxed)
    }

    pub(crate) fn set_attempt(&self, attempt: u32) {
        self.attempt.store(attempt, Ordering::Relaxed);
    }
}
