//! Call-level hooks.

use std::any::Any;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use http::StatusCode;

use super::CallError;
use crate::policy::RequestInfo;

type PreFn = Arc<dyn Fn(&RequestInfo) + Send + Sync>;
type PostFn = Arc<dyn Fn(&RequestInfo, StatusCode) + Send + Sync>;
type ErrorFn = Arc<dyn Fn(&RequestInfo, &CallError) + Send + Sync>;

/// Callbacks around a whole call, independent of the interceptor chain.
///
/// - `pre_request` runs before policy resolution.
/// - `post_request` runs after completion whenever a response exists,
///   including failed calls with an error status.
/// - `on_error` runs when the call fails.
///
/// A panicking hook is caught and logged; it never fails the call.
#[derive(Clone, Default)]
pub struct Hooks {
    pre: Option<PreFn>,
    post: Option<PostFn>,
    on_error: Option<ErrorFn>,
}

impl Hooks {
    /// Creates an empty set of hooks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the pre-call hook.
    #[must_use]
    pub fn pre_request(mut self, f: impl Fn(&RequestInfo) + Send + Sync + 'static) -> Self {
        self.pre = Some(Arc::new(f));
        self
    }

    /// Sets the post-call hook.
    #[must_use]
    pub fn post_request(
        mut self,
        f: impl Fn(&RequestInfo, StatusCode) + Send + Sync + 'static,
    ) -> Self {
        self.post = Some(Arc::new(f));
        self
    }

    /// Sets the error hook.
    #[must_use]
    pub fn on_error(mut self, f: impl Fn(&RequestInfo, &CallError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(f));
        self
    }

    pub(crate) fn dispatch_pre(&self, info: &RequestInfo) {
        if let Some(pre) = &self.pre {
            guarded("pre_request", info, || pre(info));
        }
    }

    pub(crate) fn dispatch_post(&self, info: &RequestInfo, status: StatusCode) {
        if let Some(post) = &self.post {
            guarded("post_request", info, || post(info, status));
        }
    }

    pub(crate) fn dispatch_error(&self, info: &RequestInfo, err: &CallError) {
        if let Some(on_error) = &self.on_error {
            guarded("on_error", info, || on_error(info, err));
        }
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("pre_request", &self.pre.is_some())
            .field("post_request", &self.post.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

fn guarded(hook: &'static str, info: &RequestInfo, f: impl FnOnce()) {
    if let Err(panic) = catch_unwind(AssertUnwindSafe(f)) {
        tracing::error!(
            hook,
            method = %info.method,
            path = %info.path,
            panic = panic_message(panic.as_ref()),
            "Hook panicked"
        );
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}
