//! One logical call: retries, materialization, classification, fallback.

use http::header::AUTHORIZATION;
use http::{HeaderMap, HeaderValue, StatusCode};
use tokio::time::{Instant, sleep, timeout_at};

use super::CallError;
use crate::policy::{AttemptOutcome, EndpointPolicy, FallbackFn, RequestInfo};
use crate::transport::{CallContext, HttpRequest, HttpResponse, Transport, TransportError};

/// Drives attempts until the predicate says stop or retries run out.
///
/// Returns the last outcome together with the number of attempts made.
/// The first attempt is unconditional. A discarded response is dropped,
/// releasing its connection, before the backoff sleep starts. No retry is
/// started once the backoff would reach the call's deadline.
pub(crate) async fn run_attempts(
    transport: &dyn Transport,
    req: &HttpRequest,
    cx: &CallContext,
) -> (AttemptOutcome, u32) {
    let policy = cx.policy();
    let mut attempt = 0;
    loop {
        cx.set_attempt(attempt);
        let outcome = timeout_at(cx.deadline(), transport.send(req.clone(), cx))
            .await
            .unwrap_or(Err(TransportError::Timeout));
        let attempts = attempt + 1;

        if !policy.should_retry(&outcome) {
            return (outcome, attempts);
        }
        if attempt >= policy.max_retries {
            tracing::debug!(
                method = %req.method,
                url = %req.url,
                attempts,
                "Retries exhausted"
            );
            return (outcome, attempts);
        }

        let delay = policy.backoff.delay(attempt);
        if Instant::now() + delay >= cx.deadline() {
            tracing::debug!(
                method = %req.method,
                url = %req.url,
                attempts,
                ?delay,
                "Backoff would pass the call deadline, not retrying"
            );
            return (outcome, attempts);
        }

        match &outcome {
            Ok(response) => tracing::debug!(
                method = %req.method,
                url = %req.url,
                attempt,
                status = response.status.as_u16(),
                ?delay,
                "Retrying after response"
            ),
            Err(e) => tracing::debug!(
                method = %req.method,
                url = %req.url,
                attempt,
                error = %e,
                ?delay,
                "Retrying after error"
            ),
        }
        drop(outcome);
        sleep(delay).await;
        attempt += 1;
    }
}

/// The last attempt's outcome once its body has been buffered.
pub(crate) type Settled = Result<HttpResponse, Unsettled>;

/// A last attempt that left no usable response.
#[derive(Debug)]
pub(crate) struct Unsettled {
    /// Status of a response whose body could not be read.
    pub status: Option<StatusCode>,
    pub error: TransportError,
}

impl From<TransportError> for Unsettled {
    fn from(error: TransportError) -> Self {
        Self { status: None, error }
    }
}

/// Buffers the final response body, bounded by the call's deadline.
///
/// A body that fails to buffer keeps the status it arrived with.
pub(crate) async fn materialize(outcome: AttemptOutcome, cx: &CallContext) -> Settled {
    let mut response = outcome?;
    let error = match timeout_at(cx.deadline(), response.body.materialize()).await {
        Ok(Ok(_)) => return Ok(response),
        Ok(Err(e)) => TransportError::Body(e),
        Err(_) => TransportError::Timeout,
    };
    Err(Unsettled {
        status: Some(response.status),
        error,
    })
}

/// Splits the settled outcome into success and a populated [`CallError`].
///
/// Failure means a transport error or a status >= 400. A response whose
/// body could not be buffered fails with the body error as its cause and
/// keeps its status.
pub(crate) fn classify(
    req: &HttpRequest,
    outcome: Settled,
    attempts: u32,
) -> Result<HttpResponse, CallError> {
    match outcome {
        Err(Unsettled { status, error }) => {
            let err =
                CallError::from_transport(req.method.clone(), req.url.as_str(), attempts, error);
            Err(match status {
                Some(status) => err.with_status(status),
                None => err,
            })
        }
        Ok(response) if response.status.as_u16() >= 400 => Err(CallError::from_status(
            req.method.clone(),
            req.url.as_str(),
            attempts,
            response.status,
            response.body.as_bytes().cloned().unwrap_or_default(),
        )),
        Ok(response) => Ok(response),
    }
}

/// Lets the fallback replace a failed call's outcome.
///
/// A fallback error that already is a [`CallError`] is returned as-is;
/// anything else keeps the failed call's context with a fallback cause.
pub(crate) async fn run_fallback(
    fallback: &FallbackFn,
    req: &HttpRequest,
    err: CallError,
) -> Result<HttpResponse, CallError> {
    tracing::debug!(method = %req.method, url = %req.url, error = %err, "Invoking fallback");
    match fallback(req, &err) {
        Ok(mut response) => match response.body.materialize().await {
            Ok(_) => Ok(response),
            Err(body_err) => Err(err.into_fallback_failure(body_err.into())),
        },
        Err(fallback_err) => match fallback_err.downcast::<CallError>() {
            Ok(call_err) => Err(*call_err),
            Err(other) => Err(err.into_fallback_failure(other)),
        },
    }
}

/// Applies policy headers the request does not already carry.
pub(crate) fn apply_static_headers(req: &mut HttpRequest, headers: &HeaderMap) {
    for name in headers.keys() {
        if req.headers.contains_key(name) {
            continue;
        }
        for value in headers.get_all(name) {
            req.headers.append(name.clone(), value.clone());
        }
    }
}

/// Sets `Authorization: Bearer` from the policy's token provider.
pub(crate) fn apply_auth_token(req: &mut HttpRequest, policy: &EndpointPolicy, info: &RequestInfo) {
    let Some(provider) = &policy.auth_token else {
        return;
    };
    match provider(info) {
        Ok(token) if token.is_empty() => {}
        Ok(token) => match HeaderValue::from_str(&format!("Bearer {token}")) {
            Ok(mut value) => {
                value.set_sensitive(true);
                req.headers.insert(AUTHORIZATION, value);
            }
            Err(_) => tracing::warn!(
                method = %info.method,
                path = %info.path,
                "Auth token is not a valid header value, sending without"
            ),
        },
        Err(e) => tracing::warn!(
            method = %info.method,
            path = %info.path,
            error = %e,
            "Auth token provider failed, sending without"
        ),
    }
}
