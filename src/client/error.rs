//! Error types for client calls.

use std::fmt;

use bytes::Bytes;
use http::{Method, StatusCode};
use thiserror::Error;

use crate::transport::{BoxError, TransportError};

/// Why a call failed.
#[derive(Debug, Error)]
pub enum Cause {
    /// A response arrived with status >= 400.
    #[error("error status")]
    Status,

    /// No usable response was produced.
    ///
    /// Covers network failures and timeouts as well as local rejections
    /// (rate limiter, open breaker, oversized body). A response whose body
    /// could not be read still reports its status.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The configured fallback failed.
    #[error("fallback failed: {0}")]
    Fallback(#[source] BoxError),
}

/// A failed call, with enough context to log or branch on.
///
/// This is the only error type the client's call methods return; errors
/// produced by a fallback are normalized into it as well.
#[derive(Debug)]
pub struct CallError {
    status: Option<StatusCode>,
    cause: Cause,
    attempts: u32,
    method: Method,
    url: String,
    body: Bytes,
}

impl CallError {
    /// Creates an error for a call that never received a response.
    #[must_use]
    pub fn from_transport(
        method: Method,
        url: impl Into<String>,
        attempts: u32,
        err: TransportError,
    ) -> Self {
        Self {
            status: None,
            cause: Cause::Transport(err),
            attempts,
            method,
            url: url.into(),
            body: Bytes::new(),
        }
    }

    /// Creates an error for a response with an error status.
    #[must_use]
    pub fn from_status(
        method: Method,
        url: impl Into<String>,
        attempts: u32,
        status: StatusCode,
        body: Bytes,
    ) -> Self {
        Self {
            status: Some(status),
            cause: Cause::Status,
            attempts,
            method,
            url: url.into(),
            body,
        }
    }

    /// Records the status of a response that arrived but could not be used.
    #[must_use]
    pub(crate) fn with_status(mut self, status: StatusCode) -> Self {
        self.status = Some(status);
        self
    }

    /// Replaces the cause with a fallback failure, keeping the call context.
    #[must_use]
    pub(crate) fn into_fallback_failure(self, err: BoxError) -> Self {
        Self {
            cause: Cause::Fallback(err),
            ..self
        }
    }

    /// Status of the last response, if any was received.
    #[must_use]
    pub const fn status(&self) -> Option<StatusCode> {
        self.status
    }

    /// Numeric status of the last response, or 0 when none was received.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        self.status.map_or(0, |status| status.as_u16())
    }

    /// Why the call failed.
    #[must_use]
    pub const fn cause(&self) -> &Cause {
        &self.cause
    }

    /// The transport error, if the call failed without a usable response.
    #[must_use]
    pub const fn transport_error(&self) -> Option<&TransportError> {
        match &self.cause {
            Cause::Transport(e) => Some(e),
            _ => None,
        }
    }

    /// Number of attempts actually made.
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Request method.
    #[must_use]
    pub const fn method(&self) -> &Method {
        &self.method
    }

    /// Request URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Body of the last response; empty when none was received.
    #[must_use]
    pub const fn body(&self) -> &Bytes {
        &self.body
    }

    /// Returns true if the call timed out.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self.cause, Cause::Transport(TransportError::Timeout))
    }

    /// Returns true if an open circuit breaker rejected the call.
    #[must_use]
    pub const fn is_circuit_open(&self) -> bool {
        matches!(self.cause, Cause::Transport(TransportError::CircuitOpen { .. }))
    }

    /// Returns true if the rate limiter rejected the call.
    #[must_use]
    pub const fn is_rate_limited(&self) -> bool {
        matches!(self.cause, Cause::Transport(TransportError::RateLimited(_)))
    }
}

impl fmt::Display for CallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[HTTP] {} {}: status={}, attempts={}, err={}",
            self.method,
            self.url,
            self.status_code(),
            self.attempts,
            self.cause
        )?;
        if !self.body.is_empty() {
            write!(f, ", body={}", String::from_utf8_lossy(&self.body))?;
        }
        Ok(())
    }
}

impl std::error::Error for CallError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.cause {
            Cause::Status => None,
            Cause::Transport(e) => Some(e),
            Cause::Fallback(e) => Some(e.as_ref()),
        }
    }
}

/// Error type for building a [`Client`](super::Client).
#[derive(Debug, Error)]
pub enum BuildError {
    /// The base URL does not parse.
    #[error("Invalid base URL '{url}': {source}")]
    InvalidBaseUrl {
        /// The rejected value
        url: String,
        /// Parse failure
        #[source]
        source: url::ParseError,
    },
}
