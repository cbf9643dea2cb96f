//! Application execution logic.
//!
//! Builds the client from the validated configuration, sends one request
//! and writes the response body to stdout.

use std::io::Write;

use bytes::Bytes;
use http::Method;
use thiserror::Error;
use tokio::signal;

use resilient_http::client::{BuildError, CallError};
use resilient_http::config::{ConfigError, ValidatedConfig};
use resilient_http::transport::{CallerContext, HttpResponse};

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;

/// Error type for runtime execution failures.
#[derive(Debug, Error)]
pub enum RunError {
    /// The client could not be built.
    #[error("Failed to build client: {0}")]
    Build(#[from] BuildError),

    /// The call failed.
    #[error("{0}")]
    Call(#[from] CallError),

    /// Interrupted before the call finished.
    #[error("Interrupted")]
    Interrupted,

    /// Failed to write the response body.
    #[error("Failed to write response: {0}")]
    Output(#[source] std::io::Error),
}

/// The request named on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestArgs {
    /// HTTP method
    pub method: Method,
    /// Path relative to the base URL, or an absolute URL
    pub path: String,
    /// Request body
    pub body: Option<Bytes>,
}

impl RequestArgs {
    /// Validates the method and captures path and body.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidMethod`] for a malformed method.
    pub fn parse(method: &str, path: &str, data: Option<&str>) -> Result<Self, ConfigError> {
        let method = method
            .to_uppercase()
            .parse::<Method>()
            .map_err(|_| ConfigError::InvalidMethod(method.to_string()))?;
        Ok(Self {
            method,
            path: path.to_string(),
            body: data.map(|data| Bytes::copy_from_slice(data.as_bytes())),
        })
    }
}

/// Sends the request and prints the response body.
///
/// A Ctrl+C while the call is in flight abandons it.
pub async fn execute(config: ValidatedConfig, request: RequestArgs) -> Result<(), RunError> {
    let client = config.client_builder().build()?;
    let caller = CallerContext::new();

    let call = client.request(&caller, request.method, &request.path, request.body, None);
    let response = tokio::select! {
        result = call => result?,
        _ = signal::ctrl_c() => {
            tracing::info!("Received Ctrl+C, abandoning request");
            client.shutdown();
            return Err(RunError::Interrupted);
        }
    };

    client.shutdown();
    write_response(&response, &mut std::io::stdout().lock())
}

fn write_response(response: &HttpResponse, out: &mut impl Write) -> Result<(), RunError> {
    tracing::info!(status = response.status.as_u16(), "Response received");
    out.write_all(response.body_bytes())
        .and_then(|()| out.flush())
        .map_err(RunError::Output)
}
