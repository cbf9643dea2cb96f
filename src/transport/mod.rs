//! Transport layer: the seam every request crosses on its way to the wire.
//!
//! This module provides types and traits for:
//! - Building HTTP requests ([`HttpRequest`])
//! - Handling HTTP responses and their bodies ([`HttpResponse`], [`Body`])
//! - Abstracting the wire ([`Transport`])
//! - Decorating transports ([`Interceptor`], [`Chain`])
//! - Per-call state ([`CallContext`], [`CallerContext`])
//! - Production transport implementation ([`ReqwestTransport`])

mod body;
mod chain;
mod client;
mod context;
mod error;
mod message;


pub use body::Body;
pub use chain::{Chain, Interceptor};
pub use client::ReqwestTransport;
pub use context::{CallContext, CallerContext};
pub use error::{BodyError, BoxError, RateLimitError, TransportError};
pub use message::{HttpRequest, HttpResponse, SharedTransport, Transport};
