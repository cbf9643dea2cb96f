//! Tests for `CallError`.

use super::{BuildError, CallError, Cause};
use crate::transport::{RateLimitError, TransportError};
use bytes::Bytes;
use http::{Method, StatusCode};
use std::error::Error as _;
use std::time::Duration;

mod display {
    use super::*;

    #[test]
    fn status_failure_includes_body() {
        let err = CallError::from_status(
            Method::GET,
            "http://api.test/users",
            3,
            StatusCode::SERVICE_UNAVAILABLE,
            Bytes::from_static(b"maintenance"),
        );

        assert_eq!(
            err.to_string(),
            "[HTTP] GET http://api.test/users: status=503, attempts=3, err=error status, body=maintenance"
        );
    }

    #[test]
    fn transport_failure_has_zero_status() {
        let err = CallError::from_transport(
            Method::POST,
            "http://api.test/orders",
            1,
            TransportError::Timeout,
        );

        assert_eq!(
            err.to_string(),
            "[HTTP] POST http://api.test/orders: status=0, attempts=1, err=Request timed out"
        );
    }

    #[test]
    fn fallback_failure_names_the_fallback() {
        let err = CallError::from_status(
            Method::GET,
            "http://api.test/x",
            2,
            StatusCode::BAD_GATEWAY,
            Bytes::new(),
        )
        .into_fallback_failure("store empty".into());

        assert_eq!(
            err.to_string(),
            "[HTTP] GET http://api.test/x: status=502, attempts=2, err=fallback failed: store empty"
        );
    }
}

mod accessors {
    use super::*;

    #[test]
    fn predicates_follow_the_cause() {
        let timeout = CallError::from_transport(Method::GET, "u", 1, TransportError::Timeout);
        assert!(timeout.is_timeout());
        assert!(!timeout.is_circuit_open());

        let open = CallError::from_transport(
            Method::GET,
            "u",
            1,
            TransportError::CircuitOpen {
                name: "payments".to_string(),
            },
        );
        assert!(open.is_circuit_open());

        let limited = CallError::from_transport(
            Method::GET,
            "u",
            1,
            RateLimitError::WouldExceedDeadline {
                wait: Duration::from_secs(1),
            }
            .into(),
        );
        assert!(limited.is_rate_limited());
        assert!(!limited.is_timeout());
    }

    #[test]
    fn source_chain() {
        let status = CallError::from_status(Method::GET, "u", 1, StatusCode::NOT_FOUND, Bytes::new());
        assert!(status.source().is_none());
        assert!(matches!(status.cause(), Cause::Status));
        assert_eq!(status.method(), Method::GET);
        assert_eq!(status.url(), "u");

        let transport = CallError::from_transport(Method::GET, "u", 1, TransportError::Timeout);
        assert_eq!(transport.source().unwrap().to_string(), "Request timed out");

        let fallback = transport.into_fallback_failure("boom".into());
        assert_eq!(fallback.source().unwrap().to_string(), "boom");
        assert_eq!(fallback.attempts(), 1);
    }

    #[test]
    fn build_error_mentions_the_url() {
        let source = url::Url::parse("::bad").unwrap_err();
        let err = BuildError::InvalidBaseUrl {
            url: "::bad".to_string(),
            source,
        };
        assert!(err.to_string().starts_with("Invalid base URL '::bad'"));
    }
}
