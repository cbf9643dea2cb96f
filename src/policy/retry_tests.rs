//! Tests for backoff strategies and retry predicates.

use super::{
    AttemptOutcome, Backoff, ExponentialBackoff, retry_on_error_or_server_error,
    retry_transient_only,
};
use crate::transport::{HttpResponse, RateLimitError, TransportError};
use http::StatusCode;
use std::time::Duration;

fn status(code: u16) -> AttemptOutcome {
    Ok(HttpResponse::with_status(StatusCode::from_u16(code).unwrap()))
}

mod predicates {
    use super::*;

    #[test]
    fn default_retries_transport_errors() {
        assert!(retry_on_error_or_server_error(&Err(TransportError::Timeout)));
        assert!(retry_on_error_or_server_error(&Err(
            TransportError::connection(std::io::Error::other("refused"))
        )));
    }

    #[test]
    fn default_retries_server_errors_only() {
        assert!(retry_on_error_or_server_error(&status(500)));
        assert!(retry_on_error_or_server_error(&status(503)));
        assert!(!retry_on_error_or_server_error(&status(200)));
        assert!(!retry_on_error_or_server_error(&status(404)));
        assert!(!retry_on_error_or_server_error(&status(429)));
    }

    #[test]
    fn transient_only_skips_local_rejections() {
        assert!(!retry_transient_only(&Err(TransportError::RateLimited(
            RateLimitError::DeadlineExceeded
        ))));
        assert!(!retry_transient_only(&Err(TransportError::CircuitOpen {
            name: "x".to_string()
        })));
        assert!(retry_transient_only(&Err(TransportError::Timeout)));
    }

    #[test]
    fn transient_only_retries_throttling_statuses() {
        assert!(retry_transient_only(&status(429)));
        assert!(retry_transient_only(&status(408)));
        assert!(retry_transient_only(&status(502)));
        assert!(!retry_transient_only(&status(400)));
    }
}

mod exponential {
    use super::*;

    #[test]
    fn defaults() {
        let backoff = ExponentialBackoff::default();
        assert_eq!(backoff.initial_delay, Duration::from_millis(200));
        assert_eq!(backoff.max_delay, Duration::from_secs(10));
        assert!((backoff.multiplier - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn grows_by_multiplier() {
        let backoff = ExponentialBackoff::new().with_initial_delay(Duration::from_millis(100));
        assert_eq!(backoff.delay_for_retry(0), Duration::from_millis(100));
        assert_eq!(backoff.delay_for_retry(1), Duration::from_millis(200));
        assert_eq!(backoff.delay_for_retry(2), Duration::from_millis(400));
    }

    #[test]
    fn capped_at_max_delay() {
        let backoff = ExponentialBackoff::new()
            .with_initial_delay(Duration::from_secs(1))
            .with_max_delay(Duration::from_secs(5));
        assert_eq!(backoff.delay_for_retry(10), Duration::from_secs(5));
        assert_eq!(backoff.delay_for_retry(u32::MAX), Duration::from_secs(5));
    }

    #[test]
    #[should_panic(expected = "multiplier must be positive")]
    fn rejects_non_positive_multiplier() {
        let _ = ExponentialBackoff::new().with_multiplier(0.0);
    }
}

mod strategies {
    use super::*;

    #[test]
    fn default_is_constant_200ms() {
        let backoff = Backoff::default();
        for attempt in 0..5 {
            assert_eq!(backoff.delay(attempt), Duration::from_millis(200));
        }
    }

    #[test]
    fn jittered_stays_within_exponential_bound() {
        let exp = ExponentialBackoff::new().with_initial_delay(Duration::from_millis(100));
        let backoff = Backoff::Jittered(exp);
        for attempt in 0..6 {
            assert!(backoff.delay(attempt) <= exp.delay_for_retry(attempt));
        }
    }

    #[test]
    fn custom_receives_attempt_index() {
        let backoff = Backoff::custom(|attempt| Duration::from_millis(u64::from(attempt) * 10));
        assert_eq!(backoff.delay(0), Duration::ZERO);
        assert_eq!(backoff.delay(3), Duration::from_millis(30));
        assert_eq!(format!("{backoff:?}"), "Custom(..)");
    }
}
