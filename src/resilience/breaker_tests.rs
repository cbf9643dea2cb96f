//! Tests for the circuit breaker implementations.

use super::{
    BreakerError, BreakerSettings, BreakerState, CircuitBreaker, ConsecutiveFailureBreaker,
    GuardedCall, GuardedFailure, PassThroughBreaker,
};
use crate::transport::{HttpResponse, TransportError};
use http::StatusCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

fn guarded<'a>(
    call: impl Future<Output = Result<HttpResponse, GuardedFailure>> + Send + 'a,
) -> GuardedCall<'a> {
    Box::pin(call)
}

fn succeed<'a>(calls: &'a AtomicU32) -> GuardedCall<'a> {
    Box::pin(async move {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(HttpResponse::with_status(StatusCode::OK))
    })
}

fn fail<'a>(calls: &'a AtomicU32) -> GuardedCall<'a> {
    Box::pin(async move {
        calls.fetch_add(1, Ordering::SeqCst);
        Err(GuardedFailure::Status(HttpResponse::with_status(
            StatusCode::SERVICE_UNAVAILABLE,
        )))
    })
}

fn settings() -> BreakerSettings {
    BreakerSettings::new()
        .with_failure_threshold(3)
        .with_open_timeout(Duration::from_secs(5))
        .with_half_open_max_requests(1)
}

mod settings_values {
    use super::*;

    #[test]
    fn defaults() {
        let settings = BreakerSettings::default();
        assert_eq!(settings.failure_threshold, 5);
        assert_eq!(settings.open_timeout, Duration::from_secs(10));
        assert_eq!(settings.half_open_max_requests, 1);
    }

    #[test]
    fn zero_values_are_raised_to_one() {
        let settings = BreakerSettings::new()
            .with_failure_threshold(0)
            .with_half_open_max_requests(0);
        assert_eq!(settings.failure_threshold, 1);
        assert_eq!(settings.half_open_max_requests, 1);
    }

    #[test]
    fn state_display() {
        assert_eq!(BreakerState::Closed.to_string(), "closed");
        assert_eq!(BreakerState::Open.to_string(), "open");
        assert_eq!(BreakerState::HalfOpen.to_string(), "half-open");
    }
}

mod pass_through {
    use super::*;

    #[tokio::test]
    async fn never_rejects() {
        let breaker = PassThroughBreaker::new();
        let calls = AtomicU32::new(0);

        for _ in 0..10 {
            let result = breaker.execute(fail(&calls)).await;
            assert!(matches!(result, Err(BreakerError::Failed(_))));
        }
        assert!(breaker.execute(succeed(&calls)).await.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 11);
        assert_eq!(breaker.name(), "pass-through");
    }
}

mod consecutive_failures {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn opens_after_threshold_and_rejects_without_calling() {
        let breaker = ConsecutiveFailureBreaker::new("orders", settings());
        let calls = AtomicU32::new(0);

        for _ in 0..3 {
            let _ = breaker.execute(fail(&calls)).await;
        }
        assert_eq!(breaker.state(), BreakerState::Open);

        let result = breaker.execute(succeed(&calls)).await;
        assert!(matches!(result, Err(BreakerError::Open)));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn success_resets_the_count() {
        let breaker = ConsecutiveFailureBreaker::new("orders", settings());
        let calls = AtomicU32::new(0);

        let _ = breaker.execute(fail(&calls)).await;
        let _ = breaker.execute(fail(&calls)).await;
        breaker.execute(succeed(&calls)).await.unwrap();
        let _ = breaker.execute(fail(&calls)).await;
        let _ = breaker.execute(fail(&calls)).await;

        assert_eq!(breaker.state(), BreakerState::Closed);
    }

    #[tokio::test]
    async fn failed_call_carries_the_response() {
        let breaker = ConsecutiveFailureBreaker::new("orders", settings());
        let calls = AtomicU32::new(0);

        match breaker.execute(fail(&calls)).await {
            Err(BreakerError::Failed(GuardedFailure::Status(response))) => {
                assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn half_open_trial_success_closes() {
        let breaker = ConsecutiveFailureBreaker::new("orders", settings());
        let calls = AtomicU32::new(0);
        for _ in 0..3 {
            let _ = breaker.execute(fail(&calls)).await;
        }

        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(breaker.state(), BreakerState::HalfOpen);

        breaker.execute(succeed(&calls)).await.unwrap();
        assert_eq!(breaker.state(), BreakerState::Closed);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn half_open_trial_failure_reopens() {
        let breaker = ConsecutiveFailureBreaker::new("orders", settings());
        let calls = AtomicU32::new(0);
        for _ in 0..3 {
            let _ = breaker.execute(fail(&calls)).await;
        }

        tokio::time::advance(Duration::from_secs(5)).await;
        let _ = breaker.execute(fail(&calls)).await;

        assert_eq!(breaker.state(), BreakerState::Open);
        let result = breaker.execute(succeed(&calls)).await;
        assert!(matches!(result, Err(BreakerError::Open)));
    }

    #[tokio::test(start_paused = true)]
    async fn half_open_needs_consecutive_successes() {
        let settings = settings().with_half_open_max_requests(2);
        let breaker = ConsecutiveFailureBreaker::new("orders", settings);
        let calls = AtomicU32::new(0);
        for _ in 0..3 {
            let _ = breaker.execute(fail(&calls)).await;
        }
        tokio::time::advance(Duration::from_secs(5)).await;

        breaker.execute(succeed(&calls)).await.unwrap();
        assert_eq!(breaker.state(), BreakerState::HalfOpen);
        breaker.execute(succeed(&calls)).await.unwrap();
        assert_eq!(breaker.state(), BreakerState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn half_open_limits_concurrent_trials() {
        let breaker = Arc::new(ConsecutiveFailureBreaker::new("orders", settings()));
        let calls = AtomicU32::new(0);
        for _ in 0..3 {
            let _ = breaker.execute(fail(&calls)).await;
        }
        tokio::time::advance(Duration::from_secs(5)).await;

        let (release, wait) = tokio::sync::oneshot::channel::<()>();
        let trial_breaker = Arc::clone(&breaker);
        let trial = tokio::spawn(async move {
            trial_breaker
                .execute(guarded(async move {
                    let _ = wait.await;
                    Ok(HttpResponse::with_status(StatusCode::OK))
                }))
                .await
                .is_ok()
        });
        tokio::task::yield_now().await;

        let rejected = breaker.execute(succeed(&calls)).await;
        assert!(matches!(rejected, Err(BreakerError::Open)));

        release.send(()).unwrap();
        assert!(trial.await.unwrap());
        assert_eq!(breaker.state(), BreakerState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn abandoned_trial_frees_its_slot() {
        let breaker = ConsecutiveFailureBreaker::new("orders", settings());
        let calls = AtomicU32::new(0);
        for _ in 0..3 {
            let _ = breaker.execute(fail(&calls)).await;
        }
        tokio::time::advance(Duration::from_secs(5)).await;

        let pending = breaker.execute(guarded(std::future::pending()));
        let abandoned = tokio::time::timeout(Duration::from_millis(10), pending).await;
        assert!(abandoned.is_err());

        breaker.execute(succeed(&calls)).await.unwrap();
        assert_eq!(breaker.state(), BreakerState::Closed);
    }

    #[tokio::test]
    async fn transport_errors_count_as_failures() {
        let breaker =
            ConsecutiveFailureBreaker::new("orders", settings().with_failure_threshold(1));

        let result = breaker
            .execute(guarded(async {
                Err(GuardedFailure::Transport(TransportError::Timeout))
            }))
            .await;

        assert!(matches!(
            result,
            Err(BreakerError::Failed(GuardedFailure::Transport(TransportError::Timeout)))
        ));
        assert_eq!(breaker.state(), BreakerState::Open);
    }
}
