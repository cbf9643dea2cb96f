//! Tests for policy merging and resolution.

use super::{DEFAULT_MAX_RETRIES, DEFAULT_TIMEOUT, PolicyResolver, PolicySettings};
use crate::resilience::{BreakerSettings, ConsecutiveFailureBreaker, TokenBucket};
use http::{HeaderName, HeaderValue, Method};
use std::sync::Arc;
use std::time::Duration;

fn header(name: &'static str, value: &'static str) -> (HeaderName, HeaderValue) {
    (HeaderName::from_static(name), HeaderValue::from_static(value))
}

mod structural_defaults {
    use super::*;

    #[test]
    fn empty_settings_resolve_to_defaults() {
        let policy = PolicySettings::new().resolve();

        assert_eq!(policy.timeout, DEFAULT_TIMEOUT);
        assert_eq!(policy.timeout, Duration::from_secs(10));
        assert_eq!(policy.max_retries, DEFAULT_MAX_RETRIES);
        assert_eq!(policy.max_retries, 2);
        assert!(policy.headers.is_empty());
        assert!(!policy.require_auth);
        assert!(!policy.cache_enabled);
        assert!(policy.rate_limiter.is_none());
        assert!(policy.fallback.is_none());
        assert_eq!(policy.breaker.name(), "pass-through");
        assert_eq!(policy.backoff.delay(0), Duration::from_millis(200));
    }

    #[test]
    fn explicit_zero_retries_is_kept() {
        let policy = PolicySettings::new().with_max_retries(0).resolve();
        assert_eq!(policy.max_retries, 0);
    }

    #[test]
    fn resolver_without_anything_never_fails() {
        let policy = PolicyResolver::default().resolve(&Method::GET, "/anything");
        assert_eq!(policy.timeout, DEFAULT_TIMEOUT);
    }
}

mod merging {
    use super::*;

    #[test]
    fn override_fields_win_unset_fall_back() {
        let defaults = PolicySettings::new()
            .with_timeout(Duration::from_secs(30))
            .with_max_retries(5)
            .with_require_auth(true);
        let endpoint = PolicySettings::new().with_max_retries(1);

        let policy = endpoint.merge_over(&defaults).resolve();

        assert_eq!(policy.timeout, Duration::from_secs(30));
        assert_eq!(policy.max_retries, 1);
        assert!(policy.require_auth);
    }

    #[test]
    fn headers_merge_per_key() {
        let (accept, json) = header("accept", "application/json");
        let (agent, default_agent) = header("user-agent", "default");
        let (_, custom_agent) = header("user-agent", "custom");

        let defaults = PolicySettings::new()
            .with_header(accept.clone(), json.clone())
            .with_header(agent.clone(), default_agent);
        let endpoint = PolicySettings::new().with_header(agent.clone(), custom_agent.clone());

        let merged = endpoint.merge_over(&defaults);

        assert_eq!(merged.headers.get(&accept), Some(&json));
        assert_eq!(merged.headers.get(&agent), Some(&custom_agent));
    }

    #[test]
    fn tags_merge_per_key() {
        let defaults = PolicySettings::new().with_tag("team", "core").with_tag("tier", "1");
        let endpoint = PolicySettings::new().with_tag("tier", "2");

        let merged = endpoint.merge_over(&defaults);

        assert_eq!(merged.tags.get("team").map(String::as_str), Some("core"));
        assert_eq!(merged.tags.get("tier").map(String::as_str), Some("2"));
    }

    #[test]
    fn shared_collaborators_are_not_cloned() {
        let limiter = Arc::new(TokenBucket::new(1.0, 1));
        let defaults = PolicySettings::new().with_rate_limiter(limiter.clone());

        let policy = PolicySettings::new()
            .with_max_retries(0)
            .merge_over(&defaults)
            .resolve();

        let resolved = policy.rate_limiter.unwrap();
        let expected: Arc<dyn crate::resilience::RateLimiter> = limiter;
        assert!(Arc::ptr_eq(&resolved, &expected));
    }
}

mod resolver {
    use super::*;

    fn resolver() -> PolicyResolver {
        let breaker = Arc::new(ConsecutiveFailureBreaker::new(
            "payments",
            BreakerSettings::new(),
        ));
        PolicyResolver::new(PolicySettings::new().with_timeout(Duration::from_secs(15)))
            .with_endpoints(Arc::new(move |method: &Method, path: &str| {
                if path.starts_with("/payments") {
                    Some(PolicySettings::new().with_breaker(breaker.clone()))
                } else if *method == Method::GET && path == "/public" {
                    Some(PolicySettings::new().with_max_retries(0))
                } else if path == "/declined" {
                    Some(PolicySettings::new())
                } else {
                    None
                }
            }))
    }

    #[test]
    fn matching_override_is_merged_over_defaults() {
        let policy = resolver().resolve(&Method::POST, "/payments/charge");

        assert_eq!(policy.breaker.name(), "payments");
        assert_eq!(policy.timeout, Duration::from_secs(15));
    }

    #[test]
    fn override_can_depend_on_method() {
        let get = resolver().resolve(&Method::GET, "/public");
        let post = resolver().resolve(&Method::POST, "/public");

        assert_eq!(get.max_retries, 0);
        assert_eq!(post.max_retries, DEFAULT_MAX_RETRIES);
    }

    #[test]
    fn no_override_uses_defaults() {
        let policy = resolver().resolve(&Method::GET, "/other");

        assert_eq!(policy.timeout, Duration::from_secs(15));
        assert_eq!(policy.breaker.name(), "pass-through");
    }

    #[test]
    fn empty_override_counts_as_declined() {
        let policy = resolver().resolve(&Method::GET, "/declined");
        assert_eq!(policy.timeout, Duration::from_secs(15));
    }

    #[test]
    fn defaults_are_exposed() {
        assert_eq!(
            resolver().defaults().timeout,
            Some(Duration::from_secs(15))
        );
    }
}
