//! Tests for the metrics registry and metric families.

use super::{DEFAULT_BUCKETS, ErrorLabels, MetricsConfig, MetricsRegistry, RequestLabels};
use std::sync::Arc;
use std::time::Duration;

fn request_labels(status: &str) -> RequestLabels {
    RequestLabels {
        method: "GET".to_string(),
        host: "api.test".to_string(),
        path: "/users".to_string(),
        status: status.to_string(),
    }
}

mod config {
    use super::*;

    #[test]
    fn empty_namespace_uses_default() {
        let config = MetricsConfig::new("", "");
        assert_eq!(config.namespace, "http_client");
        assert_eq!(config, MetricsConfig::default());
    }

    #[test]
    fn qualified_names() {
        assert_eq!(
            MetricsConfig::new("shop", "").qualified("requests_total"),
            "shop_requests_total"
        );
        assert_eq!(
            MetricsConfig::new("shop", "orders").qualified("requests_total"),
            "shop_orders_requests_total"
        );
    }
}

mod registration {
    use super::*;

    #[test]
    fn same_config_returns_same_family() {
        let registry = MetricsRegistry::new();
        let first = registry.register(MetricsConfig::new("shop", "orders"));
        let second = registry.register(MetricsConfig::new("shop", "orders"));

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn different_configs_are_separate() {
        let registry = MetricsRegistry::new();
        let orders = registry.register(MetricsConfig::new("shop", "orders"));
        let users = registry.register(MetricsConfig::new("shop", "users"));

        orders.observe_request(request_labels("200"), Duration::from_millis(5));

        assert!(!Arc::ptr_eq(&orders, &users));
        assert_eq!(users.snapshot().total_requests(), 0);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn global_registry_is_shared() {
        let a = MetricsRegistry::global()
            .register(MetricsConfig::new("registry_tests_global", ""));
        let b = MetricsRegistry::global()
            .register(MetricsConfig::new("registry_tests_global", ""));
        assert!(Arc::ptr_eq(&a, &b));
    }
}

mod observations {
    use super::*;

    #[test]
    fn counts_requests_per_label_set() {
        let metrics = MetricsRegistry::new().register(MetricsConfig::default());
        metrics.observe_request(request_labels("200"), Duration::from_millis(20));
        metrics.observe_request(request_labels("200"), Duration::from_millis(30));
        metrics.observe_request(request_labels("503"), Duration::from_millis(40));

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.requests[&request_labels("200")], 2);
        assert_eq!(snapshot.requests[&request_labels("503")], 1);
        assert_eq!(snapshot.total_requests(), 3);
    }

    #[test]
    fn histogram_buckets_are_cumulative() {
        let metrics = MetricsRegistry::new().register(MetricsConfig::default());
        metrics.observe_request(request_labels("200"), Duration::from_millis(30));

        let snapshot = metrics.snapshot();
        let histogram = &snapshot.durations[&request_labels("200")];
        assert_eq!(histogram.count, 1);
        assert!((histogram.sum - 0.03).abs() < 1e-9);
        assert_eq!(histogram.buckets.len(), DEFAULT_BUCKETS.len());
        // 5ms, 10ms and 25ms buckets stay empty; 50ms and above count it
        assert_eq!(&histogram.buckets[..4], &[0, 0, 0, 1]);
        assert!(histogram.buckets[3..].iter().all(|&c| c == 1));
    }

    #[test]
    fn errors_are_counted_separately() {
        let metrics = MetricsRegistry::new().register(MetricsConfig::default());
        let labels = ErrorLabels {
            method: "GET".to_string(),
            host: "api.test".to_string(),
            path: "/users".to_string(),
            error: "timeout".to_string(),
        };
        metrics.observe_error(labels.clone());
        metrics.observe_error(labels.clone());

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.errors[&labels], 2);
        assert_eq!(snapshot.total_errors(), 2);
        assert_eq!(snapshot.total_requests(), 0);
    }
}
