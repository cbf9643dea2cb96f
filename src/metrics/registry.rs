//! Metric families and the registry that owns them.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};
use std::time::Duration;

/// Histogram bucket upper bounds in seconds (5ms up to 10s).
pub const DEFAULT_BUCKETS: [f64; 11] = [
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Identifies a metric family.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MetricsConfig {
    /// Metric name prefix
    pub namespace: String,
    /// Second name component; may be empty
    pub subsystem: String,
}

impl MetricsConfig {
    /// Default namespace when none is given.
    pub const DEFAULT_NAMESPACE: &'static str = "http_client";

    /// Creates a config; an empty namespace falls back to the default.
    #[must_use]
    pub fn new(namespace: impl Into<String>, subsystem: impl Into<String>) -> Self {
        let namespace = namespace.into();
        Self {
            namespace: if namespace.is_empty() {
                Self::DEFAULT_NAMESPACE.to_string()
            } else {
                namespace
            },
            subsystem: subsystem.into(),
        }
    }

    /// Returns the fully qualified name of a metric in this family.
    #[must_use]
    pub fn qualified(&self, name: &str) -> String {
        if self.subsystem.is_empty() {
            format!("{}_{name}", self.namespace)
        } else {
            format!("{}_{}_{name}", self.namespace, self.subsystem)
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self::new(Self::DEFAULT_NAMESPACE, "")
    }
}

/// Labels for request count and duration series.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestLabels {
    /// HTTP method
    pub method: String,
    /// Target host
    pub host: String,
    /// URL path
    pub path: String,
    /// Response status code
    pub status: String,
}

/// Labels for the error count series.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ErrorLabels {
    /// HTTP method
    pub method: String,
    /// Target host
    pub host: String,
    /// URL path
    pub path: String,
    /// Error kind
    pub error: String,
}

/// Point-in-time view of one histogram series.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramSnapshot {
    /// Cumulative counts per bucket in [`DEFAULT_BUCKETS`] order
    pub buckets: Vec<u64>,
    /// Number of observations
    pub count: u64,
    /// Sum of observations in seconds
    pub sum: f64,
}

/// Point-in-time view of a metric family.
#[derive(Debug, Clone, Default)]
pub struct MetricsSnapshot {
    /// `requests_total` by labels
    pub requests: BTreeMap<RequestLabels, u64>,
    /// `request_errors_total` by labels
    pub errors: BTreeMap<ErrorLabels, u64>,
    /// `request_duration_seconds` by labels
    pub durations: BTreeMap<RequestLabels, HistogramSnapshot>,
}

impl MetricsSnapshot {
    /// Total requests across all label sets.
    #[must_use]
    pub fn total_requests(&self) -> u64 {
        self.requests.values().sum()
    }

    /// Total errors across all label sets.
    #[must_use]
    pub fn total_errors(&self) -> u64 {
        self.errors.values().sum()
    }
}

#[derive(Debug, Default)]
struct Series {
    requests: HashMap<RequestLabels, u64>,
    errors: HashMap<ErrorLabels, u64>,
    durations: HashMap<RequestLabels, HistogramSnapshot>,
}

/// Request duration, request count and error count for one family.
#[derive(Debug)]
pub struct ClientMetrics {
    config: MetricsConfig,
    series: Mutex<Series>,
}

impl ClientMetrics {
    fn new(config: MetricsConfig) -> Self {
        Self {
            config,
            series: Mutex::new(Series::default()),
        }
    }

    /// Returns the family's identity.
    #[must_use]
    pub const fn config(&self) -> &MetricsConfig {
        &self.config
    }

    /// Records a completed request.
    pub fn observe_request(&self, labels: RequestLabels, duration: Duration) {
        let secs = duration.as_secs_f64();
        let mut series = self.lock();
        *series.requests.entry(labels.clone()).or_default() += 1;

        let histogram = series
            .durations
            .entry(labels)
            .or_insert_with(|| HistogramSnapshot {
                buckets: vec![0; DEFAULT_BUCKETS.len()],
                count: 0,
                sum: 0.0,
            });
        for (count, bound) in histogram.buckets.iter_mut().zip(DEFAULT_BUCKETS) {
            if secs <= bound {
                *count += 1;
            }
        }
        histogram.count += 1;
        histogram.sum += secs;
    }

    /// Records a request that produced no response.
    pub fn observe_error(&self, labels: ErrorLabels) {
        *self.lock().errors.entry(labels).or_default() += 1;
    }

    /// Returns a copy of every series.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        let series = self.lock();
        MetricsSnapshot {
            requests: series.requests.clone().into_iter().collect(),
            errors: series.errors.clone().into_iter().collect(),
            durations: series.durations.clone().into_iter().collect(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Series> {
        match self.series.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Owns metric families keyed by namespace and subsystem.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    families: Mutex<HashMap<MetricsConfig, Arc<ClientMetrics>>>,
}

impl MetricsRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the process-wide registry.
    pub fn global() -> &'static Self {
        static GLOBAL: OnceLock<MetricsRegistry> = OnceLock::new();
        GLOBAL.get_or_init(Self::new)
    }

    /// Registers a family, or returns the existing one for the same config.
    pub fn register(&self, config: MetricsConfig) -> Arc<ClientMetrics> {
        let mut families = match self.families.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(existing) = families.get(&config) {
            tracing::debug!(namespace = %config.namespace, subsystem = %config.subsystem,
                "Reusing registered metrics");
            return Arc::clone(existing);
        }
        let metrics = Arc::new(ClientMetrics::new(config.clone()));
        families.insert(config, Arc::clone(&metrics));
        metrics
    }

    /// Returns the number of registered families.
    #[must_use]
    pub fn len(&self) -> usize {
        match self.families.lock() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
