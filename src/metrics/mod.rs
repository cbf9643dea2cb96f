//! In-process metrics for outbound HTTP calls.
//!
//! A [`MetricsRegistry`] hands out one [`ClientMetrics`] family per
//! namespace/subsystem pair. Registration is idempotent: asking twice for
//! the same pair returns the same family instead of failing, so several
//! clients built with the same configuration share their series.

mod registry;

#[cfg(test)]
mod registry_tests;

pub use registry::{
    ClientMetrics, DEFAULT_BUCKETS, ErrorLabels, HistogramSnapshot, MetricsConfig,
    MetricsRegistry, MetricsSnapshot, RequestLabels,
};
