//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Dispatcher (conversions by category, strategy and result)
//! - Search engine (encode attempts, forced results)
//! - Job runner (submitted, timed out, active)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts};

// =============================================================================
// Dispatcher Metrics
// =============================================================================

/// Conversions total by category and result.
pub static CONVERSIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("sizefit_conversions_total", "Total conversions dispatched"),
        &["category", "strategy", "result"], // result: "success", "failed"
    )
    .unwrap()
});

/// Conversion duration in seconds.
pub static CONVERSION_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "sizefit_conversion_duration_seconds",
            "Duration of a dispatched conversion",
        )
        .buckets(vec![0.05, 0.1, 0.5, 1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0]),
        &["category"],
    )
    .unwrap()
});

// =============================================================================
// Search Metrics
// =============================================================================

/// Encode attempts per search run.
pub static SEARCH_ATTEMPTS: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "sizefit_search_attempts",
            "Number of encode attempts per ladder search",
        )
        .buckets(vec![1.0, 2.0, 3.0, 5.0, 8.0, 12.0, 16.0]),
        &["category"],
    )
    .unwrap()
});

/// Searches that fell back to the minimum candidate.
pub static FORCED_RESULTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "sizefit_forced_results_total",
            "Searches where no candidate fit the size ceiling",
        ),
        &["category"],
    )
    .unwrap()
});

// =============================================================================
// Job Metrics
// =============================================================================

/// Jobs submitted to the runner.
pub static JOBS_SUBMITTED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("sizefit_jobs_submitted_total", "Total background jobs submitted").unwrap()
});

/// Awaited jobs that exceeded their timeout.
pub static JOBS_TIMED_OUT: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "sizefit_jobs_timed_out_total",
        "Awaited jobs that exceeded the timeout",
    )
    .unwrap()
});

/// Jobs currently holding a worker slot.
pub static JOBS_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("sizefit_jobs_active", "Jobs currently converting").unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Dispatcher
        Box::new(CONVERSIONS_TOTAL.clone()),
        Box::new(CONVERSION_DURATION.clone()),
        // Search
        Box::new(SEARCH_ATTEMPTS.clone()),
        Box::new(FORCED_RESULTS.clone()),
        // Jobs
        Box::new(JOBS_SUBMITTED.clone()),
        Box::new(JOBS_TIMED_OUT.clone()),
        Box::new(JOBS_ACTIVE.clone()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_metrics_register() {
        let registry = prometheus::Registry::new();
        for metric in all_metrics() {
            registry.register(metric).unwrap();
        }
        CONVERSIONS_TOTAL
            .with_label_values(&["image", "search", "success"])
            .inc();
        let families = registry.gather();
        assert!(families
            .iter()
            .any(|f| f.get_name() == "sizefit_conversions_total"));
    }
}
