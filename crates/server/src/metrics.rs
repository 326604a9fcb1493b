//! Prometheus metrics for the HTTP surface.
//!
//! The registry combines the server metrics below with the conversion and
//! job metrics exported by `sizefit_core::metrics`:
//! - HTTP request metrics (latency, counts, in flight)
//! - Upload sizes
//! - Job pool and event store gauges (collected on scrape)

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, Histogram, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts,
    Registry, TextEncoder,
};
use regex_lite::Regex;

use crate::state::AppState;

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "sizefit_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 30.0, 120.0, 300.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("sizefit_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "sizefit_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

// =============================================================================
// Upload Metrics
// =============================================================================

/// Size of accepted uploads in bytes.
pub static UPLOAD_BYTES: Lazy<Histogram> = Lazy::new(|| {
    Histogram::with_opts(
        HistogramOpts::new("sizefit_upload_bytes", "Size of accepted uploads in bytes").buckets(
            vec![
                10_240.0,
                102_400.0,
                1_048_576.0,
                10_485_760.0,
                104_857_600.0,
                1_073_741_824.0,
            ],
        ),
    )
    .unwrap()
});

// =============================================================================
// Dynamic gauges
// =============================================================================

/// Jobs waiting for a worker slot.
pub static JOBS_QUEUED: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("sizefit_jobs_queued", "Jobs waiting for a worker slot").unwrap()
});

/// Events held by the in-memory event store.
pub static EVENTS_STORED: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("sizefit_events_stored", "Conversion events held in memory").unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    // HTTP
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()))
        .unwrap();

    // Uploads
    registry.register(Box::new(UPLOAD_BYTES.clone())).unwrap();

    // Dynamic
    registry.register(Box::new(JOBS_QUEUED.clone())).unwrap();
    registry.register(Box::new(EVENTS_STORED.clone())).unwrap();

    // Core metrics (conversions, search, jobs)
    for metric in sizefit_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::warn!(error = %e, "Failed to encode metrics");
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Refresh gauges that mirror application state.
pub fn collect_dynamic_metrics(state: &AppState) {
    let status = state.jobs().pool_status();
    JOBS_QUEUED.set(status.queued_jobs as i64);
    EVENTS_STORED.set(state.event_store().len() as i64);
}

static UUID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}")
        .unwrap()
});
static DOWNLOAD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"/download/[^/]+$").unwrap());
static NUMERIC_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"/\d+(/|$)").unwrap());

/// Normalize a path for metric labels (replace IDs and file names with placeholders).
pub fn normalize_path(path: &str) -> String {
    let result = UUID_RE.replace_all(path, "{id}");
    let result = DOWNLOAD_RE.replace_all(&result, "/download/{filename}");
    let result = NUMERIC_RE.replace_all(&result, "/{id}$1");
    result.to_string()
}
