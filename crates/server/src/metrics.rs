//! Prometheus metrics for observability.
//!
//! The registry carries the pipeline metrics defined in
//! `sketchloop_core::metrics` plus HTTP request metrics recorded by
//! [`metrics_middleware`](crate::api::middleware::metrics_middleware).

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

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
            "sketchloop_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.005, 0.05, 0.25, 1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("sketchloop_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "sketchloop_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

// =============================================================================
// Renderer Metrics
// =============================================================================

/// 1 while a render job holds the admission slot (collected dynamically).
pub static RENDERER_BUSY: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "sketchloop_renderer_busy",
        "Whether a render job is currently running",
    )
    .unwrap()
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

    // Renderer
    registry.register(Box::new(RENDERER_BUSY.clone())).unwrap();

    // Pipeline
    for metric in sketchloop_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics in Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}

/// Collect dynamic metrics from current application state.
pub fn collect_dynamic_metrics(state: &crate::state::AppState) {
    RENDERER_BUSY.set(if state.render().is_busy() { 1 } else { 0 });
}

/// Normalize a path for metrics labels so job ids don't explode cardinality.
///
/// Example: `/api/render/0b5c...-...` -> `/api/render/{id}`
pub fn normalize_path(path: &str) -> String {
    let uuid_regex = regex_lite::Regex::new(
        r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}",
    )
    .unwrap();

    let result = uuid_regex.replace_all(path, "{id}");
    if result.starts_with("/files/") {
        return "/files/{file}".to_string();
    }
    result.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path_replaces_job_ids() {
        assert_eq!(
            normalize_path("/api/render/550e8400-e29b-41d4-a716-446655440000"),
            "/api/render/{id}"
        );
        assert_eq!(normalize_path("/api/renders"), "/api/renders");
        assert_eq!(normalize_path("/api/health"), "/api/health");
    }

    #[test]
    fn test_normalize_path_collapses_static_files() {
        assert_eq!(
            normalize_path("/files/outputs/550e8400-e29b-41d4-a716-446655440000.webp"),
            "/files/{file}"
        );
    }

    #[test]
    fn test_encode_metrics_includes_pipeline_metrics() {
        sketchloop_core::metrics::BUSY_REJECTIONS.inc();
        let text = encode_metrics();
        assert!(text.contains("sketchloop_busy_rejections_total"));
    }
}
