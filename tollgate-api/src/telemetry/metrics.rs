//! Prometheus Metrics Definitions
//!
//! Defines the Tollgate metrics with their labels and exposes a /metrics
//! endpoint for Prometheus scraping.

use axum::{http::StatusCode, response::IntoResponse};
use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, Encoder, HistogramVec, TextEncoder,
};
use tollgate_core::Endpoint;

use crate::error::{ApiError, ApiResult};

/// HTTP request latency buckets (seconds)
/// Covers: 1ms, 5ms, 10ms, 25ms, 50ms, 100ms, 250ms, 500ms, 1s, 2.5s, 5s, 10s
const HTTP_LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0, 2.5, 5.0, 10.0,
];

/// Global metrics instance - registered once, on first use
pub static METRICS: Lazy<ApiResult<TollgateMetrics>> = Lazy::new(TollgateMetrics::new);

/// The registered metrics, or `None` if registration failed.
pub fn metrics() -> Option<&'static TollgateMetrics> {
    METRICS.as_ref().ok()
}

/// Container for all Tollgate metrics.
#[derive(Clone)]
pub struct TollgateMetrics {
    /// HTTP request counter - labels: method, path, status
    pub http_requests_total: CounterVec,

    /// HTTP request duration histogram - labels: method, path
    pub http_request_duration_seconds: HistogramVec,

    /// Rate limiter decisions - labels: endpoint, outcome (allowed/denied/error)
    pub rate_limit_decisions_total: CounterVec,
}

impl TollgateMetrics {
    /// Create and register all metrics with Prometheus.
    pub fn new() -> ApiResult<Self> {
        Ok(Self {
            http_requests_total: register_counter_vec!(
                "tollgate_http_requests_total",
                "Total number of HTTP requests",
                &["method", "path", "status"]
            )
            .map_err(|e| registration_failed("http_requests_total", e))?,

            http_request_duration_seconds: register_histogram_vec!(
                "tollgate_http_request_duration_seconds",
                "HTTP request duration in seconds",
                &["method", "path"],
                HTTP_LATENCY_BUCKETS.to_vec()
            )
            .map_err(|e| registration_failed("http_request_duration_seconds", e))?,

            rate_limit_decisions_total: register_counter_vec!(
                "tollgate_rate_limit_decisions_total",
                "Rate limiter decisions per endpoint",
                &["endpoint", "outcome"]
            )
            .map_err(|e| registration_failed("rate_limit_decisions_total", e))?,
        })
    }

    /// Record an HTTP request.
    pub fn record_http_request(&self, method: &str, path: &str, status: u16, duration_secs: f64) {
        let status_str = status.to_string();
        self.http_requests_total
            .with_label_values(&[method, path, &status_str])
            .inc();
        self.http_request_duration_seconds
            .with_label_values(&[method, path])
            .observe(duration_secs);
    }

    /// Record one limiter decision.
    pub fn record_rate_limit(&self, endpoint: Endpoint, outcome: RateLimitOutcome) {
        self.rate_limit_decisions_total
            .with_label_values(&[endpoint.as_str(), outcome.as_str()])
            .inc();
    }
}

/// Result of a limiter check, as a metric label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitOutcome {
    Allowed,
    Denied,
    Error,
}

impl RateLimitOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            RateLimitOutcome::Allowed => "allowed",
            RateLimitOutcome::Denied => "denied",
            RateLimitOutcome::Error => "error",
        }
    }
}

fn registration_failed(name: &str, err: prometheus::Error) -> ApiError {
    ApiError::internal_error(format!("Failed to register {}: {}", name, err))
}

/// Handler for GET /metrics endpoint.
///
/// Returns Prometheus text format metrics.
#[utoipa::path(
    get,
    path = "/metrics",
    tag = "Observability",
    responses(
        (status = 200, description = "Prometheus metrics in text format", content_type = "text/plain"),
        (status = 500, description = "Failed to encode metrics"),
    ),
)]
pub async fn metrics_handler() -> impl IntoResponse {
    // Touch the registry so the series exist before the first request.
    let _ = metrics();

    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    match encoder.encode(&metric_families, &mut buffer) {
        Ok(_) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("content-type", "text/plain")],
                format!("Failed to encode metrics: {}", e).into_bytes(),
            )
        }
    }
}
