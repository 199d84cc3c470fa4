//! Health Check Endpoints
//!
//! - /health/ping - Simple liveness check
//! - /health/live - Process alive check with cache statistics
//!
//! Health endpoints are not rate limited.

use std::time::Instant;

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use tollgate_storage::{CacheStats, EntityCache};

use crate::state::{AppState, DepartmentCache};

// ============================================================================
// TYPES
// ============================================================================

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    pub uptime_seconds: u64,
    pub cache: CacheReport,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
}

/// Department cache counters since process start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct CacheReport {
    pub hits: u64,
    pub misses: u64,
    pub list_hits: u64,
    pub list_misses: u64,
    pub list_rebuilds: u64,
    /// Fraction of lookups served from the cache, 0.0 to 1.0
    pub hit_rate: f64,
}

impl From<CacheStats> for CacheReport {
    fn from(stats: CacheStats) -> Self {
        Self {
            hits: stats.hits,
            misses: stats.misses,
            list_hits: stats.list_hits,
            list_misses: stats.list_misses,
            list_rebuilds: stats.list_rebuilds,
            hit_rate: stats.hit_rate(),
        }
    }
}

// ============================================================================
// HANDLERS
// ============================================================================

/// GET /health/ping - Simple pong response
#[utoipa::path(
    get,
    path = "/health/ping",
    tag = "Health",
    responses(
        (status = 200, description = "Service is responding", body = String),
    ),
)]
pub async fn ping() -> impl IntoResponse {
    (StatusCode::OK, "pong")
}

/// GET /health/live - Process liveness check
#[utoipa::path(
    get,
    path = "/health/live",
    tag = "Health",
    responses(
        (status = 200, description = "Process is alive", body = HealthResponse),
    ),
)]
pub async fn liveness(
    State(departments): State<DepartmentCache>,
    State(start_time): State<Instant>,
) -> impl IntoResponse {
    let response = HealthResponse {
        status: HealthStatus::Healthy,
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: start_time.elapsed().as_secs(),
        cache: departments.stats().into(),
    };
    (StatusCode::OK, Json(response))
}

// ============================================================================
// ROUTER
// ============================================================================

/// Create health check router, nested under `/health`.
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/ping", get(ping))
        .route("/live", get(liveness))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_response_serialization() {
        let response = HealthResponse {
            status: HealthStatus::Healthy,
            version: "0.1.0".to_string(),
            uptime_seconds: 3600,
            cache: CacheStats::default().into(),
        };

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"status\":\"healthy\""));
        assert!(json.contains("\"uptime_seconds\":3600"));
        assert!(json.contains("\"hit_rate\":0.0"));
    }

    #[test]
    fn test_cache_report_carries_hit_rate() {
        let stats = CacheStats {
            hits: 3,
            misses: 1,
            list_hits: 0,
            list_misses: 0,
            list_rebuilds: 2,
        };
        let report = CacheReport::from(stats);
        assert_eq!(report.list_rebuilds, 2);
        assert!((report.hit_rate - 0.75).abs() < f64::EPSILON);
    }
}
