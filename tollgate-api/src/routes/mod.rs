//! REST API Routes Module
//!
//! Includes:
//! - Department CRUD routes, rate limited per client and endpoint
//! - Health check endpoints
//! - Prometheus metrics and the OpenAPI document
//! - CORS support for browser-based clients

pub mod department;
pub mod health;

use std::time::Duration;

use axum::{
    handler::Handler,
    http::{header, header::HeaderName, HeaderValue, Method, StatusCode},
    middleware::from_fn,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use tollgate_core::RateLimitPolicy;
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;

use crate::config::ApiConfig;
use crate::openapi::ApiDoc;
use crate::state::AppState;
use crate::telemetry::{metrics_handler, observability_middleware};

pub use department::create_router as department_router;
pub use health::create_router as health_router;

// ============================================================================
// OPENAPI ENDPOINT
// ============================================================================

/// Handler for /openapi.json endpoint.
async fn openapi_json() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}

/// Fallback for requests that match no route.
async fn unmatched_route() -> StatusCode {
    StatusCode::NOT_FOUND
}

// ============================================================================
// CORS LAYER
// ============================================================================

/// Build the CORS layer from ApiConfig.
///
/// With no configured origins every origin is allowed.
fn build_cors_layer(config: &ApiConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([HeaderName::from_static("retry-after")])
        .max_age(Duration::from_secs(config.cors_max_age_secs));

    if config.cors_origins.is_empty() {
        tracing::info!("CORS: allowing all origins");
        cors.allow_origin(Any)
    } else {
        tracing::info!(origins = ?config.cors_origins, "CORS: restricting origins");
        let origins: Vec<HeaderValue> = config
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        cors.allow_origin(origins)
    }
}

// ============================================================================
// ROUTER
// ============================================================================

/// Create the complete API router.
///
/// - Department routes under /api/v1/departments (rate limited)
/// - Health checks at /health/*
/// - Metrics at /metrics
/// - OpenAPI spec at /openapi.json
///
/// # Middleware Order (outer to inner)
/// 1. CORS - handles preflight requests
/// 2. Observability - tracing and metrics, labelled by route template
/// 3. Rate Limiting - department routes only, before the handler
///
/// Observability is a route layer so the matched template is known; the
/// fallback carries its own copy and is labelled `unmatched`.
///
/// `config.trust_proxy_headers` overrides the flag carried by `state`.
pub fn create_api_router(state: AppState, config: &ApiConfig) -> Router {
    let state = state.with_trust_proxy_headers(config.trust_proxy_headers);

    Router::new()
        .merge(department::create_router(&state))
        .nest("/health", health::create_router())
        .route("/metrics", get(metrics_handler))
        .route("/openapi.json", get(openapi_json))
        .route_layer(from_fn(observability_middleware))
        .fallback(unmatched_route.layer(from_fn(observability_middleware)))
        .with_state(state)
        .layer(build_cors_layer(config))
}

/// Full router over fresh in-process stores.
///
/// Clients are identified by the socket peer, as in production defaults.
pub fn memory_app(policy: RateLimitPolicy) -> Router {
    memory_app_with(ApiConfig {
        rate_limit: policy,
        ..ApiConfig::default()
    })
}

/// Full router over fresh in-process stores with an explicit configuration.
pub fn memory_app_with(config: ApiConfig) -> Router {
    create_api_router(AppState::in_memory(config.rate_limit.clone()), &config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use tower::ServiceExt; // for `oneshot`

    async fn preflight(config: ApiConfig, origin: &str) -> Result<Option<String>, String> {
        let app = memory_app_with(config);
        let req = axum::http::Request::builder()
            .method(Method::OPTIONS)
            .uri("/api/v1/departments")
            .header(header::ORIGIN, origin)
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .body(Body::empty())
            .map_err(|e| e.to_string())?;
        let response = app.oneshot(req).await.map_err(|e| format!("{:?}", e))?;
        assert!(response.status().is_success());
        Ok(response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string))
    }

    fn restricted() -> ApiConfig {
        ApiConfig {
            cors_origins: vec!["https://app.example".to_string()],
            ..ApiConfig::default()
        }
    }

    #[tokio::test]
    async fn test_preflight_allows_any_origin_by_default() -> Result<(), String> {
        let allowed = preflight(ApiConfig::default(), "https://anywhere.example").await?;
        assert_eq!(allowed.as_deref(), Some("*"));
        Ok(())
    }

    #[tokio::test]
    async fn test_preflight_echoes_configured_origin() -> Result<(), String> {
        let allowed = preflight(restricted(), "https://app.example").await?;
        assert_eq!(allowed.as_deref(), Some("https://app.example"));
        Ok(())
    }

    #[tokio::test]
    async fn test_preflight_omits_header_for_other_origins() -> Result<(), String> {
        let allowed = preflight(restricted(), "https://evil.example").await?;
        assert_eq!(allowed, None);
        Ok(())
    }
}
