//! Per-endpoint rate limiting middleware.
//!
//! Each department route has its own fixed-window budget per client. The
//! limiter key is the client address followed by the endpoint suffix, e.g.
//! `203.0.113.7.save-department`. The check runs before the handler, so a
//! denied request never reaches the stores.
//!
//! Clients are identified by the socket peer. Proxy headers are honoured
//! only when `trust_proxy_headers` is set, since any client can forge them.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, MatchedPath, Request, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tollgate_core::{Endpoint, RateLimitPolicy};

use crate::constants::{failure_message, DEPARTMENTS_PATH, DEPARTMENT_PATH, MSG_TOO_MANY_REQUESTS};
use crate::error::ApiError;
use crate::state::{AppState, SharedRateLimiter};
use crate::telemetry::metrics::{metrics, RateLimitOutcome};
use crate::types::ApiResponse;

/// Client identifier used when no address can be determined.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// State for rate limiting middleware.
#[derive(Clone)]
pub struct RateLimitState {
    limiter: SharedRateLimiter,
    policy: Arc<RateLimitPolicy>,
    trust_proxy_headers: bool,
}

impl RateLimitState {
    pub fn new(limiter: SharedRateLimiter, policy: Arc<RateLimitPolicy>) -> Self {
        Self {
            limiter,
            policy,
            trust_proxy_headers: false,
        }
    }

    pub fn with_trust_proxy_headers(mut self, trust: bool) -> Self {
        self.trust_proxy_headers = trust;
        self
    }

    pub fn policy(&self) -> &RateLimitPolicy {
        &self.policy
    }
}

impl From<&AppState> for RateLimitState {
    fn from(state: &AppState) -> Self {
        Self::new(Arc::clone(&state.limiter), Arc::clone(&state.policy))
            .with_trust_proxy_headers(state.trust_proxy_headers)
    }
}

/// Rejection for a request over its budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitError {
    /// Seconds until the window can have reset
    pub retry_after: u64,
}

impl IntoResponse for RateLimitError {
    fn into_response(self) -> Response {
        let mut response =
            ApiResponse::empty(StatusCode::TOO_MANY_REQUESTS, MSG_TOO_MANY_REQUESTS)
                .into_response();
        response.headers_mut().insert(
            header::RETRY_AFTER,
            HeaderValue::from_str(&self.retry_after.to_string())
                .unwrap_or_else(|_| HeaderValue::from_static("60")),
        );
        response
    }
}

/// Map a request to the rate-limited operation it invokes.
///
/// `matched_path` is the route template, not the concrete URI.
pub fn classify(method: &Method, matched_path: &str) -> Option<Endpoint> {
    if matched_path == DEPARTMENTS_PATH {
        if method == Method::POST {
            Some(Endpoint::SaveDepartment)
        } else if method == Method::GET {
            Some(Endpoint::FindAllDepartments)
        } else {
            None
        }
    } else if matched_path == DEPARTMENT_PATH {
        if method == Method::GET {
            Some(Endpoint::FindDepartmentById)
        } else if method == Method::PUT {
            Some(Endpoint::UpdateDepartment)
        } else if method == Method::DELETE {
            Some(Endpoint::DeleteDepartment)
        } else {
            None
        }
    } else {
        None
    }
}

/// Extract the client address.
///
/// Without `trust_proxy_headers` only the socket peer counts. With it the
/// order is: first `X-Forwarded-For` entry, `X-Real-IP`, then the peer.
pub fn extract_client_ip(
    headers: &HeaderMap,
    peer: Option<SocketAddr>,
    trust_proxy_headers: bool,
) -> String {
    if trust_proxy_headers {
        if let Some(ip) = forwarded_ip(headers) {
            return ip.to_string();
        }
    }

    peer.map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

fn forwarded_ip(headers: &HeaderMap) -> Option<IpAddr> {
    // X-Forwarded-For can contain multiple IPs, take the first one
    if let Some(ip) = headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|value| value.split(',').next())
        .and_then(|first| first.trim().parse::<IpAddr>().ok())
    {
        return Some(ip);
    }

    headers
        .get("x-real-ip")
        .and_then(|h| h.to_str().ok())
        .and_then(|value| value.trim().parse::<IpAddr>().ok())
}

/// Rate limiting middleware.
///
/// Must be installed with `route_layer` so the matched route is known.
/// Requests to routes that are not rate limited, and every request when the
/// policy is disabled, pass straight through. A limiter failure fails the
/// request with 500 and the handler is not run.
pub async fn rate_limit_middleware(
    State(state): State<RateLimitState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    request: Request,
    next: Next,
) -> Response {
    if !state.policy.enabled {
        return next.run(request).await;
    }

    let endpoint = request
        .extensions()
        .get::<MatchedPath>()
        .and_then(|path| classify(request.method(), path.as_str()));
    let Some(endpoint) = endpoint else {
        return next.run(request).await;
    };

    let rule = *state.policy.rule(endpoint);
    let peer = connect_info.map(|ConnectInfo(addr)| addr);
    let client = extract_client_ip(request.headers(), peer, state.trust_proxy_headers);
    let key = endpoint.limiter_key(&client);

    match state.limiter.check(&key, &rule).await {
        Ok(true) => {
            record(endpoint, RateLimitOutcome::Allowed);
            tracing::debug!(%endpoint, client = %client, "Rate limit check passed");
            next.run(request).await
        }
        Ok(false) => {
            record(endpoint, RateLimitOutcome::Denied);
            tracing::warn!(
                %endpoint,
                client = %client,
                max_requests = rule.max_requests,
                window_secs = rule.window_secs(),
                "Rate limit exceeded"
            );
            RateLimitError {
                retry_after: rule.window_secs(),
            }
            .into_response()
        }
        Err(err) => {
            record(endpoint, RateLimitOutcome::Error);
            tracing::error!(%endpoint, key = %key, error = %err, "Rate limiter failed");
            ApiError::from(err)
                .during(failure_message(endpoint))
                .into_response()
        }
    }
}

fn record(endpoint: Endpoint, outcome: RateLimitOutcome) {
    if let Some(metrics) = metrics() {
        metrics.record_rate_limit(endpoint, outcome);
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        extract::connect_info::MockConnectInfo,
        middleware,
        routing::get,
        Router,
    };
    use std::time::Duration;
    use tollgate_core::RateLimitRule;
    use tollgate_storage::{FixedWindowRateLimiter, InMemoryKeyValueStore, KeyValueStore};
    use tollgate_test_utils::{FaultyKeyValueStore, KvOp};
    use tower::ServiceExt; // for `oneshot`

    fn policy(max_requests: u32) -> Arc<RateLimitPolicy> {
        Arc::new(RateLimitPolicy::uniform(RateLimitRule::new(
            max_requests,
            Duration::from_secs(60),
        )))
    }

    fn test_app(store: Arc<dyn KeyValueStore>, policy: Arc<RateLimitPolicy>) -> Router {
        proxied_app(store, policy, false)
    }

    fn proxied_app(
        store: Arc<dyn KeyValueStore>,
        policy: Arc<RateLimitPolicy>,
        trust_proxy_headers: bool,
    ) -> Router {
        let limiter: SharedRateLimiter = Arc::new(FixedWindowRateLimiter::new(store));
        let state =
            RateLimitState::new(limiter, policy).with_trust_proxy_headers(trust_proxy_headers);

        Router::new()
            .route(DEPARTMENTS_PATH, get(|| async { "list" }).post(|| async { "saved" }))
            .route(DEPARTMENT_PATH, get(|| async { "one" }))
            .route("/unlimited", get(|| async { "free" }))
            .route_layer(middleware::from_fn_with_state(state, rate_limit_middleware))
            .layer(MockConnectInfo(SocketAddr::from(([10, 0, 0, 1], 4000))))
    }

    fn request(method: Method, uri: &str) -> Result<Request, String> {
        axum::http::Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .map_err(|e| e.to_string())
    }

    async fn send(app: &Router, req: Request) -> Result<Response, String> {
        app.clone()
            .oneshot(req)
            .await
            .map_err(|e| format!("Request failed: {:?}", e))
    }

    #[test]
    fn test_classify_routes() {
        assert_eq!(classify(&Method::POST, DEPARTMENTS_PATH), Some(Endpoint::SaveDepartment));
        assert_eq!(
            classify(&Method::GET, DEPARTMENTS_PATH),
            Some(Endpoint::FindAllDepartments)
        );
        assert_eq!(
            classify(&Method::GET, DEPARTMENT_PATH),
            Some(Endpoint::FindDepartmentById)
        );
        assert_eq!(classify(&Method::PUT, DEPARTMENT_PATH), Some(Endpoint::UpdateDepartment));
        assert_eq!(
            classify(&Method::DELETE, DEPARTMENT_PATH),
            Some(Endpoint::DeleteDepartment)
        );
        assert_eq!(classify(&Method::PATCH, DEPARTMENT_PATH), None);
        assert_eq!(classify(&Method::GET, "/health/live"), None);
    }

    #[test]
    fn test_client_ip_precedence_behind_trusted_proxy() {
        let peer = Some(SocketAddr::from(([10, 0, 0, 1], 80)));
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7, 10.0.0.2"));
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.1"));
        assert_eq!(extract_client_ip(&headers, peer, true), "203.0.113.7");

        headers.remove("x-forwarded-for");
        assert_eq!(extract_client_ip(&headers, peer, true), "198.51.100.1");

        headers.remove("x-real-ip");
        assert_eq!(extract_client_ip(&headers, peer, true), "10.0.0.1");
        assert_eq!(extract_client_ip(&headers, None, true), UNKNOWN_CLIENT);
    }

    #[test]
    fn test_proxy_headers_ignored_by_default() {
        let peer = Some(SocketAddr::from(([10, 0, 0, 1], 80)));
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7"));
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.1"));
        assert_eq!(extract_client_ip(&headers, peer, false), "10.0.0.1");
        assert_eq!(extract_client_ip(&headers, None, false), UNKNOWN_CLIENT);
    }

    #[test]
    fn test_garbage_forwarded_for_is_skipped() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("not-an-ip"));
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.1"));
        assert_eq!(extract_client_ip(&headers, None, true), "198.51.100.1");
    }

    #[tokio::test]
    async fn test_rotating_forwarded_for_shares_peer_budget() -> Result<(), String> {
        let store = Arc::new(InMemoryKeyValueStore::new());
        let app = test_app(store.clone(), policy(5));

        for i in 0..6u8 {
            let req = axum::http::Request::builder()
                .method(Method::GET)
                .uri(DEPARTMENTS_PATH)
                .header("x-forwarded-for", format!("192.0.2.{}", i))
                .header("x-real-ip", format!("198.51.100.{}", i))
                .body(Body::empty())
                .map_err(|e| e.to_string())?;
            let response = send(&app, req).await?;
            let expected = if i < 5 {
                StatusCode::OK
            } else {
                StatusCode::TOO_MANY_REQUESTS
            };
            assert_eq!(response.status(), expected, "request {}", i + 1);
        }

        let counter = store
            .get("rate-limit:10.0.0.1.find-all-departments")
            .await
            .map_err(|e| e.to_string())?;
        assert_eq!(counter.as_deref(), Some("6"));
        Ok(())
    }

    #[tokio::test]
    async fn test_trusted_proxy_splits_budget_by_forwarded_for() -> Result<(), String> {
        let app = proxied_app(Arc::new(InMemoryKeyValueStore::new()), policy(1), true);

        for client in ["192.0.2.1", "192.0.2.2"] {
            let req = axum::http::Request::builder()
                .method(Method::GET)
                .uri(DEPARTMENTS_PATH)
                .header("x-forwarded-for", client)
                .body(Body::empty())
                .map_err(|e| e.to_string())?;
            let response = send(&app, req).await?;
            assert_eq!(response.status(), StatusCode::OK);
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_denied_after_budget_with_retry_after() -> Result<(), String> {
        let store = Arc::new(InMemoryKeyValueStore::new());
        let app = test_app(store.clone(), policy(2));

        for _ in 0..2 {
            let response = send(&app, request(Method::POST, DEPARTMENTS_PATH)?).await?;
            assert_eq!(response.status(), StatusCode::OK);
        }

        let response = send(&app, request(Method::POST, DEPARTMENTS_PATH)?).await?;
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            response.headers().get(header::RETRY_AFTER).and_then(|v| v.to_str().ok()),
            Some("60")
        );

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .map_err(|e| e.to_string())?;
        let json: serde_json::Value =
            serde_json::from_slice(&body).map_err(|e| e.to_string())?;
        assert_eq!(json["statusCode"], 429);
        assert_eq!(json["message"], "Too many requests");
        assert!(json["data"].is_null());

        // Counter key uses the socket address and the endpoint suffix.
        let counter = store
            .get("rate-limit:10.0.0.1.save-department")
            .await
            .map_err(|e| e.to_string())?;
        assert_eq!(counter.as_deref(), Some("3"));
        Ok(())
    }

    #[tokio::test]
    async fn test_endpoints_have_separate_budgets() -> Result<(), String> {
        let app = test_app(Arc::new(InMemoryKeyValueStore::new()), policy(1));

        let first = send(&app, request(Method::POST, DEPARTMENTS_PATH)?).await?;
        let list = send(&app, request(Method::GET, DEPARTMENTS_PATH)?).await?;
        let one = send(&app, request(Method::GET, "/api/v1/departments/D001")?).await?;
        let again = send(&app, request(Method::POST, DEPARTMENTS_PATH)?).await?;

        assert_eq!(first.status(), StatusCode::OK);
        assert_eq!(list.status(), StatusCode::OK);
        assert_eq!(one.status(), StatusCode::OK);
        assert_eq!(again.status(), StatusCode::TOO_MANY_REQUESTS);
        Ok(())
    }

    #[tokio::test]
    async fn test_unclassified_route_is_not_limited() -> Result<(), String> {
        let store = Arc::new(FaultyKeyValueStore::in_memory());
        let app = test_app(store.clone(), policy(1));

        for _ in 0..3 {
            let response = send(&app, request(Method::GET, "/unlimited")?).await?;
            assert_eq!(response.status(), StatusCode::OK);
        }
        assert_eq!(store.total_calls(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_disabled_policy_skips_limiter() -> Result<(), String> {
        let store = Arc::new(FaultyKeyValueStore::in_memory());
        let app = test_app(store.clone(), Arc::new(RateLimitPolicy::disabled()));

        for _ in 0..10 {
            let response = send(&app, request(Method::POST, DEPARTMENTS_PATH)?).await?;
            assert_eq!(response.status(), StatusCode::OK);
        }
        assert_eq!(store.total_calls(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_limiter_failure_is_500_and_skips_handler() -> Result<(), String> {
        let store = Arc::new(FaultyKeyValueStore::in_memory());
        store.fail_on(KvOp::Exists);
        let app = test_app(store, policy(5));

        let response = send(&app, request(Method::GET, DEPARTMENTS_PATH)?).await?;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .map_err(|e| e.to_string())?;
        let json: serde_json::Value =
            serde_json::from_slice(&body).map_err(|e| e.to_string())?;
        assert_eq!(json["message"], "An error occurred while retrieving departments");
        assert_eq!(json["data"]["code"], "STORE_ERROR");
        Ok(())
    }
}
