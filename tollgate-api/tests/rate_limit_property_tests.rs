//! Property-based tests for per-endpoint rate limiting over HTTP
//!
//! **Property: each (client, endpoint) pair gets exactly its budget**
//!
//! For any per-minute limit and any interleaving of clients hitting the
//! list endpoint within one window, a client's first `limit` requests
//! succeed and every later one is answered with 429. Clients are told apart
//! by `X-Forwarded-For`, so the router trusts proxy headers here.

use std::collections::HashMap;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
};
use proptest::prelude::*;
use tokio::runtime::Runtime;
use tollgate_api::{memory_app_with, ApiConfig};
use tollgate_test_utils::fixtures::per_minute_policy;
use tower::ServiceExt; // for `oneshot`

fn test_runtime() -> Result<Runtime, TestCaseError> {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .map_err(|e| TestCaseError::fail(format!("Failed to create runtime: {}", e)))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_each_client_gets_its_budget(
        limit in 1u32..=5,
        clients in prop::collection::vec(0u8..3, 1..20),
    ) {
        let rt = test_runtime()?;
        rt.block_on(async {
            let app = memory_app_with(ApiConfig {
                rate_limit: per_minute_policy(limit),
                trust_proxy_headers: true,
                ..ApiConfig::default()
            });
            let mut seen: HashMap<u8, u32> = HashMap::new();

            for client in clients {
                let req = Request::builder()
                    .method(Method::GET)
                    .uri("/api/v1/departments")
                    .header("x-forwarded-for", format!("192.0.2.{}", client))
                    .body(Body::empty())
                    .map_err(|e| TestCaseError::fail(e.to_string()))?;
                let response = app
                    .clone()
                    .oneshot(req)
                    .await
                    .map_err(|e| TestCaseError::fail(format!("{:?}", e)))?;

                let count = seen.entry(client).or_insert(0);
                *count += 1;
                let expected = if *count <= limit {
                    StatusCode::OK
                } else {
                    StatusCode::TOO_MANY_REQUESTS
                };
                prop_assert_eq!(response.status(), expected);
            }
            Ok::<(), TestCaseError>(())
        })?;
    }
}
