//! Middleware modules for the Tollgate API
//!
//! - `rate_limit`: per-endpoint fixed-window rate limiting
//!
//! HTTP tracing and metrics live in [`crate::telemetry::middleware`].
//!
//! # Middleware Order
//!
//! When applying middleware, order matters. The order used by the router is:
//!
//! ```ignore
//! Router::new()
//!     .route("/api/v1/departments", post(handler))
//!     // Innermost: only runs for matched routes, so MatchedPath is set
//!     .route_layer(middleware::from_fn_with_state(rate_limit_state, rate_limit_middleware))
//!     // Observability sees MatchedPath and wraps 429 responses
//!     .route_layer(middleware::from_fn(observability_middleware))
//!     .fallback(not_found.layer(middleware::from_fn(observability_middleware)))
//!     // Outermost
//!     .layer(cors)
//! ```

pub mod rate_limit;

pub use rate_limit::{
    classify, extract_client_ip, rate_limit_middleware, RateLimitError, RateLimitState,
};
