//! Tollgate API - REST Layer
//!
//! Department CRUD over a cache-aside store, with every endpoint guarded by a
//! per-client fixed-window rate limiter. Responses share one JSON envelope;
//! failures map to HTTP status codes through [`ApiError`].

pub mod config;
pub mod constants;
pub mod error;
mod macros;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod server;
pub mod state;
pub mod telemetry;
pub mod types;

// Re-export commonly used types
pub use config::{ApiConfig, StoreBackend};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use middleware::{rate_limit_middleware, RateLimitState};
pub use openapi::ApiDoc;
pub use routes::{create_api_router, memory_app, memory_app_with};
pub use state::AppState;
pub use types::{ApiResponse, SaveDepartmentRequest, UpdateDepartmentRequest};
