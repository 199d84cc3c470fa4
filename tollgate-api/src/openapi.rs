//! OpenAPI Specification for the Tollgate API
//!
//! Generated with utoipa from the route annotations and request/response
//! types, served at `/openapi.json`.

use utoipa::OpenApi;

use crate::error::{ApiError, ErrorCode};
use crate::routes::{department, health};
use crate::telemetry::metrics;
use crate::types::{SaveDepartmentRequest, UpdateDepartmentRequest};

use tollgate_core::{Department, DepartmentPatch};

/// OpenAPI document for the Tollgate API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Tollgate API",
        version = "0.1.0",
        description = "Rate-limited department service with a cache-aside store",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "http://localhost:8080", description = "Local Development")
    ),
    tags(
        (name = "Departments", description = "Department CRUD, rate limited per client and endpoint"),
        (name = "Health", description = "Liveness checks and cache statistics"),
        (name = "Observability", description = "Prometheus metrics")
    ),
    paths(
        department::save_department,
        department::find_all_departments,
        department::find_department_by_id,
        department::update_department,
        department::delete_department,
        health::ping,
        health::liveness,
        metrics::metrics_handler,
    ),
    components(
        schemas(
            ApiError, ErrorCode,
            Department, DepartmentPatch,
            SaveDepartmentRequest, UpdateDepartmentRequest,
            health::HealthResponse, health::HealthStatus, health::CacheReport,
        )
    )
)]
pub struct ApiDoc;

impl ApiDoc {
    /// Generate OpenAPI spec as JSON string.
    pub fn to_json() -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&Self::openapi())
    }
}
