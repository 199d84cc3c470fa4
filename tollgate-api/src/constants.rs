//! Constants for the Tollgate API
//!
//! Route paths and the fixed response messages clients match on.

use tollgate_core::Endpoint;

// ============================================================================
// ROUTES
// ============================================================================

/// Department collection path.
pub const DEPARTMENTS_PATH: &str = "/api/v1/departments";

/// Single department path (axum 0.7 capture syntax).
pub const DEPARTMENT_PATH: &str = "/api/v1/departments/:id";

// ============================================================================
// SERVER
// ============================================================================

/// Default bind host.
pub const DEFAULT_BIND_HOST: &str = "0.0.0.0";

/// Default listen port.
pub const DEFAULT_PORT: u16 = 8080;

/// Default CORS max age in seconds (24 hours)
pub const DEFAULT_CORS_MAX_AGE_SECS: u64 = 86400;

// ============================================================================
// RESPONSE MESSAGES
// ============================================================================

pub const MSG_SAVED: &str = "Department saved successfully";
pub const MSG_LISTED: &str = "Departments retrieved successfully";
pub const MSG_RETRIEVED: &str = "Department retrieved successfully";
pub const MSG_UPDATED: &str = "Department updated successfully";
pub const MSG_DELETED: &str = "Department deleted successfully";

/// Message of every 429 response.
pub const MSG_TOO_MANY_REQUESTS: &str = "Too many requests";

/// Message of a failed request, by endpoint. The underlying reason goes
/// into the response data.
pub fn failure_message(endpoint: Endpoint) -> &'static str {
    match endpoint {
        Endpoint::SaveDepartment => "An error occurred while saving department",
        Endpoint::FindAllDepartments => "An error occurred while retrieving departments",
        Endpoint::FindDepartmentById => "An error occurred while retrieving department",
        Endpoint::UpdateDepartment => "An error occurred while updating department",
        Endpoint::DeleteDepartment => "An error occurred while deleting department",
    }
}
