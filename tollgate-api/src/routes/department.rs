//! Department REST API Routes
//!
//! CRUD handlers over the department cache. Every route is rate limited per
//! client and endpoint by [`rate_limit_middleware`], which runs before the
//! handler.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    middleware::from_fn_with_state,
    routing::{get, post},
    Json, Router,
};
use tollgate_core::{Department, Endpoint, Entity};
use tollgate_storage::EntityCache;

use crate::{
    constants::{
        failure_message, DEPARTMENTS_PATH, DEPARTMENT_PATH, MSG_DELETED, MSG_LISTED,
        MSG_RETRIEVED, MSG_SAVED, MSG_UPDATED,
    },
    error::{ApiError, ApiResult},
    middleware::{rate_limit_middleware, RateLimitState},
    state::{AppState, DepartmentCache},
    types::{ApiResponse, SaveDepartmentRequest, UpdateDepartmentRequest},
};

/// Attach the endpoint's failure message to an error.
fn failed<E: Into<ApiError>>(endpoint: Endpoint) -> impl FnOnce(E) -> ApiError {
    move |err| err.into().during(failure_message(endpoint))
}

// ============================================================================
// ROUTE HANDLERS
// ============================================================================

/// POST /api/v1/departments - Create a new department
#[utoipa::path(
    post,
    path = "/api/v1/departments",
    tag = "Departments",
    request_body = SaveDepartmentRequest,
    responses(
        (status = 201, description = "Department saved successfully", body = ApiResponse<Department>),
        (status = 400, description = "Missing or invalid field"),
        (status = 429, description = "Too many requests"),
        (status = 500, description = "Duplicate id or store failure"),
    ),
)]
pub async fn save_department(
    State(departments): State<DepartmentCache>,
    payload: Result<Json<SaveDepartmentRequest>, JsonRejection>,
) -> ApiResult<ApiResponse<Department>> {
    let endpoint = Endpoint::SaveDepartment;
    let Json(req) = payload.map_err(failed(endpoint))?;
    let department = req.into_department().map_err(failed(endpoint))?;

    let saved = departments
        .create(department)
        .await
        .map_err(failed(endpoint))?;

    tracing::info!(id = %saved.id, "Department saved");
    Ok(ApiResponse::created(MSG_SAVED, saved))
}

/// GET /api/v1/departments - List every department ordered by id
#[utoipa::path(
    get,
    path = "/api/v1/departments",
    tag = "Departments",
    responses(
        (status = 200, description = "Departments retrieved successfully", body = ApiResponse<Vec<Department>>),
        (status = 429, description = "Too many requests"),
        (status = 500, description = "Store failure"),
    ),
)]
pub async fn find_all_departments(
    State(departments): State<DepartmentCache>,
) -> ApiResult<ApiResponse<Vec<Department>>> {
    let all = departments
        .read_all()
        .await
        .map_err(failed(Endpoint::FindAllDepartments))?;

    Ok(ApiResponse::ok(MSG_LISTED, all))
}

/// GET /api/v1/departments/{id} - Get a department by id
#[utoipa::path(
    get,
    path = "/api/v1/departments/{id}",
    tag = "Departments",
    params(
        ("id" = String, Path, description = "Department id")
    ),
    responses(
        (status = 200, description = "Department retrieved successfully", body = ApiResponse<Department>),
        (status = 404, description = "Department not found"),
        (status = 429, description = "Too many requests"),
        (status = 500, description = "Store failure"),
    ),
)]
pub async fn find_department_by_id(
    State(departments): State<DepartmentCache>,
    Path(id): Path<String>,
) -> ApiResult<ApiResponse<Department>> {
    let endpoint = Endpoint::FindDepartmentById;
    let department = departments
        .read(&id)
        .await
        .map_err(failed(endpoint))?
        .ok_or_else(|| failed(endpoint)(ApiError::entity_not_found(Department::KIND, &id)))?;

    Ok(ApiResponse::ok(MSG_RETRIEVED, department))
}

/// PUT /api/v1/departments/{id} - Update a department
#[utoipa::path(
    put,
    path = "/api/v1/departments/{id}",
    tag = "Departments",
    params(
        ("id" = String, Path, description = "Department id")
    ),
    request_body = UpdateDepartmentRequest,
    responses(
        (status = 200, description = "Department updated successfully", body = ApiResponse<Department>),
        (status = 400, description = "Missing or invalid field"),
        (status = 404, description = "Department not found"),
        (status = 429, description = "Too many requests"),
        (status = 500, description = "Store failure"),
    ),
)]
pub async fn update_department(
    State(departments): State<DepartmentCache>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateDepartmentRequest>, JsonRejection>,
) -> ApiResult<ApiResponse<Department>> {
    let endpoint = Endpoint::UpdateDepartment;
    let Json(req) = payload.map_err(failed(endpoint))?;
    let patch = req.into_patch().map_err(failed(endpoint))?;

    let updated = departments
        .update(&id, patch)
        .await
        .map_err(failed(endpoint))?;

    tracing::info!(id = %updated.id, "Department updated");
    Ok(ApiResponse::ok(MSG_UPDATED, updated))
}

/// DELETE /api/v1/departments/{id} - Delete a department
#[utoipa::path(
    delete,
    path = "/api/v1/departments/{id}",
    tag = "Departments",
    params(
        ("id" = String, Path, description = "Department id")
    ),
    responses(
        (status = 200, description = "Department deleted successfully"),
        (status = 404, description = "Department not found"),
        (status = 429, description = "Too many requests"),
        (status = 500, description = "Store failure"),
    ),
)]
pub async fn delete_department(
    State(departments): State<DepartmentCache>,
    Path(id): Path<String>,
) -> ApiResult<ApiResponse<()>> {
    departments
        .delete(&id)
        .await
        .map_err(failed(Endpoint::DeleteDepartment))?;

    tracing::info!(id = %id, "Department deleted");
    Ok(ApiResponse::empty(StatusCode::OK, MSG_DELETED))
}

// ============================================================================
// ROUTER
// ============================================================================

/// Create the department router with per-endpoint rate limiting.
pub fn create_router(state: &AppState) -> Router<AppState> {
    Router::new()
        .route(
            DEPARTMENTS_PATH,
            post(save_department).get(find_all_departments),
        )
        .route(
            DEPARTMENT_PATH,
            get(find_department_by_id)
                .put(update_department)
                .delete(delete_department),
        )
        .route_layer(from_fn_with_state(
            RateLimitState::from(state),
            rate_limit_middleware,
        ))
}
