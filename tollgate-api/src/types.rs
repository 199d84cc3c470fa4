//! API Request and Response Types
//!
//! Every response body, success or failure, is wrapped in [`ApiResponse`].
//! Request bodies use optional fields so a missing field is reported as
//! `MISSING_FIELD` instead of a generic deserialization failure.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tollgate_core::{Department, DepartmentPatch, Timestamp, UserId};

use crate::error::{ApiError, ApiResult};

// ============================================================================
// RESPONSE ENVELOPE
// ============================================================================

/// Response envelope shared by every department endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    /// HTTP status code, repeated in the body
    pub status_code: u16,
    /// Time the response was produced
    #[schema(value_type = String, format = "date-time")]
    pub timestamp: DateTime<Utc>,
    pub message: String,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn new(status: StatusCode, message: impl Into<String>, data: Option<T>) -> Self {
        Self {
            status_code: status.as_u16(),
            timestamp: Utc::now(),
            message: message.into(),
            data,
        }
    }

    /// 200 with a payload.
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self::new(StatusCode::OK, message, Some(data))
    }

    /// 201 with a payload.
    pub fn created(message: impl Into<String>, data: T) -> Self {
        Self::new(StatusCode::CREATED, message, Some(data))
    }

    /// Status carried by the envelope.
    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl ApiResponse<()> {
    /// Envelope with `"data": null`.
    pub fn empty(status: StatusCode, message: impl Into<String>) -> Self {
        Self::new(status, message, None)
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

// ============================================================================
// DEPARTMENT REQUESTS
// ============================================================================

/// Request to create a department.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SaveDepartmentRequest {
    /// Department identifier (at most 4 characters)
    pub id: Option<String>,
    /// Unique department name (at most 40 characters)
    pub dept_name: Option<String>,
    #[serde(default)]
    pub active: bool,
    pub created_by: Option<UserId>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub created_date: Option<Timestamp>,
    pub updated_by: Option<UserId>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub updated_date: Option<Timestamp>,
}

impl SaveDepartmentRequest {
    /// Check required fields and build the entity.
    pub fn into_department(self) -> ApiResult<Department> {
        let id = required_text("id", self.id)?;
        let name = required_text("deptName", self.dept_name)?;
        let created_by = required("createdBy", self.created_by)?;
        let created_date = required("createdDate", self.created_date)?;
        let updated_by = required("updatedBy", self.updated_by)?;
        let updated_date = required("updatedDate", self.updated_date)?;

        let mut department = Department::new(id, name, self.active, created_by, created_date);
        department.updated_by = updated_by;
        department.updated_date = updated_date;
        Ok(department)
    }
}

/// Request to update a department. The id comes from the path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDepartmentRequest {
    pub dept_name: Option<String>,
    #[serde(default)]
    pub active: bool,
    pub updated_by: Option<UserId>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub updated_date: Option<Timestamp>,
}

impl UpdateDepartmentRequest {
    pub fn into_patch(self) -> ApiResult<DepartmentPatch> {
        Ok(DepartmentPatch {
            name: required_text("deptName", self.dept_name)?,
            active: self.active,
            updated_by: required("updatedBy", self.updated_by)?,
            updated_date: required("updatedDate", self.updated_date)?,
        })
    }
}

fn required<T>(field: &str, value: Option<T>) -> ApiResult<T> {
    value.ok_or_else(|| ApiError::missing_field(field))
}

fn required_text(field: &str, value: Option<String>) -> ApiResult<String> {
    match value {
        Some(text) if !text.trim().is_empty() => Ok(text),
        _ => Err(ApiError::missing_field(field)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use chrono::NaiveDate;

    fn at() -> Timestamp {
        NaiveDate::from_ymd_opt(2024, 1, 15)
            .and_then(|d| d.and_hms_opt(9, 0, 0))
            .unwrap()
    }

    fn full_request() -> SaveDepartmentRequest {
        SaveDepartmentRequest {
            id: Some("D001".to_string()),
            dept_name: Some("Engineering".to_string()),
            active: true,
            created_by: Some(1),
            created_date: Some(at()),
            updated_by: Some(1),
            updated_date: Some(at()),
        }
    }

    #[test]
    fn test_save_request_from_wire_names() -> Result<(), serde_json::Error> {
        let req: SaveDepartmentRequest = serde_json::from_str(
            r#"{"id":"D001","deptName":"Engineering","active":true,
                "createdBy":1,"createdDate":"2024-01-15T09:00:00",
                "updatedBy":1,"updatedDate":"2024-01-15T09:00:00"}"#,
        )?;
        assert_eq!(req, full_request());
        Ok(())
    }

    #[test]
    fn test_save_request_builds_department() {
        let dept = full_request().into_department().unwrap();
        assert_eq!(dept.id, "D001");
        assert_eq!(dept.name, "Engineering");
        assert!(dept.active);
        assert_eq!(dept.updated_date, at());
    }

    #[test]
    fn test_blank_name_is_missing() {
        let req = SaveDepartmentRequest {
            dept_name: Some("   ".to_string()),
            ..full_request()
        };
        let err = req.into_department().unwrap_err();
        assert_eq!(err.code, ErrorCode::MissingField);
        assert!(err.message.contains("deptName"));
    }

    #[test]
    fn test_missing_audit_field() {
        let req = SaveDepartmentRequest {
            created_date: None,
            ..full_request()
        };
        let err = req.into_department().unwrap_err();
        assert!(err.message.contains("createdDate"));
    }

    #[test]
    fn test_active_defaults_to_false() -> Result<(), serde_json::Error> {
        let req: UpdateDepartmentRequest = serde_json::from_str(
            r#"{"deptName":"Platform","updatedBy":2,"updatedDate":"2024-02-01T10:30:00"}"#,
        )?;
        let patch = req.into_patch().unwrap();
        assert!(!patch.active);
        assert_eq!(patch.name, "Platform");
        assert_eq!(patch.updated_by, 2);
        Ok(())
    }

    #[test]
    fn test_envelope_serialization() -> Result<(), serde_json::Error> {
        let body = ApiResponse::empty(StatusCode::TOO_MANY_REQUESTS, "Too many requests");
        let json = serde_json::to_value(&body)?;
        assert_eq!(json["statusCode"], 429);
        assert_eq!(json["message"], "Too many requests");
        assert!(json["data"].is_null());
        assert!(json["timestamp"].is_string());
        Ok(())
    }
}
