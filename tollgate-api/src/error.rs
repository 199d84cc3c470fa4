//! Error Types for the Tollgate API
//!
//! This module defines error handling for the API layer, including:
//! - ApiError struct for structured error responses
//! - ErrorCode enum for categorizing errors
//! - IntoResponse implementation rendering the response envelope
//!
//! Errors are serialized inside the same `{statusCode, timestamp, message,
//! data}` envelope as successful responses, with the error code and any
//! details under `data`.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use tollgate_core::{ConfigError, TollgateError};

use crate::types::ApiResponse;

// ============================================================================
// ERROR CODE ENUM
// ============================================================================

/// Error codes for API responses.
///
/// Each error code maps to a specific HTTP status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // ========================================================================
    // Validation Errors (400)
    // ========================================================================
    /// Request contains invalid input data
    InvalidInput,

    /// Required field is missing from request
    MissingField,

    // ========================================================================
    // Not Found Errors (404)
    // ========================================================================
    /// Requested entity does not exist
    EntityNotFound,

    // ========================================================================
    // Server Errors (500)
    // ========================================================================
    /// Entity with the same identifier already exists (reported as 500)
    EntityAlreadyExists,

    /// Key-value store or record store failure
    StoreError,

    /// Internal server error
    InternalError,
}

impl ErrorCode {
    /// Get the HTTP status code for this error code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::InvalidInput | ErrorCode::MissingField => StatusCode::BAD_REQUEST,

            ErrorCode::EntityNotFound => StatusCode::NOT_FOUND,

            ErrorCode::EntityAlreadyExists
            | ErrorCode::StoreError
            | ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get a default message for this error code.
    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorCode::InvalidInput => "Invalid input data",
            ErrorCode::MissingField => "Required field is missing",
            ErrorCode::EntityNotFound => "Entity not found",
            ErrorCode::EntityAlreadyExists => "Entity already exists",
            ErrorCode::StoreError => "Store operation failed",
            ErrorCode::InternalError => "Internal server error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

// ============================================================================
// API ERROR STRUCT
// ============================================================================

/// Structured error for API operations.
///
/// Returned by every handler and middleware when a request fails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ApiError {
    /// Error code categorizing the error
    pub code: ErrorCode,

    /// Human-readable error message
    pub message: String,

    /// Optional additional details (failure reason, offending field)
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub details: Option<Value>,
}

impl ApiError {
    /// Create a new API error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Create a new API error with the given code, using the default message.
    pub fn from_code(code: ErrorCode) -> Self {
        Self::new(code, code.default_message())
    }

    /// Add additional details to the error.
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        self.code.status_code()
    }

    /// Replace the message with the operation-level one, keeping the
    /// previous message as `details.reason`.
    ///
    /// The status and code are unchanged.
    pub fn during(mut self, operation_message: &str) -> Self {
        let reason = std::mem::replace(&mut self.message, operation_message.to_string());
        let mut details = match self.details.take() {
            Some(Value::Object(map)) => map,
            Some(other) => {
                let mut map = Map::new();
                map.insert("details".to_string(), other);
                map
            }
            None => Map::new(),
        };
        details
            .entry("reason".to_string())
            .or_insert(Value::String(reason));
        self.details = Some(Value::Object(details));
        self
    }

    // ========================================================================
    // Convenience constructors for common errors
    // ========================================================================

    /// Create an InvalidInput error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    /// Create a MissingField error.
    pub fn missing_field(field: &str) -> Self {
        Self::new(
            ErrorCode::MissingField,
            format!("Required field '{}' is missing", field),
        )
        .with_details(serde_json::json!({ "field": field }))
    }

    /// Create an EntityNotFound error.
    pub fn entity_not_found(entity_type: &str, id: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::EntityNotFound,
            format!("{} with id {} does not exist", entity_type, id),
        )
    }

    /// Create an EntityAlreadyExists error.
    pub fn entity_already_exists(entity_type: &str, id: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::EntityAlreadyExists,
            format!("{} with id {} already exists", entity_type, id),
        )
    }

    /// Create a StoreError.
    pub fn store_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::StoreError, message)
    }

    /// Create an InternalError.
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// Body of the response envelope for this error.
    fn envelope_data(&self) -> Value {
        let mut data = Map::new();
        data.insert("code".to_string(), Value::String(self.code_name()));
        match &self.details {
            Some(Value::Object(details)) => {
                for (key, value) in details {
                    data.entry(key.clone()).or_insert_with(|| value.clone());
                }
            }
            Some(other) => {
                data.insert("details".to_string(), other.clone());
            }
            None => {}
        }
        Value::Object(data)
    }

    /// Wire name of the error code, e.g. `ENTITY_NOT_FOUND`.
    fn code_name(&self) -> String {
        match serde_json::to_value(self.code) {
            Ok(Value::String(name)) => name,
            _ => self.code.to_string(),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

// ============================================================================
// AXUM INTEGRATION
// ============================================================================

/// Render the error inside the response envelope:
///
/// ```json
/// {"statusCode": 404, "timestamp": "...", "message": "...",
///  "data": {"code": "ENTITY_NOT_FOUND", "reason": "..."}}
/// ```
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let data = self.envelope_data();
        ApiResponse::new(status, self.message, Some(data)).into_response()
    }
}

// ============================================================================
// CONVERSIONS
// ============================================================================

/// Convert a domain error into an API error.
impl From<TollgateError> for ApiError {
    fn from(err: TollgateError) -> Self {
        match &err {
            TollgateError::InvalidArgument { .. } => ApiError::invalid_input(err.to_string()),
            TollgateError::NotFound { entity_type, id } => {
                ApiError::entity_not_found(entity_type, id)
            }
            TollgateError::AlreadyExists { entity_type, id } => {
                ApiError::entity_already_exists(entity_type, id)
            }
            TollgateError::Store(store) => {
                // Stores log the failing key; the message is passed through.
                ApiError::store_error(store.to_string())
            }
            TollgateError::Config(config) => ApiError::from(config.clone()),
        }
    }
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        tracing::error!(error = %err, "Configuration error");
        ApiError::internal_error(err.to_string())
    }
}

/// Malformed or missing JSON bodies are client errors.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::invalid_input(rejection.body_text())
    }
}

// ============================================================================
// RESULT TYPE ALIAS
// ============================================================================

/// Result type alias for API operations.
pub type ApiResult<T> = Result<T, ApiError>;
