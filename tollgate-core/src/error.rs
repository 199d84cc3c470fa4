//! Error types for tollgate operations

use thiserror::Error;

/// Failures raised by the key-value store or the system of record.
///
/// Every variant keeps the original message. Nothing in the core
/// retries on these.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Key-value store failure: {reason}")]
    KeyValue { reason: String },

    #[error("Record store failure: {reason}")]
    Record { reason: String },

    #[error("Serialization failure: {reason}")]
    Serialization { reason: String },
}

impl StoreError {
    pub fn key_value(reason: impl ToString) -> Self {
        Self::KeyValue {
            reason: reason.to_string(),
        }
    }

    pub fn record(reason: impl ToString) -> Self {
        Self::Record {
            reason: reason.to_string(),
        }
    }

    pub fn serialization(reason: impl ToString) -> Self {
        Self::Serialization {
            reason: reason.to_string(),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::serialization(err)
    }
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Master error type for all tollgate errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TollgateError {
    #[error("Invalid argument: {reason}")]
    InvalidArgument { reason: String },

    #[error("{entity_type} with id {id} already exists")]
    AlreadyExists {
        entity_type: &'static str,
        id: String,
    },

    #[error("{entity_type} with id {id} does not exist")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

impl TollgateError {
    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
        }
    }
}

/// Result type alias for tollgate operations.
pub type TollgateResult<T> = Result<T, TollgateError>;

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let err = TollgateError::NotFound {
            entity_type: "Department",
            id: "D404".to_string(),
        };
        assert_eq!(err.to_string(), "Department with id D404 does not exist");
    }

    #[test]
    fn test_already_exists_display() {
        let err = TollgateError::AlreadyExists {
            entity_type: "Department",
            id: "D001".to_string(),
        };
        assert_eq!(err.to_string(), "Department with id D001 already exists");
    }

    #[test]
    fn test_store_error_keeps_original_message() {
        let err = TollgateError::from(StoreError::key_value("connection refused"));
        let msg = err.to_string();
        assert!(msg.contains("Key-value store failure"));
        assert!(msg.contains("connection refused"));
    }

    #[test]
    fn test_serde_error_converts_to_serialization() {
        let parse = serde_json::from_str::<u32>("not a number").unwrap_err();
        let err = StoreError::from(parse);
        assert!(matches!(err, StoreError::Serialization { .. }));
    }

    #[test]
    fn test_from_variants() {
        let store = TollgateError::from(StoreError::record("relation missing"));
        assert!(matches!(store, TollgateError::Store(_)));

        let config = TollgateError::from(ConfigError::InvalidValue {
            field: "window".to_string(),
            value: "0".to_string(),
            reason: "must be positive".to_string(),
        });
        assert!(matches!(config, TollgateError::Config(_)));
    }
}
