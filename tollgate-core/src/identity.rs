//! Identity types for tollgate entities

use chrono::NaiveDateTime;

use crate::{TollgateError, TollgateResult};

/// Wall-clock timestamp without zone, matching the relational `TIMESTAMP` column.
pub type Timestamp = NaiveDateTime;

/// Identifier of the user that created or last modified a record.
pub type UserId = i64;

/// Reject a blank identifier before it reaches any store.
///
/// Only emptiness is checked. Length and format are left to the
/// system of record.
pub fn ensure_identifier(field: &str, value: &str) -> TollgateResult<()> {
    if value.trim().is_empty() {
        return Err(TollgateError::InvalidArgument {
            reason: format!("{} cannot be empty", field),
        });
    }
    Ok(())
}
