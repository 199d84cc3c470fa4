//! Tollgate Core - Entity Types
//!
//! Pure data structures with no I/O. All other crates depend on this.
//! This crate contains the department entity, the error taxonomy and
//! the rate limit configuration types.

pub mod config;
pub mod entities;
pub mod error;
pub mod identity;

pub use config::{
    Endpoint, RateLimitPolicy, RateLimitRule, DEFAULT_MAX_REQUESTS, DEFAULT_WINDOW,
};
pub use entities::{Department, DepartmentPatch, Entity};
pub use error::{ConfigError, StoreError, TollgateError, TollgateResult};
pub use identity::{ensure_identifier, Timestamp, UserId};
