//! Rate limit configuration types
//!
//! The request-handling layer receives a [`RateLimitPolicy`] at construction
//! time instead of compiled-in constants, so limits can be tuned per
//! deployment.

use crate::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Default request budget per window for every endpoint.
pub const DEFAULT_MAX_REQUESTS: u32 = 5;

/// Default fixed window length.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);

/// Rate-limited operations of the department API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Endpoint {
    SaveDepartment,
    FindAllDepartments,
    FindDepartmentById,
    UpdateDepartment,
    DeleteDepartment,
}

impl Endpoint {
    pub const ALL: [Endpoint; 5] = [
        Endpoint::SaveDepartment,
        Endpoint::FindAllDepartments,
        Endpoint::FindDepartmentById,
        Endpoint::UpdateDepartment,
        Endpoint::DeleteDepartment,
    ];

    /// Suffix appended to the client identifier to form the limiter key.
    pub fn key_suffix(&self) -> &'static str {
        match self {
            Endpoint::SaveDepartment => ".save-department",
            Endpoint::FindAllDepartments => ".find-all-departments",
            Endpoint::FindDepartmentById => ".find-department-by-id",
            Endpoint::UpdateDepartment => ".update-department",
            Endpoint::DeleteDepartment => ".delete-department",
        }
    }

    /// Short label used for metrics and environment overrides.
    pub fn as_str(&self) -> &'static str {
        match self {
            Endpoint::SaveDepartment => "save",
            Endpoint::FindAllDepartments => "find_all",
            Endpoint::FindDepartmentById => "find_by_id",
            Endpoint::UpdateDepartment => "update",
            Endpoint::DeleteDepartment => "delete",
        }
    }

    /// Build the limiter key for a client calling this endpoint.
    pub fn limiter_key(&self, client: &str) -> String {
        format!("{}{}", client, self.key_suffix())
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fixed-window limit for one endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitRule {
    pub max_requests: u32,
    /// Window length
    pub window: Duration,
}

impl RateLimitRule {
    pub const fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
        }
    }

    /// Window length rounded up to whole seconds, never below one.
    pub fn window_secs(&self) -> u64 {
        let secs = self.window.as_secs();
        let rounded = if self.window.subsec_nanos() > 0 {
            secs + 1
        } else {
            secs
        };
        rounded.max(1)
    }

    pub fn validate(&self, endpoint: Endpoint) -> Result<(), ConfigError> {
        if self.max_requests == 0 {
            return Err(ConfigError::InvalidValue {
                field: format!("{}.max_requests", endpoint),
                value: "0".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }
        if self.window.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: format!("{}.window", endpoint),
                value: "0s".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for RateLimitRule {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_REQUESTS, DEFAULT_WINDOW)
    }
}

/// Per-endpoint rate limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitPolicy {
    /// When false every request passes without touching the limiter.
    pub enabled: bool,
    pub save: RateLimitRule,
    pub find_all: RateLimitRule,
    pub find_by_id: RateLimitRule,
    pub update: RateLimitRule,
    pub delete: RateLimitRule,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self::uniform(RateLimitRule::default())
    }
}

impl RateLimitPolicy {
    /// Apply the same rule to every endpoint.
    pub fn uniform(rule: RateLimitRule) -> Self {
        Self {
            enabled: true,
            save: rule,
            find_all: rule,
            find_by_id: rule,
            update: rule,
            delete: rule,
        }
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    pub fn rule(&self, endpoint: Endpoint) -> &RateLimitRule {
        match endpoint {
            Endpoint::SaveDepartment => &self.save,
            Endpoint::FindAllDepartments => &self.find_all,
            Endpoint::FindDepartmentById => &self.find_by_id,
            Endpoint::UpdateDepartment => &self.update,
            Endpoint::DeleteDepartment => &self.delete,
        }
    }

    pub fn rule_mut(&mut self, endpoint: Endpoint) -> &mut RateLimitRule {
        match endpoint {
            Endpoint::SaveDepartment => &mut self.save,
            Endpoint::FindAllDepartments => &mut self.find_all,
            Endpoint::FindDepartmentById => &mut self.find_by_id,
            Endpoint::UpdateDepartment => &mut self.update,
            Endpoint::DeleteDepartment => &mut self.delete,
        }
    }

    /// Check every rule. A disabled policy is still validated.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for endpoint in Endpoint::ALL {
            self.rule(endpoint).validate(endpoint)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_matches_original_limits() {
        let policy = RateLimitPolicy::default();
        assert!(policy.enabled);
        for endpoint in Endpoint::ALL {
            let rule = policy.rule(endpoint);
            assert_eq!(rule.max_requests, 5);
            assert_eq!(rule.window, Duration::from_secs(60));
        }
        assert!(policy.validate().is_ok());
    }

    #[test]
    fn test_limiter_key_suffixes() {
        assert_eq!(
            Endpoint::SaveDepartment.limiter_key("10.0.0.1"),
            "10.0.0.1.save-department"
        );
        assert_eq!(
            Endpoint::FindAllDepartments.limiter_key("10.0.0.1"),
            "10.0.0.1.find-all-departments"
        );
        assert_eq!(
            Endpoint::FindDepartmentById.limiter_key("x"),
            "x.find-department-by-id"
        );
        assert_eq!(Endpoint::UpdateDepartment.limiter_key("x"), "x.update-department");
        assert_eq!(Endpoint::DeleteDepartment.limiter_key("x"), "x.delete-department");
    }

    #[test]
    fn test_validate_rejects_zero_limit() {
        let mut policy = RateLimitPolicy::default();
        policy.update.max_requests = 0;
        let err = policy.validate().unwrap_err();
        assert!(err.to_string().contains("update.max_requests"));
    }

    #[test]
    fn test_validate_rejects_zero_window() {
        let mut policy = RateLimitPolicy::default();
        policy.rule_mut(Endpoint::DeleteDepartment).window = Duration::ZERO;
        let err = policy.validate().unwrap_err();
        assert!(err.to_string().contains("delete.window"));
    }

    #[test]
    fn test_window_secs_rounds_up() {
        assert_eq!(RateLimitRule::new(1, Duration::from_millis(1500)).window_secs(), 2);
        assert_eq!(RateLimitRule::new(1, Duration::from_millis(10)).window_secs(), 1);
        assert_eq!(RateLimitRule::new(1, Duration::from_secs(60)).window_secs(), 60);
    }

    #[test]
    fn test_disabled_policy_keeps_rules() {
        let policy = RateLimitPolicy::disabled();
        assert!(!policy.enabled);
        assert_eq!(policy.save, RateLimitRule::default());
    }
}
