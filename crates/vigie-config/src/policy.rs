//! Validated configuration structures

use crate::schema::{RawConfig, RawPolicyConfig, RawServiceConfig};
use crate::validation::normalize_role;
use std::path::PathBuf;

/// Role exempt from login schedules when none is configured
pub const DEFAULT_EXEMPT_ROLE: &str = "superadmin";

/// Validated configuration ready for use by the evaluator and CLI
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub policy: LoginPolicy,
    pub service: ServiceConfig,
}

impl Config {
    /// Convert from raw config (after validation)
    pub fn from_raw(raw: RawConfig) -> Self {
        Self {
            policy: LoginPolicy::from_raw(raw.policy),
            service: ServiceConfig::from_raw(raw.service),
        }
    }
}

/// How login schedules are enforced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginPolicy {
    /// Roles that bypass the schedule entirely
    pub exempt_roles: Vec<String>,
    /// Authorize when the schedule document is unreadable
    pub fail_open: bool,
}

impl LoginPolicy {
    fn from_raw(raw: RawPolicyConfig) -> Self {
        let defaults = Self::default();
        Self {
            exempt_roles: raw.exempt_roles.unwrap_or(defaults.exempt_roles),
            fail_open: raw.fail_open.unwrap_or(defaults.fail_open),
        }
    }

    /// Case-insensitive; surrounding whitespace is ignored
    pub fn is_exempt(&self, role: &str) -> bool {
        let role = normalize_role(role);
        !role.is_empty() && self.exempt_roles.iter().any(|r| normalize_role(r) == role)
    }
}

impl Default for LoginPolicy {
    fn default() -> Self {
        Self {
            exempt_roles: vec![DEFAULT_EXEMPT_ROLE.to_string()],
            fail_open: true,
        }
    }
}

/// Service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub data_dir: PathBuf,
}

impl ServiceConfig {
    fn from_raw(raw: RawServiceConfig) -> Self {
        Self {
            data_dir: raw.data_dir.unwrap_or_else(vigie_util::default_data_dir),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            data_dir: vigie_util::default_data_dir(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = LoginPolicy::default();
        assert!(policy.fail_open);
        assert!(policy.is_exempt("superadmin"));
        assert!(!policy.is_exempt("agent"));
    }

    #[test]
    fn test_exempt_role_is_case_insensitive() {
        let policy = LoginPolicy::default();
        assert!(policy.is_exempt("SuperAdmin"));
        assert!(policy.is_exempt("SUPERADMIN "));
        assert!(!policy.is_exempt("super admin"));
        assert!(!policy.is_exempt(""));
    }

    #[test]
    fn test_from_raw_keeps_explicit_values() {
        let raw: RawConfig = toml::from_str(
            r#"
            config_version = 1
            [policy]
            exempt_roles = ["Chef-Service"]
            fail_open = false
            "#,
        )
        .unwrap();

        let config = Config::from_raw(raw);
        assert!(!config.policy.fail_open);
        assert!(config.policy.is_exempt("chef-service"));
        assert!(!config.policy.is_exempt("superadmin"));
    }

    #[test]
    fn test_empty_exempt_list_exempts_nobody() {
        let policy = LoginPolicy {
            exempt_roles: vec![],
            fail_open: true,
        };
        assert!(!policy.is_exempt("superadmin"));
    }
}
