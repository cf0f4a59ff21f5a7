//! Configuration validation

use crate::schema::RawConfig;
use std::collections::HashSet;
use std::path::PathBuf;
use thiserror::Error;

/// Validation error
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("Exempt role at position {index} is blank")]
    BlankExemptRole { index: usize },

    #[error("Duplicate exempt role: {0}")]
    DuplicateExemptRole(String),

    #[error("Data directory must be an absolute path: {0}")]
    RelativeDataDir(PathBuf),
}

/// Validate a raw configuration
pub fn validate_config(config: &RawConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if let Some(roles) = &config.policy.exempt_roles {
        let mut seen = HashSet::new();
        for (index, role) in roles.iter().enumerate() {
            let normalized = normalize_role(role);
            if normalized.is_empty() {
                errors.push(ValidationError::BlankExemptRole { index });
            } else if !seen.insert(normalized) {
                errors.push(ValidationError::DuplicateExemptRole(role.clone()));
            }
        }
    }

    if let Some(data_dir) = &config.service.data_dir
        && data_dir.is_relative()
    {
        errors.push(ValidationError::RelativeDataDir(data_dir.clone()));
    }

    errors
}

/// Role names compare case-insensitively, ignoring surrounding whitespace
pub fn normalize_role(role: &str) -> String {
    role.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{RawPolicyConfig, RawServiceConfig};

    fn config_with_roles(roles: &[&str]) -> RawConfig {
        RawConfig {
            config_version: 1,
            policy: RawPolicyConfig {
                exempt_roles: Some(roles.iter().map(|r| r.to_string()).collect()),
                fail_open: None,
            },
            service: RawServiceConfig::default(),
        }
    }

    #[test]
    fn test_normalize_role() {
        assert_eq!(normalize_role("  SuperAdmin "), "superadmin");
        assert_eq!(normalize_role("agent"), "agent");
    }

    #[test]
    fn test_valid_roles() {
        assert!(validate_config(&config_with_roles(&["superadmin", "chef"])).is_empty());
    }

    #[test]
    fn test_blank_role_detection() {
        let errors = validate_config(&config_with_roles(&["superadmin", "  "]));
        assert!(matches!(errors[..], [ValidationError::BlankExemptRole { index: 1 }]));
    }

    #[test]
    fn test_duplicate_role_detection() {
        let errors = validate_config(&config_with_roles(&["superadmin", "SUPERADMIN"]));
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::DuplicateExemptRole(r) if r == "SUPERADMIN")));
    }

    #[test]
    fn test_relative_data_dir_detection() {
        let mut config = config_with_roles(&["superadmin"]);
        config.service.data_dir = Some(PathBuf::from("data"));

        let errors = validate_config(&config);
        assert!(matches!(errors[..], [ValidationError::RelativeDataDir(_)]));
    }
}
