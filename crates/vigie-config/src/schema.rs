//! Raw configuration schema (as parsed from TOML)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw configuration as parsed from TOML
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawConfig {
    /// Config schema version
    pub config_version: u32,

    /// Login authorization settings
    #[serde(default)]
    pub policy: RawPolicyConfig,

    /// Service-level settings
    #[serde(default)]
    pub service: RawServiceConfig,
}

/// Login authorization settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawPolicyConfig {
    /// Roles for which the schedule is never consulted (default: ["superadmin"])
    pub exempt_roles: Option<Vec<String>>,

    /// Authorize when a schedule document cannot be read (default: true)
    pub fail_open: Option<bool>,
}

/// Service-level settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawServiceConfig {
    /// Data directory holding the audit database
    pub data_dir: Option<PathBuf>,
}
