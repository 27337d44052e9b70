//! Configuration for the dispatch and calling core.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::security::PolicyTable;
use crate::timeout::{DEFAULT_INITIAL_TIMEOUT, TimeoutPolicy};

/// Highest message type reserved for the base dispatch layer.
pub const DEFAULT_BASE_LAYER_MAX_TYPE: u32 = 1000;

/// Main configuration for the RPC layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RpcConfig {
    /// Message types up to and including this value belong to the base layer.
    pub base_layer_max_type: u32,

    /// Security policy per deployment, group and operation.
    pub security: PolicyTable,

    /// Transport timeouts.
    pub timeouts: TimeoutConfig,
}

/// Timeout configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Wait applied to requests and to populated replies, in milliseconds.
    pub default_initial_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            default_initial_ms: u64::try_from(DEFAULT_INITIAL_TIMEOUT.as_millis())
                .unwrap_or(10_000),
        }
    }
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            base_layer_max_type: DEFAULT_BASE_LAYER_MAX_TYPE,
            security: PolicyTable::default(),
            timeouts: TimeoutConfig::default(),
        }
    }
}

impl RpcConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| Error::Configuration(format!("Failed to read config file: {e}")))?;

        Self::from_toml(&contents)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents)
            .map_err(|e| Error::Configuration(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| Error::Configuration(format!("Failed to serialize config: {e}")))
    }

    /// Validate configuration values that need no registry
    pub fn validate(&self) -> Result<()> {
        if self.timeouts.default_initial_ms == 0 {
            return Err(Error::Configuration(
                "default_initial_ms must be greater than zero".to_string(),
            ));
        }

        if self.base_layer_max_type == u32::MAX {
            return Err(Error::Configuration(
                "base_layer_max_type leaves no room for this layer".to_string(),
            ));
        }

        for name in self.security.operations.keys() {
            if name.split_once('.').is_none() {
                return Err(Error::Configuration(format!(
                    "operation policy key {name:?} must be Group.Operation"
                )));
            }
        }

        Ok(())
    }

    /// Timeout policy described by this configuration.
    #[must_use]
    pub const fn timeout_policy(&self) -> TimeoutPolicy {
        TimeoutPolicy::new(Duration::from_millis(self.timeouts.default_initial_ms))
    }
}
