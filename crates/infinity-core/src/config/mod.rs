//! Configuration types for the Infinity MCP adapter.
//!
//! Configuration can be loaded from a YAML file (`infinity.yaml`) and is then
//! overlaid with `INFINITY_*` environment variables. Every section is optional.
//!
//! ```yaml
//! api:
//!   base_url: https://app.startinfinity.com
//!   api_version: 2025-02-26.morava
//!   timeout_ms: 30000
//!   default_concurrency: 8
//! mcp:
//!   transport: stdio
//! ```

pub mod api;
pub mod mcp;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub use api::ApiConfig;
pub use mcp::{McpConfig, Transport};

/// Complete adapter configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InfinityConfig {
    /// Remote API connection settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// MCP server settings.
    #[serde(default)]
    pub mcp: McpConfig,
}

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: String, value: String },
}

impl InfinityConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML content.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).map_err(ConfigError::from)
    }

    /// Load the file if it exists, fall back to defaults otherwise, then
    /// overlay the process environment.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            tracing::debug!(path = %path.display(), "Loading configuration file");
            Self::from_file(path)?
        } else {
            tracing::debug!(path = %path.display(), "Configuration file not found, using defaults");
            Self::default()
        };

        config.api.apply_env()?;
        Ok(config)
    }
}
