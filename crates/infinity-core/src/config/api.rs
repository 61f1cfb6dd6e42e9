//! Remote API connection settings.
//!
//! Values come from three layers, lowest precedence first:
//! 1. the YAML configuration file
//! 2. `INFINITY_*` environment variables
//! 3. command-line flags (applied by the binary)

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Environment variable holding the API base address.
pub const ENV_BASE_URL: &str = "INFINITY_API_BASE_URL";
/// Environment variable holding the bearer credential.
pub const ENV_API_KEY: &str = "INFINITY_API_KEY";
/// Environment variable holding the API version marker.
pub const ENV_API_VERSION: &str = "INFINITY_API_VERSION";
/// Environment variable holding the request timeout in milliseconds.
pub const ENV_TIMEOUT_MS: &str = "INFINITY_API_TIMEOUT_MS";

/// Connection settings for the Infinity REST API.
#[derive(Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base address of the service. Normalized to end in `/api/v2` per call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Bearer credential. Never logged.
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,

    /// Value of the `X-API-Version` header.
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Per-request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Bulk fetch concurrency when the caller does not supply one.
    #[serde(default = "default_concurrency")]
    pub default_concurrency: usize,
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_version", &self.api_version)
            .field("timeout_ms", &self.timeout_ms)
            .field("default_concurrency", &self.default_concurrency)
            .finish()
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key: None,
            api_version: default_api_version(),
            timeout_ms: default_timeout_ms(),
            default_concurrency: default_concurrency(),
        }
    }
}

impl ApiConfig {
    /// Overlay values from the process environment.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_lookup(|key| std::env::var(key).ok())
    }

    /// Overlay values from an arbitrary lookup. Empty values are ignored.
    pub fn apply_lookup<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = get(ENV_BASE_URL) {
            self.base_url = Some(url);
        }
        if let Some(key) = get(ENV_API_KEY) {
            self.api_key = Some(key);
        }
        if let Some(version) = get(ENV_API_VERSION) {
            self.api_version = version;
        }
        if let Some(raw) = get(ENV_TIMEOUT_MS) {
            self.timeout_ms = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: ENV_TIMEOUT_MS.to_string(),
                value: raw.clone(),
            })?;
        }

        Ok(())
    }

    /// Check the settings for values that can never work.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_ms == 0 {
            return Err(ConfigError::Config(
                "api.timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.api_version.trim().is_empty() {
            return Err(ConfigError::Config(
                "api.api_version must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_api_version() -> String {
    "2025-02-26.morava".to_string()
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_concurrency() -> usize {
    8
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_env_overrides_file_values() {
        let mut config = ApiConfig {
            base_url: Some("https://file.example".to_string()),
            ..Default::default()
        };

        config
            .apply_lookup(lookup(&[
                (ENV_BASE_URL, "https://env.example"),
                (ENV_API_KEY, "secret"),
                (ENV_API_VERSION, "2030-01-01.test"),
                (ENV_TIMEOUT_MS, "5000"),
            ]))
            .unwrap();

        assert_eq!(config.base_url.as_deref(), Some("https://env.example"));
        assert_eq!(config.api_key.as_deref(), Some("secret"));
        assert_eq!(config.api_version, "2030-01-01.test");
        assert_eq!(config.timeout_ms, 5000);
    }

    #[test]
    fn test_empty_env_values_are_ignored() {
        let mut config = ApiConfig {
            api_key: Some("from-file".to_string()),
            ..Default::default()
        };

        config
            .apply_lookup(lookup(&[(ENV_API_KEY, ""), (ENV_API_VERSION, "  ")]))
            .unwrap();

        assert_eq!(config.api_key.as_deref(), Some("from-file"));
        assert_eq!(config.api_version, "2025-02-26.morava");
    }

    #[test]
    fn test_invalid_timeout_is_rejected() {
        let mut config = ApiConfig::default();
        let err = config
            .apply_lookup(lookup(&[(ENV_TIMEOUT_MS, "soon")]))
            .unwrap_err();
        assert!(err.to_string().contains(ENV_TIMEOUT_MS));
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let config = ApiConfig {
            api_key: Some("super-secret".to_string()),
            ..Default::default()
        };
        let debug = format!("{:?}", config);
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_validate() {
        assert!(ApiConfig::default().validate().is_ok());

        let config = ApiConfig {
            timeout_ms: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
