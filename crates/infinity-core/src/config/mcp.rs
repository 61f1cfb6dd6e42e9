//! MCP server configuration.
//!
//! Transport selection and HTTP bind settings for the MCP server.

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Configuration for the MCP server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpConfig {
    /// Transport type: "stdio" or "http".
    #[serde(default)]
    pub transport: Transport,

    /// HTTP host (only used when transport is HTTP).
    #[serde(default = "default_http_host")]
    pub host: String,

    /// HTTP port (only used when transport is HTTP).
    #[serde(default = "default_http_port")]
    pub port: u16,
}

/// MCP transport type.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    /// Standard input/output transport (for Claude Desktop, etc.).
    #[default]
    Stdio,
    /// HTTP transport.
    Http,
}

impl std::str::FromStr for Transport {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stdio" => Ok(Transport::Stdio),
            "http" => Ok(Transport::Http),
            other => Err(ConfigError::InvalidValue {
                key: "mcp.transport".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

impl Default for McpConfig {
    fn default() -> Self {
        Self {
            transport: Transport::default(),
            host: default_http_host(),
            port: default_http_port(),
        }
    }
}

impl McpConfig {
    /// Address the HTTP transport binds to.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn default_http_host() -> String {
    "127.0.0.1".to_string()
}

fn default_http_port() -> u16 {
    3000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_from_str() {
        assert_eq!("stdio".parse::<Transport>().unwrap(), Transport::Stdio);
        assert_eq!("HTTP".parse::<Transport>().unwrap(), Transport::Http);
        assert!("websocket".parse::<Transport>().is_err());
    }

    #[test]
    fn test_defaults() {
        let config = McpConfig::default();
        assert_eq!(config.transport, Transport::Stdio);
        assert_eq!(config.bind_addr(), "127.0.0.1:3000");
    }
}
