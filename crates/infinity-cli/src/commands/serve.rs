//! `infinity serve` - run the MCP server on stdio or HTTP.

use anyhow::{Context, Result};
use infinity_core::{McpConfig, Transport};
use infinity_mcp::McpServer;
use tracing::info;

use super::{build_executor, load_config};
use crate::GlobalArgs;

/// Transport settings given on the command line.
#[derive(Debug, Default)]
pub struct ServeOverrides {
    pub transport: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
}

impl ServeOverrides {
    fn apply(self, mcp: &mut McpConfig) -> Result<()> {
        if let Some(raw) = self.transport {
            mcp.transport = raw.parse::<Transport>()?;
        }
        if let Some(host) = self.host {
            mcp.host = host;
        }
        if let Some(port) = self.port {
            mcp.port = port;
        }
        Ok(())
    }
}

pub async fn execute(global: &GlobalArgs, overrides: ServeOverrides) -> Result<()> {
    let mut config = load_config(global)?;
    overrides.apply(&mut config.mcp)?;

    let executor = build_executor(&config.api, global)?;
    let server = McpServer::new(config.mcp.clone(), executor);

    info!(
        transport = ?config.mcp.transport,
        tools = server.tools().len(),
        "Starting Infinity MCP server"
    );

    server.run().await.context("MCP server stopped with an error")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_replace_config_values() {
        let mut mcp = McpConfig::default();
        ServeOverrides {
            transport: Some("HTTP".to_string()),
            host: None,
            port: Some(9000),
        }
        .apply(&mut mcp)
        .unwrap();

        assert_eq!(mcp.transport, Transport::Http);
        assert_eq!(mcp.bind_addr(), "127.0.0.1:9000");
    }

    #[test]
    fn test_unknown_transport_is_an_error() {
        let mut mcp = McpConfig::default();
        let result = ServeOverrides {
            transport: Some("carrier-pigeon".to_string()),
            ..Default::default()
        }
        .apply(&mut mcp);

        assert!(result.is_err());
        assert_eq!(mcp.transport, Transport::Stdio);
    }
}
