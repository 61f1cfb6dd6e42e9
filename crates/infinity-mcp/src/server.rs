//! MCP server implementation.
//!
//! Speaks JSON-RPC 2.0 over either newline-delimited stdio or HTTP. Both
//! transports handle one request at a time.

use std::sync::Arc;

use infinity_core::{McpConfig, Transport};
use serde_json::{Value, json};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;

use crate::catalog;
use crate::error::McpError;
use crate::executor::ToolExecutor;
use crate::http_transport::{HttpServer, PendingRequest};
use crate::protocol::*;
use crate::tools::ToolRegistry;

/// Name reported in `initialize`.
pub const SERVER_NAME: &str = "infinity-mcp";

/// The MCP server.
pub struct McpServer {
    config: McpConfig,
    tools: ToolRegistry,
    executor: ToolExecutor,
}

impl McpServer {
    /// Create a server exposing the full Infinity tool catalog.
    pub fn new(config: McpConfig, executor: ToolExecutor) -> Self {
        Self {
            config,
            tools: catalog::registry(),
            executor,
        }
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Start the MCP server on the configured transport.
    pub async fn run(self) -> Result<(), McpError> {
        match self.config.transport {
            Transport::Stdio => self.run_stdio().await,
            Transport::Http => Arc::new(self).run_http().await,
        }
    }

    /// Run the server with stdio transport.
    pub async fn run_stdio(&self) -> Result<(), McpError> {
        tracing::info!(
            tool_count = self.tools.len(),
            "Starting MCP server with stdio transport"
        );
        self.serve_lines(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
            .await
    }

    /// Serve newline-delimited JSON-RPC from `reader`, writing responses to `writer`.
    ///
    /// Returns when the reader reaches end of input. Malformed lines are
    /// answered with a parse error and do not stop the loop.
    pub async fn serve_lines<R, W>(&self, reader: R, mut writer: W) -> Result<(), McpError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();

        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            if let Some(response) = self.handle_message(line).await {
                let mut frame = serde_json::to_vec(&response)?;
                frame.push(b'\n');
                writer.write_all(&frame).await?;
                writer.flush().await?;
            }
        }

        tracing::info!("Input closed, stopping stdio transport");
        Ok(())
    }

    /// Run the server with HTTP transport.
    ///
    /// Requests from all connections funnel through one channel into a single
    /// handler task.
    pub async fn run_http(self: Arc<Self>) -> Result<(), McpError> {
        let addr = self.config.bind_addr();
        tracing::info!(%addr, tool_count = self.tools.len(), "Starting MCP server with HTTP transport");

        let (request_tx, mut request_rx) = mpsc::channel::<PendingRequest>(100);

        let server = Arc::clone(&self);
        tokio::spawn(async move {
            while let Some((request, response_tx)) = request_rx.recv().await {
                let response = server.handle_request(request).await;
                let _ = response_tx.send(response);
            }
        });

        HttpServer::new(addr, request_tx).run().await
    }

    /// Handle one raw JSON-RPC message.
    pub async fn handle_message(&self, raw: &str) -> Option<JsonRpcResponse> {
        let value: Value = match serde_json::from_str(raw) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to parse JSON-RPC message");
                return Some(JsonRpcResponse::error(
                    None,
                    PARSE_ERROR,
                    format!("Parse error: {e}"),
                ));
            }
        };

        let id = value.get("id").cloned();
        match serde_json::from_value::<JsonRpcRequest>(value) {
            Ok(request) => self.handle_request(request).await,
            Err(e) => Some(JsonRpcResponse::error(
                id,
                INVALID_REQUEST,
                format!("Invalid request: {e}"),
            )),
        }
    }

    /// Handle a JSON-RPC request. Notifications yield `None`.
    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        if request.is_notification() {
            tracing::debug!(method = %request.method, "Received notification");
            return None;
        }

        let id = request.id.clone();
        let response = match request.method.as_str() {
            "initialize" => self.handle_initialize(id),
            "ping" => JsonRpcResponse::success(id, json!({})),
            "tools/list" => self.handle_list_tools(id),
            "tools/call" => self.handle_call_tool(id, request.params).await,
            "shutdown" => self.handle_shutdown(id),
            _ => JsonRpcResponse::error(
                id,
                METHOD_NOT_FOUND,
                format!("Method not found: {}", request.method),
            ),
        };
        Some(response)
    }

    fn handle_initialize(&self, id: Option<Value>) -> JsonRpcResponse {
        let result = json!({
            "protocolVersion": PROTOCOL_VERSION,
            "serverInfo": {
                "name": SERVER_NAME,
                "version": env!("CARGO_PKG_VERSION")
            },
            "capabilities": {
                "tools": {}
            }
        });
        JsonRpcResponse::success(id, result)
    }

    fn handle_list_tools(&self, id: Option<Value>) -> JsonRpcResponse {
        let response = ListToolsResponse {
            tools: self.tools.list().to_vec(),
        };
        to_response(id, &response)
    }

    async fn handle_call_tool(&self, id: Option<Value>, params: Option<Value>) -> JsonRpcResponse {
        let params: CallToolParams = match params {
            Some(p) => match serde_json::from_value(p) {
                Ok(params) => params,
                Err(e) => {
                    return JsonRpcResponse::error(id, INVALID_PARAMS, format!("Invalid params: {e}"));
                }
            },
            None => return JsonRpcResponse::error(id, INVALID_PARAMS, "Missing params"),
        };

        let envelope = self.executor.dispatch(&params.name, &params.arguments).await;
        to_response(id, &envelope.into_tool_response())
    }

    fn handle_shutdown(&self, id: Option<Value>) -> JsonRpcResponse {
        tracing::info!("MCP server shutdown requested");
        JsonRpcResponse::success(id, Value::Null)
    }
}

fn to_response<T: serde::Serialize>(id: Option<Value>, result: &T) -> JsonRpcResponse {
    match serde_json::to_value(result) {
        Ok(value) => JsonRpcResponse::success(id, value),
        Err(e) => JsonRpcResponse::error(id, INTERNAL_ERROR, format!("Failed to encode result: {e}")),
    }
}
