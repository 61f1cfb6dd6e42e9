//! HTTP transport for MCP server.
//!
//! `POST /mcp` accepts one JSON-RPC message per request; `GET /health`
//! reports liveness. Parsed requests are forwarded over a channel to the
//! server's single handler task.

use crate::error::McpError;
use crate::protocol::{INTERNAL_ERROR, JsonRpcRequest, JsonRpcResponse, PARSE_ERROR};
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

/// A request waiting for the handler task, with the slot for its response.
pub type PendingRequest = (JsonRpcRequest, oneshot::Sender<Option<JsonRpcResponse>>);

/// HTTP transport handler state.
pub struct HttpTransportState {
    /// Channel for sending requests to the MCP server.
    request_tx: mpsc::Sender<PendingRequest>,
}

impl HttpTransportState {
    /// Create a new HTTP transport state.
    pub fn new(request_tx: mpsc::Sender<PendingRequest>) -> Self {
        Self { request_tx }
    }
}

/// Create the HTTP router for MCP.
pub fn create_router(state: Arc<HttpTransportState>) -> Router {
    Router::new()
        .route("/mcp", post(handle_mcp_post))
        .route("/health", get(handle_health))
        .with_state(state)
}

/// Handle POST requests to /mcp (JSON-RPC over HTTP).
async fn handle_mcp_post(State(state): State<Arc<HttpTransportState>>, body: String) -> Response {
    let request: JsonRpcRequest = match serde_json::from_str(&body) {
        Ok(request) => request,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(JsonRpcResponse::error(None, PARSE_ERROR, format!("Parse error: {e}"))),
            )
                .into_response();
        }
    };

    let (response_tx, response_rx) = oneshot::channel();

    if state.request_tx.send((request, response_tx)).await.is_err() {
        return unavailable("MCP server unavailable");
    }

    match response_rx.await {
        Ok(Some(response)) => (StatusCode::OK, Json(response)).into_response(),
        Ok(None) => StatusCode::ACCEPTED.into_response(),
        Err(_) => unavailable("No response from MCP server"),
    }
}

fn unavailable(message: &str) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(JsonRpcResponse::error(None, INTERNAL_ERROR, message)),
    )
        .into_response()
}

/// Handle health check requests.
async fn handle_health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "infinity-mcp",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// HTTP server for MCP transport.
pub struct HttpServer {
    addr: String,
    state: Arc<HttpTransportState>,
}

impl HttpServer {
    /// Create a new HTTP server bound to `addr` (`host:port`).
    pub fn new(addr: impl Into<String>, request_tx: mpsc::Sender<PendingRequest>) -> Self {
        Self {
            addr: addr.into(),
            state: Arc::new(HttpTransportState::new(request_tx)),
        }
    }

    /// Run the HTTP server.
    pub async fn run(self) -> Result<(), McpError> {
        let app = create_router(self.state);

        let listener = tokio::net::TcpListener::bind(&self.addr)
            .await
            .map_err(|e| McpError::StartupFailed(format!("Failed to bind to {}: {}", self.addr, e)))?;

        tracing::info!(addr = %self.addr, "MCP HTTP server listening");

        axum::serve(listener, app)
            .await
            .map_err(|e| McpError::TransportError(e.to_string()))?;

        Ok(())
    }
}
