//! Error types for the MCP crate.

use serde_json::Value;
use thiserror::Error;

/// Errors that can occur in the MCP server itself.
///
/// Remote API failures never surface as `McpError`; they are converted into
/// failure envelopes by the dispatch router.
#[derive(Debug, Error)]
pub enum McpError {
    /// Failed to start the server.
    #[error("failed to start MCP server: {0}")]
    StartupFailed(String),

    /// Transport error.
    #[error("transport error: {0}")]
    TransportError(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Failure of a single remote call.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// No base address configured; detected when the call is issued.
    #[error("Infinity API base URL is not configured (set INFINITY_API_BASE_URL)")]
    BaseUrlMissing,

    /// Connection, TLS or request construction failure.
    #[error("request failed: {0}")]
    Transport(String),

    /// The per-call timeout elapsed.
    #[error("request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// The service answered with a non-success status.
    #[error("Request failed with status code {status}")]
    Status { status: u16, body: Value },

    /// A success response whose body could not be decoded.
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// The operation is handled by the router, not by one remote call.
    #[error("{0} does not map to a single remote call")]
    NotRemote(&'static str),
}

impl ApiError {
    /// Error detail surfaced to callers: the remote error body verbatim when
    /// the service sent one, otherwise the error message.
    pub fn detail(&self) -> Value {
        match self {
            ApiError::Status { body, .. } if is_present(body) => body.clone(),
            other => Value::String(other.to_string()),
        }
    }

    /// HTTP status, if the service answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Null and empty-string bodies carry no detail.
fn is_present(body: &Value) -> bool {
    match body {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}
