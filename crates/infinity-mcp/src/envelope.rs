//! Uniform result envelope returned by every tool call.

use serde::{Serialize, Serializer};
use serde_json::{Map, Value, json};

use crate::batch::BatchOutcome;
use crate::error::ApiError;
use crate::protocol::{CallToolResponse, ToolContent};

/// Message carried by envelopes for failed remote calls.
pub const REMOTE_FAILURE_MESSAGE: &str = "Infinity API request failed";

/// Result of dispatching one tool call.
///
/// Wire forms:
///
/// - `{"success": true, "data": ...}` for single operations
/// - `{"success": true}` for acknowledgements
/// - `{"success": true, "successes": [...], "failures": [{"id", "error"}]}` for batches
/// - `{"success": false, "message": ..., "error"?: ...}` for failures
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    Success { data: Option<Value> },
    Batch(BatchOutcome),
    Failure { message: String, error: Option<Value> },
}

impl Envelope {
    pub fn success(data: Value) -> Self {
        Envelope::Success { data: Some(data) }
    }

    /// Success with no payload.
    pub fn acknowledged() -> Self {
        Envelope::Success { data: None }
    }

    pub fn batch(outcome: BatchOutcome) -> Self {
        Envelope::Batch(outcome)
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Envelope::Failure {
            message: message.into(),
            error: None,
        }
    }

    /// Failure of a remote call, carrying the remote error detail.
    pub fn remote_failure(err: &ApiError) -> Self {
        Envelope::Failure {
            message: REMOTE_FAILURE_MESSAGE.to_string(),
            error: Some(err.detail()),
        }
    }

    pub fn unknown_tool(name: &str) -> Self {
        Self::failure(format!("Unknown tool: {name}"))
    }

    pub fn is_success(&self) -> bool {
        !matches!(self, Envelope::Failure { .. })
    }

    /// JSON form of the envelope.
    pub fn to_value(&self) -> Value {
        match self {
            Envelope::Success { data: Some(data) } => json!({ "success": true, "data": data }),
            Envelope::Success { data: None } => json!({ "success": true }),
            Envelope::Batch(outcome) => json!({
                "success": true,
                "successes": outcome.successes,
                "failures": outcome.failures,
            }),
            Envelope::Failure { message, error } => {
                let mut map = Map::new();
                map.insert("success".into(), Value::Bool(false));
                map.insert("message".into(), Value::String(message.clone()));
                if let Some(error) = error {
                    map.insert("error".into(), error.clone());
                }
                Value::Object(map)
            }
        }
    }

    /// Pretty-printed JSON text of the envelope.
    pub fn to_text(&self) -> String {
        let value = self.to_value();
        serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string())
    }

    /// Wrap as an MCP tool result: one text block, `isError` set on failure.
    pub fn into_tool_response(self) -> CallToolResponse {
        CallToolResponse {
            content: vec![ToolContent::Text {
                text: self.to_text(),
            }],
            is_error: !self.is_success(),
        }
    }
}

impl Serialize for Envelope {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}
