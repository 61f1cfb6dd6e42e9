//! Tool execution engine.
//!
//! [`ToolExecutor`] is the dispatch router: it resolves a tool name to an
//! [`Operation`], builds a client for the call's credential context, runs the
//! handler (or the batch executor for bulk fetches) and wraps the outcome in
//! an [`Envelope`]. Every path ends in an envelope; nothing propagates to the
//! transport.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use infinity_core::CredentialStore;
use serde_json::Value;
use tracing::Instrument;

use crate::batch::DEFAULT_CONCURRENCY;
use crate::client::{ClientFactory, RemoteApi};
use crate::envelope::{Envelope, REMOTE_FAILURE_MESSAGE};
use crate::handlers::{self, Operation, ToolArgs};

/// Routes tool calls to their handlers.
pub struct ToolExecutor {
    /// Process-wide credential state; `infinity_set_api_key` mutates it.
    credentials: Arc<CredentialStore>,
    /// Builds one remote handle per call (or per batch).
    factory: Arc<dyn ClientFactory>,
    /// Bulk concurrency used when a call does not specify one.
    default_concurrency: usize,
}

impl ToolExecutor {
    /// Create a new tool executor.
    pub fn new(credentials: Arc<CredentialStore>, factory: Arc<dyn ClientFactory>) -> Self {
        Self {
            credentials,
            factory,
            default_concurrency: DEFAULT_CONCURRENCY,
        }
    }

    /// Set the default bulk concurrency.
    pub fn with_default_concurrency(mut self, concurrency: usize) -> Self {
        self.default_concurrency = concurrency;
        self
    }

    /// Shared credential state.
    pub fn credentials(&self) -> &Arc<CredentialStore> {
        &self.credentials
    }

    /// Dispatch one tool call.
    pub async fn dispatch(&self, name: &str, arguments: &Value) -> Envelope {
        let span = tracing::info_span!("tool_call", tool = %name);
        self.dispatch_inner(name, arguments).instrument(span).await
    }

    async fn dispatch_inner(&self, name: &str, arguments: &Value) -> Envelope {
        let operation: Operation = match name.parse() {
            Ok(op) => op,
            Err(_) => {
                tracing::warn!("Unknown tool requested");
                return Envelope::unknown_tool(name);
            }
        };
        let args = ToolArgs::new(arguments);

        match operation {
            Operation::SetApiKey => {
                self.credentials.set_runtime_key(args.string("apiKey"));
                Envelope::acknowledged()
            }
            Operation::GetItemsBulk => {
                let api = self.client_for(&args);
                let outcome =
                    handlers::get_items_bulk(api, &args, self.default_concurrency).await;
                Envelope::batch(outcome)
            }
            op => {
                let api = self.client_for(&args);
                let result = AssertUnwindSafe(op.call(api.as_ref(), &args))
                    .catch_unwind()
                    .await;

                match result {
                    Ok(Ok(data)) => {
                        tracing::debug!("Tool call succeeded");
                        Envelope::success(data)
                    }
                    Ok(Err(err)) => {
                        tracing::warn!(status = ?err.status(), error = %err, "Infinity API request failed");
                        Envelope::remote_failure(&err)
                    }
                    Err(_) => {
                        tracing::error!("Tool handler panicked");
                        Envelope::Failure {
                            message: REMOTE_FAILURE_MESSAGE.to_string(),
                            error: Some(Value::String("handler panicked".into())),
                        }
                    }
                }
            }
        }
    }

    fn client_for(&self, args: &ToolArgs<'_>) -> Arc<dyn RemoteApi> {
        self.factory.build(self.credentials.resolve(args.api_key()))
    }
}
