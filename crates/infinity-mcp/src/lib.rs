//! # infinity-mcp
//!
//! MCP (Model Context Protocol) server exposing the Infinity REST API as tools.
//!
//! Every tool call is routed by name to an operation handler, executed
//! against the remote API with the call's credential context, and returned as
//! a uniform success/failure envelope. Bulk item fetches run through a
//! bounded-concurrency batch executor that collects partial failures instead
//! of aborting.
//!
//! ## Architecture
//!
//! ```text
//! AI Agent
//!       │
//!       │ MCP protocol (stdio or HTTP)
//!       ▼
//! ┌──────────────────────┐
//! │  McpServer           │
//! │  1. tools/list       │  ← catalog
//! │  2. tools/call       │
//! │     ToolExecutor     │  ← credential store
//! │       ├─ handler     │
//! │       └─ batch       │  ← bounded workers
//! │  3. Envelope → text  │
//! └──────────┬───────────┘
//!            │ reqwest
//!            ▼
//!    Infinity REST API (/api/v2)
//! ```
//!
//! ## Example Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use infinity_core::{CredentialStore, InfinityConfig};
//! use infinity_mcp::{HttpClientFactory, McpServer, ToolExecutor};
//!
//! let config = InfinityConfig::load("infinity.yaml")?;
//! let store = Arc::new(CredentialStore::new(&config.api, None));
//! let executor = ToolExecutor::new(store, Arc::new(HttpClientFactory::new()?));
//!
//! McpServer::new(config.mcp, executor).run().await?;
//! ```

pub mod batch;
pub mod catalog;
pub mod client;
pub mod envelope;
pub mod error;
pub mod executor;
pub mod handlers;
pub mod http_transport;
pub mod protocol;
pub mod query;
pub mod server;
pub mod tools;

pub use batch::{BatchExecutor, BatchFailure, BatchOutcome, WorkResult, run_batch};
pub use client::{ApiRequest, ClientFactory, HttpClientFactory, InfinityClient, Method, RemoteApi};
pub use envelope::Envelope;
pub use error::{ApiError, McpError};
pub use executor::ToolExecutor;
pub use handlers::{Operation, ToolArgs};
pub use protocol::{
    CallToolParams, CallToolResponse, JsonRpcRequest, JsonRpcResponse, ToolAnnotations,
    ToolContent, ToolDefinition,
};
pub use server::McpServer;
pub use tools::ToolRegistry;
