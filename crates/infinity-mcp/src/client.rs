//! Remote client factory and the Infinity REST client.
//!
//! A [`ClientFactory`] turns a resolved [`CredentialContext`] into a handle
//! implementing [`RemoteApi`]. Building a handle performs no network I/O; the
//! HTTP factory shares one `reqwest` connection pool across all handles and
//! binds base address, headers and timeout per handle.

use std::error::Error as _;
use std::sync::Arc;

use async_trait::async_trait;
use infinity_core::CredentialContext;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use serde_json::Value;

use crate::error::{ApiError, McpError};
use crate::query::QueryParams;

/// Header carrying the API version marker.
pub const API_VERSION_HEADER: &str = "X-API-Version";

const USER_AGENT: &str = concat!("infinity-mcp/", env!("CARGO_PKG_VERSION"));

/// Transport verb.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// Description of one remote call, relative to the versioned base address.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: QueryParams,
    pub body: Option<Value>,
}

impl ApiRequest {
    fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: QueryParams::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::Post, path).with_body(body)
    }

    pub fn put(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::Put, path).with_body(body)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    pub fn with_query(mut self, query: QueryParams) -> Self {
        self.query = query;
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Request-sending handle bound to one credential context.
#[async_trait]
pub trait RemoteApi: Send + Sync {
    /// Issue a request and return the decoded response payload.
    async fn send(&self, request: ApiRequest) -> Result<Value, ApiError>;

    async fn get(&self, path: &str, query: QueryParams) -> Result<Value, ApiError> {
        self.send(ApiRequest::get(path).with_query(query)).await
    }

    async fn post(&self, path: &str, body: Value) -> Result<Value, ApiError> {
        self.send(ApiRequest::post(path, body)).await
    }

    async fn put(&self, path: &str, body: Value) -> Result<Value, ApiError> {
        self.send(ApiRequest::put(path, body)).await
    }

    async fn delete(&self, path: &str) -> Result<Value, ApiError> {
        self.send(ApiRequest::delete(path)).await
    }
}

/// Produces [`RemoteApi`] handles from resolved credential contexts.
pub trait ClientFactory: Send + Sync {
    fn build(&self, context: CredentialContext) -> Arc<dyn RemoteApi>;
}

/// Factory for `reqwest`-backed [`InfinityClient`] handles.
#[derive(Clone)]
pub struct HttpClientFactory {
    http: reqwest::Client,
}

impl HttpClientFactory {
    /// Create the factory and its shared connection pool.
    pub fn new() -> Result<Self, McpError> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| McpError::StartupFailed(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { http })
    }
}

impl ClientFactory for HttpClientFactory {
    fn build(&self, context: CredentialContext) -> Arc<dyn RemoteApi> {
        Arc::new(InfinityClient {
            http: self.http.clone(),
            context,
        })
    }
}

/// Handle for the Infinity REST API.
pub struct InfinityClient {
    http: reqwest::Client,
    context: CredentialContext,
}

impl InfinityClient {
    fn map_send_error(&self, err: reqwest::Error) -> ApiError {
        if err.is_timeout() {
            ApiError::Timeout {
                timeout_ms: self.context.timeout_ms,
            }
        } else {
            ApiError::Transport(error_chain(&err))
        }
    }
}

#[async_trait]
impl RemoteApi for InfinityClient {
    async fn send(&self, request: ApiRequest) -> Result<Value, ApiError> {
        let base = self
            .context
            .base_url
            .as_deref()
            .ok_or(ApiError::BaseUrlMissing)?;
        let url = format!("{base}{}", request.path);

        tracing::debug!(method = ?request.method, path = %request.path, "Sending Infinity API request");

        let mut builder = self
            .http
            .request(request.method.into(), &url)
            .timeout(self.context.timeout())
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json")
            .header(API_VERSION_HEADER, &self.context.api_version);

        if let Some(bearer) = self.context.bearer() {
            builder = builder.header(AUTHORIZATION, bearer);
        }
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| self.map_send_error(e))?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                self.map_send_error(e)
            } else {
                ApiError::Decode(error_chain(&e))
            }
        })?;
        let body = decode_body(&bytes);

        if status.is_success() {
            Ok(body)
        } else {
            tracing::debug!(status = status.as_u16(), path = %request.path, "Infinity API returned an error status");
            Err(ApiError::Status {
                status: status.as_u16(),
                body,
            })
        }
    }
}

/// Empty bodies decode to `null`, JSON bodies to their value, anything else
/// to the raw text.
pub fn decode_body(bytes: &[u8]) -> Value {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Value::Null;
    }
    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
}

fn error_chain(err: &reqwest::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
