//! Credential resolution.
//!
//! A [`CredentialStore`] holds the process-wide defaults: the credential sourced
//! from configuration/environment and a runtime-settable credential that the
//! `infinity_set_api_key` tool mutates. Every tool call resolves a fresh
//! [`CredentialContext`] from the store, so changes take effect on the next call.
//!
//! Precedence, highest first:
//! 1. per-call override (`apiKey` argument)
//! 2. runtime credential
//! 3. environment/configuration credential
//!
//! Empty strings count as absent at every level. A missing credential is not an
//! error here; the client simply omits the `Authorization` header.

use std::sync::RwLock;
use std::time::Duration;

use crate::config::ApiConfig;

/// Unversioned API path.
pub const API_PATH: &str = "/api";
/// Version segment appended to [`API_PATH`].
pub const API_VERSION_SEGMENT: &str = "/v2";
/// Full versioned API path every base address is normalized to end with.
pub const VERSIONED_API_PATH: &str = "/api/v2";

/// Normalize a base address so it ends with [`VERSIONED_API_PATH`].
///
/// One trailing `/` is stripped first. The result always ends with the
/// versioned path, which makes the function idempotent.
pub fn normalize_base_url(raw: &str) -> String {
    let base = raw.strip_suffix('/').unwrap_or(raw);

    if base.ends_with(VERSIONED_API_PATH) {
        base.to_string()
    } else if base.ends_with(API_PATH) {
        format!("{base}{API_VERSION_SEGMENT}")
    } else {
        format!("{base}{VERSIONED_API_PATH}")
    }
}

/// Connection parameters resolved for one call.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialContext {
    /// Normalized base address, `None` when no base address is configured.
    pub base_url: Option<String>,
    /// Bearer credential, if any candidate resolved.
    pub credential: Option<String>,
    /// `X-API-Version` header value.
    pub api_version: String,
    /// Per-request timeout.
    pub timeout_ms: u64,
}

impl CredentialContext {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// `Authorization` header value, if a credential is present.
    pub fn bearer(&self) -> Option<String> {
        self.credential.as_ref().map(|key| format!("Bearer {key}"))
    }
}

impl std::fmt::Debug for CredentialContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialContext")
            .field("base_url", &self.base_url)
            .field("credential", &self.credential.as_ref().map(|_| "<redacted>"))
            .field("api_version", &self.api_version)
            .field("timeout_ms", &self.timeout_ms)
            .finish()
    }
}

/// Process-wide credential state, passed explicitly to the dispatch router.
pub struct CredentialStore {
    base_url: Option<String>,
    api_version: String,
    timeout_ms: u64,
    environment_key: Option<String>,
    runtime_key: RwLock<Option<String>>,
}

impl CredentialStore {
    /// Build the store from API settings.
    ///
    /// `runtime_key` is the credential supplied at startup (the `--api-key`
    /// flag). When absent the runtime credential starts out as the
    /// configuration/environment credential.
    pub fn new(api: &ApiConfig, runtime_key: Option<String>) -> Self {
        let environment_key = non_empty(api.api_key.clone());
        let runtime_key = non_empty(runtime_key).or_else(|| environment_key.clone());

        Self {
            base_url: non_empty(api.base_url.clone()),
            api_version: api.api_version.clone(),
            timeout_ms: api.timeout_ms,
            environment_key,
            runtime_key: RwLock::new(runtime_key),
        }
    }

    /// Replace the runtime credential. An empty key clears it, which makes
    /// resolution fall back to the environment credential.
    pub fn set_runtime_key(&self, key: impl Into<String>) {
        let key = non_empty(Some(key.into()));
        let mut guard = self.runtime_key.write().unwrap_or_else(|e| e.into_inner());
        *guard = key;
        tracing::info!(present = guard.is_some(), "Runtime API key updated");
    }

    /// Whether any process-wide credential is available.
    pub fn has_credential(&self) -> bool {
        self.runtime_key().is_some() || self.environment_key.is_some()
    }

    /// Whether a base address is configured.
    pub fn has_base_url(&self) -> bool {
        self.base_url.is_some()
    }

    /// Resolve the context for one call.
    pub fn resolve(&self, override_key: Option<&str>) -> CredentialContext {
        let credential = override_key
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .or_else(|| self.runtime_key())
            .or_else(|| self.environment_key.clone());

        CredentialContext {
            base_url: self.base_url.as_deref().map(normalize_base_url),
            credential,
            api_version: self.api_version.clone(),
            timeout_ms: self.timeout_ms,
        }
    }

    fn runtime_key(&self) -> Option<String> {
        self.runtime_key
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
