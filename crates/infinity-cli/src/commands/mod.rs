//! CLI command implementations for the Infinity MCP adapter.

pub mod call;
pub mod serve;
pub mod tools;

use std::sync::Arc;

use anyhow::{Context, Result};
use infinity_core::{ApiConfig, CredentialStore, InfinityConfig};
use infinity_mcp::{HttpClientFactory, ToolExecutor};
use tracing::warn;

use crate::GlobalArgs;

/// Load the config file, overlay the environment, then the command line.
pub fn load_config(global: &GlobalArgs) -> Result<InfinityConfig> {
    let mut config = InfinityConfig::load(&global.config)
        .with_context(|| format!("Failed to load configuration from {:?}", global.config))?;

    apply_flags(&mut config.api, global);
    config.api.validate().context("Invalid API configuration")?;

    Ok(config)
}

fn apply_flags(api: &mut ApiConfig, global: &GlobalArgs) {
    let given = |v: &Option<String>| v.as_ref().filter(|s| !s.trim().is_empty()).cloned();

    if let Some(url) = given(&global.base_url) {
        api.base_url = Some(url);
    }
    if let Some(version) = given(&global.api_version) {
        api.api_version = version;
    }
    if let Some(timeout_ms) = global.timeout_ms {
        api.timeout_ms = timeout_ms;
    }
}

/// Build the dispatch router, warning about settings that will make remote
/// calls fail. The `--api-key` flag seeds the runtime credential.
pub fn build_executor(api: &ApiConfig, global: &GlobalArgs) -> Result<ToolExecutor> {
    let store = Arc::new(CredentialStore::new(api, global.api_key.clone()));

    if !store.has_base_url() {
        warn!("No Infinity base URL configured; set INFINITY_API_BASE_URL or --base-url");
    }
    if !store.has_credential() {
        warn!("No Infinity API key configured; calls need an apiKey argument or infinity_set_api_key");
    }

    let factory = HttpClientFactory::new().context("Failed to build HTTP client")?;
    Ok(ToolExecutor::new(store, Arc::new(factory)).with_default_concurrency(api.default_concurrency))
}
