//! # infinity-core
//!
//! Configuration and credential resolution shared by the Infinity MCP crates.
//!
//! - [`config`]: YAML configuration with environment overlay.
//! - [`credentials`]: the process-wide credential store and the per-call
//!   [`CredentialContext`] handed to the remote client factory.

pub mod config;
pub mod credentials;

pub use config::{ApiConfig, ConfigError, InfinityConfig, McpConfig, Transport};
pub use credentials::{
    API_PATH, API_VERSION_SEGMENT, CredentialContext, CredentialStore, VERSIONED_API_PATH,
    normalize_base_url,
};
