//! Configuration defaults and loading.
//!
//! Defaults live in small constant modules so the CLI and tests share them;
//! [`ExtensionConfig`] layers a JSON file and environment variables on top.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ExtensionError, Result};

/// Default endpoints.
pub mod endpoints {
    /// Registry API root serving `/extension-routes`.
    pub const API: &str = "http://localhost:8081/api";
    /// Root that relative extension component paths are served from.
    pub const EXTENSION_ASSETS: &str = "http://localhost:8081/plugins";
}

/// Environment variable names.
pub mod env_vars {
    pub const API_URL: &str = "MIRA_API_URL";
    pub const EXTENSION_BASE_URL: &str = "MIRA_EXTENSION_BASE_URL";
    pub const API_TOKEN: &str = "MIRA_API_TOKEN";
    pub const REQUEST_TIMEOUT_SECS: &str = "MIRA_REQUEST_TIMEOUT_SECS";
    pub const MOUNT_ROUTE: &str = "MIRA_MOUNT_ROUTE";
    pub const LOG_JSON: &str = "MIRA_LOG_JSON";
}

/// Routing defaults.
pub mod defaults {
    /// Name of the host route that extension routes are appended under.
    pub const MOUNT_ROUTE_NAME: &str = "Mira";
    /// Prefix of the namespaced alias path.
    pub const ALIAS_PREFIX: &str = "/ext/plugin";
    /// Request timeout for registry calls, in seconds.
    pub const REQUEST_TIMEOUT_SECS: u64 = 10;
    /// Sort priority for descriptors without an explicit `order`.
    pub const ORDER: f64 = 999.0;
    /// Collection segment used when a descriptor has no collection id.
    pub const COLLECTION_ID: &str = "default";
    /// Owner segment used when a descriptor has no owner name.
    pub const OWNER_NAME: &str = "unknown";
}

/// Extension routing configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtensionConfig {
    pub api_base_url: String,
    pub extension_base_url: String,
    pub api_token: Option<String>,
    pub request_timeout_secs: u64,
    pub mount_route_name: String,
    pub alias_prefix: String,
}

impl Default for ExtensionConfig {
    fn default() -> Self {
        Self {
            api_base_url: endpoints::API.to_string(),
            extension_base_url: endpoints::EXTENSION_ASSETS.to_string(),
            api_token: None,
            request_timeout_secs: defaults::REQUEST_TIMEOUT_SECS,
            mount_route_name: defaults::MOUNT_ROUTE_NAME.to_string(),
            alias_prefix: defaults::ALIAS_PREFIX.to_string(),
        }
    }
}

impl ExtensionConfig {
    /// Defaults overridden by environment variables.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Load a JSON config file, then apply environment overrides.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ExtensionError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|e| {
            ExtensionError::Config(format!("Invalid config {}: {}", path.display(), e))
        })?;
        Ok(config.with_env_overrides().normalized())
    }

    /// Apply any of the `MIRA_*` environment variables that are set.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var(env_vars::API_URL) {
            self.api_base_url = url;
        }
        if let Ok(url) = std::env::var(env_vars::EXTENSION_BASE_URL) {
            self.extension_base_url = url;
        }
        if let Ok(token) = std::env::var(env_vars::API_TOKEN) {
            if !token.is_empty() {
                self.api_token = Some(token);
            }
        }
        if let Some(secs) = std::env::var(env_vars::REQUEST_TIMEOUT_SECS)
            .ok()
            .and_then(|s| s.parse().ok())
        {
            self.request_timeout_secs = secs;
        }
        if let Ok(name) = std::env::var(env_vars::MOUNT_ROUTE) {
            self.mount_route_name = name;
        }
        self.normalized()
    }

    /// Strip trailing slashes from URL-like settings.
    pub fn normalized(mut self) -> Self {
        self.api_base_url = normalize_base_url(&self.api_base_url);
        self.extension_base_url = normalize_base_url(&self.extension_base_url);
        self.alias_prefix = normalize_base_url(&self.alias_prefix);
        self
    }
}

/// Remove trailing `/` so paths can be joined with a single separator.
pub fn normalize_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}
