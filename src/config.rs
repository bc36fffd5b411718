//! Configuration Management
//!
//! Persistent settings for provkit, stored as JSON in the user config
//! directory. Command-line flags override environment variables, which
//! override the file, which overrides built-in defaults.

use crate::cloud::auth::get_default_region;
use crate::tags::{IgnoreTagsConfig, TagMap};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable overriding the endpoint
pub const ENDPOINT_ENV: &str = "PROVKIT_ENDPOINT";

pub const DEFAULT_ENDPOINT: &str = "http://localhost:4566";
pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_CONCURRENCY: usize = 4;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// User configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// Control-plane endpoint
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    /// Bearer token, used when none is set in the environment
    #[serde(default)]
    pub token: Option<String>,
    /// Elements requested per list page
    #[serde(default)]
    pub page_size: Option<u32>,
    /// Manifest entries reconciled at once
    #[serde(default)]
    pub concurrency: Option<usize>,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    /// Tags added to every managed resource
    #[serde(default)]
    pub default_tags: TagMap,
    #[serde(default)]
    pub ignore_tags: IgnoreTagsConfig,
}

impl Config {
    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("provkit").join("config.json"))
    }

    /// Load configuration from the default location.
    ///
    /// A missing file yields the defaults; a file that exists but cannot be
    /// read or parsed is an error.
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load configuration from `path`
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        tracing::debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Get effective endpoint (CLI > env > config > default)
    pub fn effective_endpoint(&self, cli: Option<&str>) -> String {
        cli.map(str::to_string)
            .or_else(|| std::env::var(ENDPOINT_ENV).ok().filter(|v| !v.is_empty()))
            .or_else(|| self.endpoint.clone())
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string())
    }

    /// Get effective region (CLI > env > config > default)
    pub fn effective_region(&self, cli: Option<&str>) -> String {
        cli.map(str::to_string)
            .or_else(get_default_region)
            .or_else(|| self.region.clone())
            .unwrap_or_else(|| DEFAULT_REGION.to_string())
    }

    /// Configured page size; zero means "use each type's default"
    pub fn effective_page_size(&self) -> Option<u32> {
        self.page_size.filter(|s| *s > 0)
    }

    pub fn effective_concurrency(&self) -> usize {
        self.concurrency.filter(|c| *c > 0).unwrap_or(DEFAULT_CONCURRENCY)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(
            self.request_timeout_secs
                .filter(|s| *s > 0)
                .unwrap_or(DEFAULT_TIMEOUT_SECS),
        )
    }
}
