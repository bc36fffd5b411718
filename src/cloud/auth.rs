//! Credentials and region discovery
//!
//! Resolves the bearer token and default region from, in order, the
//! environment, the user's config file, and the shared credentials file
//! (`<config_dir>/provkit/credentials`, INI-style profiles).

use std::fmt;
use std::path::{Path, PathBuf};

/// Environment variable holding an access token
pub const TOKEN_ENV: &str = "PROVKIT_TOKEN";

/// Environment variable selecting the credentials profile
pub const PROFILE_ENV: &str = "PROVKIT_PROFILE";

/// Where a token came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    Environment,
    Config,
    CredentialsFile,
    Anonymous,
}

/// Access credentials for the control plane
#[derive(Clone)]
pub struct Credentials {
    token: Option<String>,
    source: CredentialSource,
}

impl fmt::Debug for Credentials {
    // Security: never print the token itself
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("token", &self.token.as_ref().map(|_| "***"))
            .field("source", &self.source)
            .finish()
    }
}

impl Credentials {
    /// Credentials that send no Authorization header
    pub fn anonymous() -> Self {
        Self {
            token: None,
            source: CredentialSource::Anonymous,
        }
    }

    pub fn from_token(token: impl Into<String>, source: CredentialSource) -> Self {
        Self {
            token: Some(token.into()),
            source,
        }
    }

    /// Resolve credentials: environment > config token > credentials file
    pub fn resolve(config_token: Option<&str>) -> Self {
        if let Some(token) = non_empty_env(TOKEN_ENV) {
            return Self::from_token(token, CredentialSource::Environment);
        }

        if let Some(token) = config_token.filter(|t| !t.trim().is_empty()) {
            return Self::from_token(token.trim(), CredentialSource::Config);
        }

        let profile = non_empty_env(PROFILE_ENV).unwrap_or_else(|| "default".to_string());
        if let Some(path) = credentials_file_path() {
            if let Some(token) = read_profile_token(&path, &profile) {
                return Self::from_token(token, CredentialSource::CredentialsFile);
            }
        }

        tracing::debug!("No credentials found, sending unauthenticated requests");
        Self::anonymous()
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn source(&self) -> CredentialSource {
        self.source
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Path of the shared credentials file
pub fn credentials_file_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("provkit").join("credentials"))
}

/// Read `token = ...` from the `[profile]` section of a credentials file
pub fn read_profile_token(path: &Path, profile: &str) -> Option<String> {
    let content = std::fs::read_to_string(path).ok()?;
    parse_profile_token(&content, profile)
}

fn parse_profile_token(content: &str, profile: &str) -> Option<String> {
    let header = format!("[{}]", profile);
    let mut in_profile = false;

    for line in content.lines() {
        let line = line.trim();
        // Security: Skip comments and empty lines
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        if line.starts_with('[') {
            in_profile = line == header;
        } else if in_profile {
            if let Some((key, value)) = line.split_once('=') {
                if key.trim() == "token" {
                    let value = value.trim();
                    if !value.is_empty() {
                        return Some(value.to_string());
                    }
                }
            }
        }
    }

    None
}

/// Validate a region name such as `us-east-1` or `eu-central-2`
pub fn validate_region(region: &str) -> bool {
    let parts: Vec<&str> = region.split('-').collect();
    if parts.len() < 3 {
        return false;
    }
    let Some((number, words)) = parts.split_last() else {
        return false;
    };
    !number.is_empty()
        && number.chars().all(|c| c.is_ascii_digit())
        && words
            .iter()
            .all(|w| !w.is_empty() && w.chars().all(|c| c.is_ascii_lowercase()))
}

/// Default region from the environment
/// Security: Validates region format before returning
pub fn get_default_region() -> Option<String> {
    for var in ["PROVKIT_REGION", "AWS_REGION", "AWS_DEFAULT_REGION"] {
        if let Some(region) = non_empty_env(var) {
            if validate_region(&region) {
                return Some(region);
            }
            tracing::warn!("Invalid region format in {}", var);
        }
    }
    None
}
