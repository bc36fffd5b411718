//! provkit - resource lookup and tag reconciliation for a JSON cloud control plane
//!
//! - [`finder`] - Paginated search (first match, all matches, single match)
//! - [`tags`] - Tag diffing, filtering and reconciliation
//! - [`error`] - Not-found / too-many-results / API error classification
//! - [`cloud`] - HTTP client, credentials and URL building
//! - [`resource`] - Data-driven resource registry, manifests and plan/apply
//! - [`config`] - Persistent settings

pub mod cloud;
pub mod config;
pub mod context;
pub mod error;
pub mod finder;
pub mod resource;
pub mod tags;

/// Version injected at compile time via PROVKIT_VERSION env var (set by CI/CD),
/// or "dev" for local builds.
pub const VERSION: &str = match option_env!("PROVKIT_VERSION") {
    Some(v) => v,
    None => "dev",
};
