//! Resource abstraction layer
//!
//! Resource types are described by data, not code. Each service package is
//! an embedded JSON file naming the list/describe/tag endpoints of its types;
//! the generic finders and tag reconciler do the rest.
//!
//! # Architecture
//!
//! - [`registry`] - Loads resource definitions from embedded JSON
//! - [`dispatch`] - Maps abstract operations to concrete REST URLs
//! - [`fetcher`] - Remote page source and the bound resource handle
//! - [`tagging`] - Remote tag service
//! - [`desired`] - Desired-state manifest, validated on load
//! - [`apply`] - Plan/apply of tag reconciliation across a manifest
//!
//! # Resource Definitions
//!
//! Definitions live under `src/resources/`, one file per service package
//! (`sqs.json`, `route53.json`, ...).
//!
//! # Example
//!
//! ```ignore
//! use provkit::resource::Registry;
//!
//! async fn list_queues(client: &CloudClient) -> anyhow::Result<Vec<serde_json::Value>> {
//!     let registry = Registry::load()?;
//!     let ctx = OperationContext::new("list aws_sqs_queue");
//!     registry.bind("aws_sqs_queue", client)?.list(&ctx).await
//! }
//! ```

pub mod apply;
pub mod desired;
pub mod dispatch;
pub mod fetcher;
pub mod registry;
pub mod tagging;

pub use apply::{reconcile, EntryReport, Mode, Outcome, ReconcileSettings};
pub use desired::{DesiredResource, Manifest, ManifestError};
pub use fetcher::{extract_json_value, BoundResource, RemotePages};
pub use registry::{Registry, ResourceDef, ResourceKind};
pub use tagging::RemoteTagService;
