//! Plan and apply tag reconciliation for a manifest
//!
//! Each entry is resolved (read, locate its tag identifier, list its tags)
//! and compared with the desired tags plus provider default tags. Entries
//! run concurrently up to a configured limit; the steps of one entry stay
//! sequential.

use super::desired::{DesiredResource, Manifest};
use super::registry::Registry;
use crate::cloud::client::CloudClient;
use crate::cloud::http::format_api_error;
use crate::context::OperationContext;
use crate::error::is_not_found;
use crate::tags::{sync_tags, IgnoreTagsConfig, ReservedKeys, TagDiff, TagMap, TagService};
use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};

/// Whether changes are only computed or also sent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Plan,
    Apply,
}

/// Settings shared by every entry of a run
#[derive(Debug, Clone)]
pub struct ReconcileSettings {
    pub default_tags: TagMap,
    pub ignore_tags: IgnoreTagsConfig,
    pub page_size: Option<u32>,
    pub concurrency: usize,
}

impl Default for ReconcileSettings {
    fn default() -> Self {
        Self {
            default_tags: TagMap::new(),
            ignore_tags: IgnoreTagsConfig::default(),
            page_size: None,
            concurrency: 4,
        }
    }
}

impl ReconcileSettings {
    fn reserved(&self) -> ReservedKeys {
        ReservedKeys::system().with_ignored(&self.ignore_tags)
    }
}

/// Result of reconciling one entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Tags already match
    Unchanged,
    /// Tags differ; in apply mode the diff was sent
    Changed(TagDiff),
    /// The resource no longer exists
    Missing,
    Failed { error: String },
}

/// Outcome of one manifest entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryReport {
    pub type_name: String,
    pub id: String,
    pub outcome: Outcome,
}

impl EntryReport {
    pub fn is_failure(&self) -> bool {
        matches!(self.outcome, Outcome::Failed { .. })
    }
}

/// Plan or apply every manifest entry. Reports come back in manifest order.
pub async fn reconcile(
    registry: &Registry,
    client: &CloudClient,
    ctx: &OperationContext,
    manifest: &Manifest,
    settings: &ReconcileSettings,
    mode: Mode,
) -> Vec<EntryReport> {
    let limit = settings.concurrency.max(1);
    tracing::info!(
        request_id = %ctx.request_id(),
        entries = manifest.len(),
        concurrency = limit,
        ?mode,
        "reconciling manifest"
    );

    let mut reports: Vec<(usize, EntryReport)> =
        stream::iter(manifest.entries().iter().enumerate())
            .map(move |(index, entry)| async move {
                let child = ctx.child(format!("reconcile {} ({})", entry.type_name, entry.id));
                let result = reconcile_entry(registry, client, &child, entry, settings, mode).await;
                (index, report(entry, result))
            })
            .buffer_unordered(limit)
            .collect()
            .await;

    reports.sort_by_key(|(index, _)| *index);
    reports.into_iter().map(|(_, report)| report).collect()
}

fn report(entry: &DesiredResource, result: Result<Option<TagDiff>>) -> EntryReport {
    let outcome = match result {
        Ok(None) => Outcome::Missing,
        Ok(Some(diff)) if diff.is_empty() => Outcome::Unchanged,
        Ok(Some(diff)) => Outcome::Changed(diff),
        Err(e) if is_not_found(&e) => Outcome::Missing,
        Err(e) => {
            tracing::warn!(
                resource_type = %entry.type_name,
                id = %entry.id,
                "reconcile failed: {:#}",
                e
            );
            Outcome::Failed {
                error: format_api_error(&e),
            }
        },
    };

    EntryReport {
        type_name: entry.type_name.clone(),
        id: entry.id.clone(),
        outcome,
    }
}

/// `Ok(None)` when the resource does not exist
async fn reconcile_entry(
    registry: &Registry,
    client: &CloudClient,
    ctx: &OperationContext,
    entry: &DesiredResource,
    settings: &ReconcileSettings,
    mode: Mode,
) -> Result<Option<TagDiff>> {
    let bound = registry
        .bind(&entry.type_name, client)?
        .with_page_size(settings.page_size);

    let Some(element) = bound.read(ctx, &entry.id).await? else {
        return Ok(None);
    };

    let identifier = bound.tag_identifier(&element)?;
    let tagger = bound.tagger()?;
    let desired = entry.tags.merge_defaults(&settings.default_tags);
    let reserved = settings.reserved();

    let diff = match mode {
        Mode::Plan => {
            let current = tagger
                .list_tags(ctx, &identifier)
                .await
                .with_context(|| format!("listing tags for resource ({})", identifier))?;
            current.diff(&desired, &reserved)
        },
        Mode::Apply => sync_tags(&tagger, ctx, &identifier, &desired, &reserved).await?,
    };

    tracing::debug!(
        request_id = %ctx.request_id(),
        identifier = %identifier,
        changes = diff.change_count(),
        "entry reconciled"
    );
    Ok(Some(diff))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ApiError, NotFoundError};
    use crate::tags::KeyValueTags;

    fn entry() -> DesiredResource {
        DesiredResource {
            type_name: "aws_lb".to_string(),
            id: "web".to_string(),
            tags: KeyValueTags::new(),
        }
    }

    #[test]
    fn test_report_outcomes() {
        assert_eq!(report(&entry(), Ok(None)).outcome, Outcome::Missing);
        assert_eq!(
            report(&entry(), Ok(Some(TagDiff::default()))).outcome,
            Outcome::Unchanged
        );

        let mut diff = TagDiff::default();
        diff.to_remove.insert("old".to_string());
        assert_eq!(
            report(&entry(), Ok(Some(diff.clone()))).outcome,
            Outcome::Changed(diff)
        );
    }

    #[test]
    fn test_not_found_error_is_missing() {
        let err: anyhow::Error = NotFoundError::new("GET elbv2/load-balancers").into();
        let err = err.context("reading aws_lb (web)");
        assert_eq!(report(&entry(), Err(err)).outcome, Outcome::Missing);
    }

    #[test]
    fn test_other_errors_fail_with_id() {
        let err: anyhow::Error = ApiError::from_response(403, r#"{"message": "no"}"#).into();
        let report = report(&entry(), Err(err));
        assert!(report.is_failure());
        assert_eq!(report.id, "web");
    }

    #[test]
    fn test_settings_reserve_ignored_keys() {
        let settings = ReconcileSettings {
            ignore_tags: IgnoreTagsConfig {
                keys: vec!["managed-by".to_string()],
                key_prefixes: vec![],
            },
            ..Default::default()
        };
        let reserved = settings.reserved();
        assert!(reserved.matches("managed-by"));
        assert!(reserved.matches("aws:cloudformation:stack-name"));
        assert!(!reserved.matches("team"));
    }
}
