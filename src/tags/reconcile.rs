//! Tag reconciliation
//!
//! Applies a [`TagDiff`] through a resource's tag API. Untagging runs before
//! tagging; the first failing call is returned immediately and the step that
//! already succeeded is not rolled back.

use super::diff::{ReservedKeys, TagDiff, TagMap};
use super::key_value::KeyValueTags;
use crate::context::OperationContext;
use anyhow::{Context, Result};
use std::collections::BTreeSet;

/// Tag read/write capability of a resource API
#[allow(async_fn_in_trait)]
pub trait TagService {
    /// Current tags of the resource, unfiltered
    async fn list_tags(&self, ctx: &OperationContext, identifier: &str) -> Result<KeyValueTags>;

    /// Add or overwrite tags
    async fn tag_resource(
        &self,
        ctx: &OperationContext,
        identifier: &str,
        tags: &TagMap,
    ) -> Result<()>;

    /// Remove tags by key
    async fn untag_resource(
        &self,
        ctx: &OperationContext,
        identifier: &str,
        keys: &BTreeSet<String>,
    ) -> Result<()>;
}

/// Bring the resource's tags from `old` to `new`.
///
/// Keys matched by `reserved` are never sent. Returns the diff that was
/// applied.
pub async fn update_tags<S>(
    service: &S,
    ctx: &OperationContext,
    identifier: &str,
    old: &KeyValueTags,
    new: &KeyValueTags,
    reserved: &ReservedKeys,
) -> Result<TagDiff>
where
    S: TagService,
{
    let diff = old.diff(new, reserved);

    if !diff.to_remove.is_empty() {
        tracing::debug!(
            request_id = %ctx.request_id(),
            identifier,
            keys = ?diff.to_remove,
            "untagging resource"
        );
        service
            .untag_resource(ctx, identifier, &diff.to_remove)
            .await
            .with_context(|| format!("untagging resource ({})", identifier))?;
    }

    if !diff.to_upsert.is_empty() {
        tracing::debug!(
            request_id = %ctx.request_id(),
            identifier,
            count = diff.to_upsert.len(),
            "tagging resource"
        );
        service
            .tag_resource(ctx, identifier, &diff.to_upsert)
            .await
            .with_context(|| format!("tagging resource ({})", identifier))?;
    }

    Ok(diff)
}

/// Read the resource's current tags and reconcile them to `desired`
pub async fn sync_tags<S>(
    service: &S,
    ctx: &OperationContext,
    identifier: &str,
    desired: &KeyValueTags,
    reserved: &ReservedKeys,
) -> Result<TagDiff>
where
    S: TagService,
{
    let current = service
        .list_tags(ctx, identifier)
        .await
        .with_context(|| format!("listing tags for resource ({})", identifier))?;

    update_tags(service, ctx, identifier, &current, desired, reserved).await
}
