//! Remote tag API of a resource type

use super::dispatch::{operation_url, Operation};
use super::registry::ResourceDef;
use crate::cloud::client::CloudClient;
use crate::context::OperationContext;
use crate::tags::{KeyValueTags, TagMap, TagService};
use anyhow::{Context, Result};
use serde_json::{json, Value};
use std::collections::BTreeSet;

/// [`TagService`] backed by a service's `tags/{identifier}` endpoint
pub struct RemoteTagService<'a> {
    client: &'a CloudClient,
    def: &'a ResourceDef,
}

impl<'a> RemoteTagService<'a> {
    pub fn new(client: &'a CloudClient, def: &'a ResourceDef) -> Self {
        Self { client, def }
    }
}

fn parse_tags(response: Value) -> Result<KeyValueTags> {
    match response.get("tags") {
        None | Some(Value::Null) => Ok(KeyValueTags::new()),
        Some(tags) => {
            let map: TagMap =
                serde_json::from_value(tags.clone()).context("Failed to parse tag list")?;
            Ok(map.into())
        },
    }
}

impl TagService for RemoteTagService<'_> {
    async fn list_tags(&self, ctx: &OperationContext, identifier: &str) -> Result<KeyValueTags> {
        let url = operation_url(self.client, self.def, &Operation::ListTags { identifier })?;
        let response = self.client.get(ctx, &url).await?;
        parse_tags(response)
    }

    async fn tag_resource(
        &self,
        ctx: &OperationContext,
        identifier: &str,
        tags: &TagMap,
    ) -> Result<()> {
        let url = operation_url(self.client, self.def, &Operation::TagResource { identifier })?;
        let body = json!({ "tags": tags });
        self.client.post(ctx, &url, Some(&body)).await?;
        Ok(())
    }

    async fn untag_resource(
        &self,
        ctx: &OperationContext,
        identifier: &str,
        keys: &BTreeSet<String>,
    ) -> Result<()> {
        let url = operation_url(
            self.client,
            self.def,
            &Operation::UntagResource { identifier, keys },
        )?;
        self.client.delete(ctx, &url).await?;
        Ok(())
    }
}
