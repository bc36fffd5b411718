//! Operation Dispatch
//!
//! Maps abstract resource operations to concrete REST URLs.

use super::registry::ResourceDef;
use crate::cloud::client::CloudClient;
use anyhow::{anyhow, Result};
use std::collections::BTreeSet;

/// Query parameter carrying the pagination cursor
pub const CURSOR_PARAM: &str = "nextToken";

/// Query parameter carrying the page size
pub const PAGE_SIZE_PARAM: &str = "maxResults";

/// Query parameter naming tag keys to remove
pub const TAG_KEYS_PARAM: &str = "tagKeys";

/// An operation on a resource type
#[derive(Debug, Clone, Copy)]
pub enum Operation<'a> {
    List {
        cursor: Option<&'a str>,
        page_size: Option<u32>,
    },
    Describe {
        id: &'a str,
    },
    ListTags {
        identifier: &'a str,
    },
    TagResource {
        identifier: &'a str,
    },
    UntagResource {
        identifier: &'a str,
        keys: &'a BTreeSet<String>,
    },
}

impl Operation<'_> {
    /// HTTP method used for this operation
    pub fn method(&self) -> &'static str {
        match self {
            Self::List { .. } | Self::Describe { .. } | Self::ListTags { .. } => "GET",
            Self::TagResource { .. } => "POST",
            Self::UntagResource { .. } => "DELETE",
        }
    }
}

/// Build the URL for `op` on resource type `def`
pub fn operation_url(client: &CloudClient, def: &ResourceDef, op: &Operation<'_>) -> Result<String> {
    match op {
        Operation::List { cursor, page_size } => {
            let url = client.service_url(&def.service, &def.list_path);
            let mut params: Vec<(&str, String)> = def
                .list_params
                .iter()
                .map(|(k, v)| (k.as_str(), v.clone()))
                .collect();
            if let Some(size) = page_size {
                params.push((PAGE_SIZE_PARAM, size.to_string()));
            }
            if let Some(cursor) = cursor {
                params.push((CURSOR_PARAM, cursor.to_string()));
            }
            Ok(add_query_params(&url, &params))
        },
        Operation::Describe { id } => {
            let path = def
                .describe_path
                .as_deref()
                .ok_or_else(|| anyhow!("{} does not support describe", def.type_name))?;
            let path = path.replace("{id}", &urlencoding::encode(id));
            Ok(client.service_url(&def.service, &path))
        },
        Operation::ListTags { identifier } | Operation::TagResource { identifier } => {
            let tags = def
                .tags
                .as_ref()
                .ok_or_else(|| anyhow!("{} does not support tagging", def.type_name))?;
            Ok(client.tags_url(&def.service, &tags.path, identifier))
        },
        Operation::UntagResource { identifier, keys } => {
            let tags = def
                .tags
                .as_ref()
                .ok_or_else(|| anyhow!("{} does not support tagging", def.type_name))?;
            let url = client.tags_url(&def.service, &tags.path, identifier);
            let params: Vec<(&str, String)> =
                keys.iter().map(|k| (TAG_KEYS_PARAM, k.clone())).collect();
            Ok(add_query_params(&url, &params))
        },
    }
}

/// Describe an operation for diagnostics, e.g. `GET sqs/queues`
pub fn describe_operation(def: &ResourceDef, op: &Operation<'_>) -> String {
    let target = match op {
        Operation::List { .. } => def.list_path.clone(),
        Operation::Describe { id } => def
            .describe_path
            .as_deref()
            .unwrap_or(&def.list_path)
            .replace("{id}", id),
        Operation::ListTags { identifier }
        | Operation::TagResource { identifier }
        | Operation::UntagResource { identifier, .. } => {
            let path = def.tags.as_ref().map(|t| t.path.as_str()).unwrap_or("tags");
            format!("{}/{}", path, identifier)
        },
    };
    format!("{} {}/{} ({})", op.method(), def.service, target, def.type_name)
}

fn add_query_params(url: &str, params: &[(&str, String)]) -> String {
    let query_parts: Vec<String> = params
        .iter()
        .filter(|(_, v)| !v.is_empty())
        .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
        .collect();

    if query_parts.is_empty() {
        url.to_string()
    } else if url.contains('?') {
        format!("{}&{}", url, query_parts.join("&"))
    } else {
        format!("{}?{}", url, query_parts.join("&"))
    }
}
