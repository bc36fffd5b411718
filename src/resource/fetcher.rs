//! Resource Fetcher
//!
//! Drives the generic finders against a resource type's list API.

use super::dispatch::{describe_operation, operation_url, Operation, CURSOR_PARAM};
use super::registry::ResourceDef;
use super::tagging::RemoteTagService;
use crate::cloud::client::CloudClient;
use crate::context::OperationContext;
use crate::error::{is_not_found, not_found_from_api, route_error_from_api};
use crate::finder::{find_all, find_first, find_single, Page, PageSource};
use anyhow::{anyhow, Context, Result};
use serde_json::Value;

/// Page source over a resource type's list endpoint
pub struct RemotePages<'a> {
    client: &'a CloudClient,
    def: &'a ResourceDef,
    page_size: Option<u32>,
}

impl<'a> RemotePages<'a> {
    pub fn new(client: &'a CloudClient, def: &'a ResourceDef, page_size: Option<u32>) -> Self {
        Self {
            client,
            def,
            page_size,
        }
    }
}

impl PageSource for RemotePages<'_> {
    type Item = Value;

    async fn fetch_page(&mut self, ctx: &OperationContext, cursor: Option<String>) -> Result<Page<Value>> {
        let op = Operation::List {
            cursor: cursor.as_deref(),
            page_size: self.page_size,
        };
        let url = operation_url(self.client, self.def, &op)?;
        // A missing listing is a broken route, never a missing element
        let response = self
            .client
            .get(ctx, &url)
            .await
            .map_err(|e| route_error_from_api(e, &self.describe()))?;

        let next_cursor = response
            .get(CURSOR_PARAM)
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string());

        Ok(match extract_items(&response, &self.def.response_path) {
            Some(items) => Page::with_gaps(items, next_cursor),
            None => Page::empty(next_cursor),
        })
    }

    fn describe(&self) -> String {
        describe_operation(
            self.def,
            &Operation::List {
                cursor: None,
                page_size: None,
            },
        )
    }
}

/// Extract the element array at `path` (dot notation).
///
/// A missing or `null` array yields `None`; `null` elements become `None`.
fn extract_items(response: &Value, path: &str) -> Option<Vec<Option<Value>>> {
    let mut current = response;
    if !path.is_empty() {
        for part in path.split('.') {
            current = current.get(part)?;
        }
    }

    let array = current.as_array()?;
    Some(
        array
            .iter()
            .map(|item| if item.is_null() { None } else { Some(item.clone()) })
            .collect(),
    )
}

/// Extract a scalar at a dot-notation path as a string, if present
pub fn extract_field(item: &Value, path: &str) -> Option<String> {
    let mut current = item;
    for part in path.split('.') {
        current = if let Ok(idx) = part.parse::<usize>() {
            current.get(idx)?
        } else {
            current.get(part)?
        };
    }

    match current {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Extract a value from JSON using a dot-notation path, for display
pub fn extract_json_value(item: &Value, path: &str) -> String {
    let mut current = item;
    for part in path.split('.') {
        let next = if let Ok(idx) = part.parse::<usize>() {
            current.get(idx)
        } else {
            current.get(part)
        };
        current = match next {
            Some(v) => v,
            None => return "-".to_string(),
        };
    }

    match current {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "-".to_string(),
        Value::Array(arr) => format!("[{} items]", arr.len()),
        Value::Object(_) => "[object]".to_string(),
    }
}

/// A resource type bound to a client
#[derive(Clone, Copy)]
pub struct BoundResource<'a> {
    def: &'a ResourceDef,
    client: &'a CloudClient,
    page_size: Option<u32>,
}

impl<'a> BoundResource<'a> {
    pub fn new(def: &'a ResourceDef, client: &'a CloudClient) -> Self {
        Self {
            def,
            client,
            page_size: def.page_size.filter(|s| *s > 0),
        }
    }

    /// Request at most `size` elements per page (never more than the type allows).
    /// Zero means "use the type's default".
    pub fn with_page_size(mut self, size: Option<u32>) -> Self {
        let size = size.filter(|s| *s > 0);
        let max = self.def.page_size.filter(|s| *s > 0);
        self.page_size = match (size, max) {
            (Some(requested), Some(max)) => Some(requested.min(max)),
            (Some(requested), None) => Some(requested),
            (None, max) => max,
        };
        self
    }

    pub fn def(&self) -> &'a ResourceDef {
        self.def
    }

    pub fn page_size(&self) -> Option<u32> {
        self.page_size
    }

    /// Fresh page source over the list endpoint
    pub fn pages(&self) -> RemotePages<'a> {
        RemotePages::new(self.client, self.def, self.page_size)
    }

    /// Every element of this type
    pub async fn list(&self, ctx: &OperationContext) -> Result<Vec<Value>> {
        find_all(ctx, &mut self.pages(), |_| true).await
    }

    /// Find the element whose id field equals `id`, stopping at the first match
    pub async fn find(&self, ctx: &OperationContext, id: &str) -> Result<Value> {
        let id_field = self.def.id_field.as_str();
        find_first(ctx, &mut self.pages(), |item| {
            extract_field(item, id_field).as_deref() == Some(id)
        })
        .await
    }

    /// Find the only element whose name field equals `name`
    pub async fn find_by_name(&self, ctx: &OperationContext, name: &str) -> Result<Value> {
        let name_field = self.def.name_field.as_str();
        find_single(ctx, &mut self.pages(), |item| {
            extract_field(item, name_field).as_deref() == Some(name)
        })
        .await
    }

    /// Look up one resource, through the describe endpoint when there is one
    pub async fn describe(&self, ctx: &OperationContext, id: &str) -> Result<Value> {
        if self.def.describe_path.is_none() {
            return self.find(ctx, id).await;
        }

        let op = Operation::Describe { id };
        let url = operation_url(self.client, self.def, &op)?;
        let response = self
            .client
            .get(ctx, &url)
            .await
            .map_err(|e| not_found_from_api(e, &describe_operation(self.def, &op)))?;

        if response.is_null() {
            return self.find(ctx, id).await;
        }
        Ok(response)
    }

    /// Read one resource; `None` means it no longer exists
    pub async fn read(&self, ctx: &OperationContext, id: &str) -> Result<Option<Value>> {
        match self.describe(ctx, id).await {
            Ok(found) => Ok(Some(found)),
            Err(e) if is_not_found(&e) => {
                tracing::info!(
                    request_id = %ctx.request_id(),
                    resource_type = %self.def.type_name,
                    id,
                    "resource not found, removing from state"
                );
                Ok(None)
            },
            Err(e) => Err(e).with_context(|| format!("reading {} ({})", self.def.type_name, id)),
        }
    }

    /// Identifier the tag API expects for `element`
    pub fn tag_identifier(&self, element: &Value) -> Result<String> {
        let tags = self
            .def
            .tags
            .as_ref()
            .ok_or_else(|| anyhow!("{} does not support tagging", self.def.type_name))?;
        extract_field(element, &tags.identifier_attribute).with_context(|| {
            format!(
                "{} element has no {} attribute",
                self.def.type_name, tags.identifier_attribute
            )
        })
    }

    /// Tag API of this type
    pub fn tagger(&self) -> Result<RemoteTagService<'a>> {
        if !self.def.supports_tags() {
            return Err(anyhow!("{} does not support tagging", self.def.type_name));
        }
        Ok(RemoteTagService::new(self.client, self.def))
    }
}
