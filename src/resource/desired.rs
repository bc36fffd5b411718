//! Desired-state manifest
//!
//! A YAML file listing resources and the tags they should carry. Entries are
//! validated against the registry when the file is loaded, so the plan and
//! apply steps only ever see well-formed input.

use super::registry::Registry;
use crate::tags::{KeyValueTags, TagMap, TagValidationError};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// Manifest entry as written in the file
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawEntry {
    #[serde(rename = "type")]
    type_name: String,
    id: String,
    #[serde(default)]
    tags: TagMap,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawManifest {
    #[serde(default)]
    resources: Vec<RawEntry>,
}

/// Why a manifest entry was rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ManifestError {
    #[error("entry {index}: unknown resource type '{type_name}'")]
    UnknownType { index: usize, type_name: String },

    #[error("entry {index}: {type_name} does not support tagging")]
    NotTaggable { index: usize, type_name: String },

    #[error("entry {index}: id must not be empty")]
    EmptyId { index: usize },

    #[error("entry {index} ({id}): {source}")]
    InvalidTags {
        index: usize,
        id: String,
        #[source]
        source: TagValidationError,
    },
}

/// One validated manifest entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesiredResource {
    pub type_name: String,
    pub id: String,
    pub tags: KeyValueTags,
}

/// Validated manifest
#[derive(Debug, Clone, Default)]
pub struct Manifest {
    entries: Vec<DesiredResource>,
}

impl Manifest {
    /// Load and validate a manifest file
    pub fn load(path: &Path, registry: &Registry) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest {}", path.display()))?;
        Self::parse(&content, registry)
            .with_context(|| format!("Invalid manifest {}", path.display()))
    }

    /// Parse and validate manifest YAML
    pub fn parse(content: &str, registry: &Registry) -> Result<Self> {
        let raw: RawManifest = serde_yaml::from_str(content).context("Failed to parse manifest")?;

        let mut entries = Vec::with_capacity(raw.resources.len());
        for (index, entry) in raw.resources.into_iter().enumerate() {
            entries.push(validate_entry(index, entry, registry)?);
        }

        tracing::debug!(entries = entries.len(), "manifest loaded");
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[DesiredResource] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn validate_entry(
    index: usize,
    entry: RawEntry,
    registry: &Registry,
) -> Result<DesiredResource, ManifestError> {
    let Some(def) = registry.get(&entry.type_name) else {
        return Err(ManifestError::UnknownType {
            index,
            type_name: entry.type_name,
        });
    };
    if !def.supports_tags() {
        return Err(ManifestError::NotTaggable {
            index,
            type_name: entry.type_name,
        });
    }

    let id = entry.id.trim().to_string();
    if id.is_empty() {
        return Err(ManifestError::EmptyId { index });
    }

    let tags = KeyValueTags::from(entry.tags);
    if let Err(source) = tags.validate() {
        return Err(ManifestError::InvalidTags { index, id, source });
    }

    Ok(DesiredResource {
        type_name: entry.type_name,
        id,
        tags,
    })
}
