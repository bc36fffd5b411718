//! Tag set differ

use super::key_value::{IgnoreTagsConfig, SYSTEM_TAG_PREFIX};
use std::collections::{BTreeMap, BTreeSet};

/// Plain tag mapping, key -> value
pub type TagMap = BTreeMap<String, String>;

/// Keys that reconciliation must never touch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReservedKeys {
    keys: BTreeSet<String>,
    prefixes: Vec<String>,
}

impl ReservedKeys {
    /// Nothing reserved
    pub fn none() -> Self {
        Self::default()
    }

    /// Keys managed by the cloud provider itself (`aws:` prefix)
    pub fn system() -> Self {
        Self::none().with_prefix(SYSTEM_TAG_PREFIX)
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.keys.insert(key.into());
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefixes.push(prefix.into());
        self
    }

    /// Also reserve everything an ignore-tags configuration names
    pub fn with_ignored(mut self, ignore: &IgnoreTagsConfig) -> Self {
        self.keys.extend(ignore.keys.iter().cloned());
        self.prefixes.extend(ignore.key_prefixes.iter().cloned());
        self
    }

    pub fn matches(&self, key: &str) -> bool {
        self.keys.contains(key) || self.prefixes.iter().any(|p| key.starts_with(p.as_str()))
    }
}

/// Changes needed to turn one tag set into another
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagDiff {
    /// Keys to untag
    pub to_remove: BTreeSet<String>,
    /// Entries to add or overwrite
    pub to_upsert: TagMap,
}

impl TagDiff {
    pub fn is_empty(&self) -> bool {
        self.to_remove.is_empty() && self.to_upsert.is_empty()
    }

    pub fn change_count(&self) -> usize {
        self.to_remove.len() + self.to_upsert.len()
    }
}

/// Diff `old` against `new`, skipping every key `reserved` matches.
///
/// Keys only in `old` are removed. Keys only in `new`, or in both with a
/// different value, are upserted.
pub fn diff_tags<F>(old: &TagMap, new: &TagMap, reserved: F) -> TagDiff
where
    F: Fn(&str) -> bool,
{
    let to_remove = old
        .keys()
        .filter(|k| !reserved(k.as_str()) && !new.contains_key(k.as_str()))
        .cloned()
        .collect();

    let to_upsert = new
        .iter()
        .filter(|(k, v)| !reserved(k.as_str()) && old.get(k.as_str()) != Some(*v))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    TagDiff {
        to_remove,
        to_upsert,
    }
}
