//! Key-value tags
//!
//! Wraps a tag map with the filtering rules every resource applies on read:
//! drop system tags, drop ignored tags, merge and strip provider default tags.

use super::diff::{diff_tags, ReservedKeys, TagDiff, TagMap};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Prefix of tags managed by the cloud provider
pub const SYSTEM_TAG_PREFIX: &str = "aws:";

/// Maximum number of user tags on one resource
pub const MAX_TAGS: usize = 50;

/// Maximum tag key length, in characters
pub const MAX_KEY_LEN: usize = 128;

/// Maximum tag value length, in characters
pub const MAX_VALUE_LEN: usize = 256;

/// Tags to leave alone entirely (neither read back nor reconciled)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IgnoreTagsConfig {
    #[serde(default)]
    pub keys: Vec<String>,
    #[serde(default)]
    pub key_prefixes: Vec<String>,
}

impl IgnoreTagsConfig {
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty() && self.key_prefixes.is_empty()
    }

    pub fn matches(&self, key: &str) -> bool {
        self.keys.iter().any(|k| k == key)
            || self.key_prefixes.iter().any(|p| key.starts_with(p.as_str()))
    }
}

/// Tag validation failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TagValidationError {
    #[error("too many tags: {count} (maximum {max})", max = MAX_TAGS)]
    TooMany { count: usize },

    #[error("tag key must not be empty")]
    EmptyKey,

    #[error("tag key '{key}' is {len} characters (maximum {max})", max = MAX_KEY_LEN)]
    KeyTooLong { key: String, len: usize },

    #[error("value of tag '{key}' is {len} characters (maximum {max})", max = MAX_VALUE_LEN)]
    ValueTooLong { key: String, len: usize },

    #[error("tag key '{key}' uses the reserved prefix '{prefix}'", prefix = SYSTEM_TAG_PREFIX)]
    ReservedPrefix { key: String },
}

/// A resource's tags
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyValueTags(TagMap);

impl KeyValueTags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(|v| v.as_str())
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(|k| k.as_str())
    }

    pub fn as_map(&self) -> &TagMap {
        &self.0
    }

    pub fn into_map(self) -> TagMap {
        self.0
    }

    fn retain<F: Fn(&str, &str) -> bool>(self, keep: F) -> Self {
        Self(self.0.into_iter().filter(|(k, v)| keep(k, v)).collect())
    }

    /// Drop tags managed by the cloud provider
    pub fn ignore_system(self) -> Self {
        self.retain(|k, _| !k.starts_with(SYSTEM_TAG_PREFIX))
    }

    /// Drop tags named by the ignore configuration
    pub fn ignore(self, config: &IgnoreTagsConfig) -> Self {
        if config.is_empty() {
            return self;
        }
        self.retain(|k, _| !config.matches(k))
    }

    /// Combine provider default tags with these tags; these win on conflict
    pub fn merge_defaults(&self, defaults: &TagMap) -> Self {
        let mut merged = defaults.clone();
        merged.extend(self.0.iter().map(|(k, v)| (k.clone(), v.clone())));
        Self(merged)
    }

    /// Drop tags that only exist because of provider default tags
    pub fn remove_defaults(self, defaults: &TagMap) -> Self {
        self.retain(|k, v| defaults.get(k).map(|d| d != v).unwrap_or(true))
    }

    /// Changes needed to go from these tags to `desired`
    pub fn diff(&self, desired: &KeyValueTags, reserved: &ReservedKeys) -> TagDiff {
        diff_tags(&self.0, &desired.0, |k| reserved.matches(k))
    }

    /// Check tag count, key/value lengths and the reserved prefix
    pub fn validate(&self) -> Result<(), TagValidationError> {
        if self.0.len() > MAX_TAGS {
            return Err(TagValidationError::TooMany {
                count: self.0.len(),
            });
        }

        for (key, value) in &self.0 {
            let key_len = key.chars().count();
            if key_len == 0 {
                return Err(TagValidationError::EmptyKey);
            }
            if key_len > MAX_KEY_LEN {
                return Err(TagValidationError::KeyTooLong {
                    key: key.clone(),
                    len: key_len,
                });
            }
            if key.starts_with(SYSTEM_TAG_PREFIX) {
                return Err(TagValidationError::ReservedPrefix { key: key.clone() });
            }
            let value_len = value.chars().count();
            if value_len > MAX_VALUE_LEN {
                return Err(TagValidationError::ValueTooLong {
                    key: key.clone(),
                    len: value_len,
                });
            }
        }

        Ok(())
    }
}

impl From<TagMap> for KeyValueTags {
    fn from(map: TagMap) -> Self {
        Self(map)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for KeyValueTags {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}
