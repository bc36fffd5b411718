//! Tag handling
//!
//! - [`diff`] - Tag set differ with reserved-key exclusion
//! - [`key_value`] - Tag map with system/ignore/default filtering and validation
//! - [`reconcile`] - Applies a diff through a resource's tag API

pub mod diff;
pub mod key_value;
pub mod reconcile;

pub use diff::{diff_tags, ReservedKeys, TagDiff, TagMap};
pub use key_value::{IgnoreTagsConfig, KeyValueTags, TagValidationError};
pub use reconcile::{sync_tags, update_tags, TagService};
