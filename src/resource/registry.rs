//! Resource Registry - Load resource definitions from JSON
//!
//! Every service package is one embedded JSON file. The registry is built
//! once at startup and handed around by reference; nothing mutates it.

use super::fetcher::BoundResource;
use crate::cloud::client::CloudClient;
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};

/// Embedded service package files (compiled into the binary)
const RESOURCE_FILES: &[(&str, &str)] = &[
    ("backup.json", include_str!("../resources/backup.json")),
    ("elbv2.json", include_str!("../resources/elbv2.json")),
    ("grafana.json", include_str!("../resources/grafana.json")),
    ("memorydb.json", include_str!("../resources/memorydb.json")),
    ("route53.json", include_str!("../resources/route53.json")),
    ("s3.json", include_str!("../resources/s3.json")),
    ("sqs.json", include_str!("../resources/sqs.json")),
    ("ssm.json", include_str!("../resources/ssm.json")),
    ("sts.json", include_str!("../resources/sts.json")),
];

fn default_tags_path() -> String {
    "tags".to_string()
}

/// Whether a type has a lifecycle or is a read-only query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    #[default]
    Resource,
    DataSource,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Resource => "resource",
            Self::DataSource => "data source",
        }
    }
}

/// Tagging capability of a resource type
#[derive(Debug, Clone, Deserialize)]
pub struct TagsDef {
    /// Attribute of a listed element that identifies it to the tag API
    pub identifier_attribute: String,
    /// Path of the tag API under the service, before the identifier
    #[serde(default = "default_tags_path")]
    pub path: String,
}

/// Resource definition from JSON
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceDef {
    /// Logical type name, filled from the map key
    #[serde(skip)]
    pub type_name: String,
    /// Service package, filled from the file
    #[serde(skip)]
    pub service: String,
    pub display_name: String,
    #[serde(default)]
    pub kind: ResourceKind,
    pub list_path: String,
    /// Extra query parameters sent with every list call
    #[serde(default)]
    pub list_params: BTreeMap<String, String>,
    /// Dot path of the element array in a list response
    pub response_path: String,
    pub id_field: String,
    pub name_field: String,
    /// Single-resource lookup path, `{id}` is replaced by the identifier
    #[serde(default)]
    pub describe_path: Option<String>,
    #[serde(default)]
    pub page_size: Option<u32>,
    #[serde(default)]
    pub tags: Option<TagsDef>,
}

impl ResourceDef {
    pub fn supports_tags(&self) -> bool {
        self.tags.is_some()
    }

    pub fn is_data_source(&self) -> bool {
        self.kind == ResourceKind::DataSource
    }

    fn validate(&self) -> Result<()> {
        if self.id_field.is_empty() {
            bail!("{}: id_field must not be empty", self.type_name);
        }
        if self.list_path.is_empty() {
            bail!("{}: list_path must not be empty", self.type_name);
        }
        if let Some(path) = &self.describe_path {
            if !path.contains("{id}") {
                bail!("{}: describe_path must contain {{id}}", self.type_name);
            }
        }
        if let Some(tags) = &self.tags {
            if self.is_data_source() {
                bail!("{}: data sources cannot declare tags", self.type_name);
            }
            if tags.identifier_attribute.is_empty() {
                bail!("{}: tags.identifier_attribute must not be empty", self.type_name);
            }
        }
        Ok(())
    }
}

/// Root structure of resources/*.json
#[derive(Debug, Deserialize)]
struct ServicePackageFile {
    service: String,
    #[serde(default)]
    resources: HashMap<String, ResourceDef>,
}

/// Resource types of one service, sorted by name
#[derive(Debug, Clone)]
pub struct ServicePackage<'a> {
    pub name: &'a str,
    pub resources: Vec<&'a ResourceDef>,
    pub data_sources: Vec<&'a ResourceDef>,
}

/// Lookup table from type name to definition
#[derive(Debug, Clone, Default)]
pub struct Registry {
    resources: HashMap<String, ResourceDef>,
}

impl Registry {
    /// Build the registry from the embedded service packages
    pub fn load() -> Result<Self> {
        Self::from_sources(RESOURCE_FILES)
    }

    /// Build a registry from `(file name, JSON)` pairs
    pub fn from_sources(sources: &[(&str, &str)]) -> Result<Self> {
        let mut resources = HashMap::new();

        for (file, content) in sources {
            let package: ServicePackageFile = serde_json::from_str(content)
                .with_context(|| format!("Failed to parse resource file {}", file))?;

            for (type_name, mut def) in package.resources {
                def.type_name = type_name.clone();
                def.service = package.service.clone();
                def.validate().with_context(|| format!("Invalid definition in {}", file))?;

                if resources.contains_key(&type_name) {
                    bail!("Duplicate resource type {} in {}", type_name, file);
                }
                resources.insert(type_name, def);
            }
        }

        tracing::debug!(count = resources.len(), "resource registry loaded");
        Ok(Self { resources })
    }

    /// Get a resource definition by type name
    pub fn get(&self, type_name: &str) -> Option<&ResourceDef> {
        self.resources.get(type_name)
    }

    /// Get a resource definition or fail with a readable error
    pub fn require(&self, type_name: &str) -> Result<&ResourceDef> {
        self.get(type_name)
            .with_context(|| format!("Unknown resource type: {}", type_name))
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// All type names, sorted (for listings and completion)
    pub fn type_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.resources.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Definitions grouped by service package, sorted by service name
    pub fn services(&self) -> Vec<ServicePackage<'_>> {
        let mut by_service: BTreeMap<&str, ServicePackage<'_>> = BTreeMap::new();

        for name in self.type_names() {
            let Some(def) = self.resources.get(name) else {
                continue;
            };
            let package = by_service
                .entry(def.service.as_str())
                .or_insert_with(|| ServicePackage {
                    name: def.service.as_str(),
                    resources: Vec::new(),
                    data_sources: Vec::new(),
                });
            match def.kind {
                ResourceKind::Resource => package.resources.push(def),
                ResourceKind::DataSource => package.data_sources.push(def),
            }
        }

        by_service.into_values().collect()
    }

    /// Bind a type to a client, producing a handle that can list, find and tag
    pub fn bind<'a>(&'a self, type_name: &str, client: &'a CloudClient) -> Result<BoundResource<'a>> {
        let def = self.require(type_name)?;
        Ok(BoundResource::new(def, client))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_loads_successfully() {
        let registry = Registry::load().unwrap();
        assert!(!registry.is_empty(), "Registry should have resources");
    }

    #[test]
    fn test_sqs_queue_resource_exists() {
        let registry = Registry::load().unwrap();
        let resource = registry.get("aws_sqs_queue").expect("SQS queue should exist");

        assert_eq!(resource.display_name, "SQS Queue");
        assert_eq!(resource.service, "sqs");
        assert_eq!(resource.type_name, "aws_sqs_queue");
        assert!(resource.supports_tags());
        assert_eq!(resource.tags.as_ref().unwrap().path, "tags");
    }

    #[test]
    fn test_data_sources_have_no_tags() {
        let registry = Registry::load().unwrap();
        let identity = registry.get("aws_caller_identity").unwrap();
        assert!(identity.is_data_source());
        assert!(!identity.supports_tags());
    }

    #[test]
    fn test_type_names_sorted() {
        let registry = Registry::load().unwrap();
        let names = registry.type_names();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
        assert!(names.contains(&"aws_lb"));
    }

    #[test]
    fn test_services_grouping() {
        let registry = Registry::load().unwrap();
        let services = registry.services();
        let sqs = services.iter().find(|s| s.name == "sqs").unwrap();
        assert_eq!(sqs.resources.len(), 1);
        assert_eq!(sqs.data_sources.len(), 1);

        let total: usize = services
            .iter()
            .map(|s| s.resources.len() + s.data_sources.len())
            .sum();
        assert_eq!(total, registry.len());
    }

    #[test]
    fn test_duplicate_type_names_rejected() {
        let a = r#"{"service": "a", "resources": {"x_thing": {
            "display_name": "X", "list_path": "things", "response_path": "things",
            "id_field": "id", "name_field": "name"}}}"#;
        let err = Registry::from_sources(&[("a.json", a), ("b.json", a)]).unwrap_err();
        assert!(err.to_string().contains("Duplicate resource type x_thing"));
    }

    #[test]
    fn test_tagged_data_source_rejected() {
        let bad = r#"{"service": "a", "resources": {"x_things": {
            "display_name": "X", "kind": "data_source", "list_path": "things",
            "response_path": "things", "id_field": "id", "name_field": "name",
            "tags": {"identifier_attribute": "arn"}}}}"#;
        assert!(Registry::from_sources(&[("a.json", bad)]).is_err());
    }

    #[test]
    fn test_describe_path_needs_placeholder() {
        let bad = r#"{"service": "a", "resources": {"x_thing": {
            "display_name": "X", "list_path": "things", "response_path": "things",
            "id_field": "id", "name_field": "name", "describe_path": "things/one"}}}"#;
        assert!(Registry::from_sources(&[("a.json", bad)]).is_err());
    }

    #[test]
    fn test_require_unknown_type() {
        let registry = Registry::load().unwrap();
        let err = registry.require("aws_nope").unwrap_err();
        assert_eq!(err.to_string(), "Unknown resource type: aws_nope");
    }
}
