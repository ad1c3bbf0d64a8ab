//! NuGet v3 wire models
//!
//! Only the fields this crate reads are modelled. Unknown fields are ignored.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::version::nuget::Version;
use crate::version::range::VersionRange;

pub const CATALOG_ROOT_TYPE: &str = "catalog:CatalogRoot";

const SEVERITY_NAMES: [&str; 4] = ["Low", "Moderate", "High", "Critical"];

/// `index.json` at the root of a v3 feed
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ServiceIndex {
    pub version: String,
    #[serde(default)]
    pub resources: Vec<Resource>,
}

impl ServiceIndex {
    /// First resource whose `@type` matches exactly
    pub fn find_resource(&self, resource_type: &str) -> Option<&Resource> {
        self.resources
            .iter()
            .find(|resource| resource.resource_type == resource_type)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Resource {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "@type")]
    pub resource_type: String,
    #[serde(default)]
    pub comment: Option<String>,
}

/// Registration index of one package (`{base}/{id}/index.json`), also the
/// shape of a catalog root
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationIndex {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(default)]
    pub count: usize,
    #[serde(default)]
    pub items: Vec<RegistrationPage>,
    #[serde(default)]
    pub commit_id: Option<String>,
    #[serde(default, rename = "commitTimeStamp")]
    pub commit_timestamp: Option<String>,
}

/// A page covering the versions between `lower` and `upper`.
///
/// `items` is only present when the page is inlined in its index.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationPage {
    #[serde(rename = "@id")]
    pub id: String,
    pub lower: Version,
    pub upper: Version,
    #[serde(default)]
    pub count: usize,
    #[serde(default)]
    pub items: Option<Vec<CatalogItem>>,
    #[serde(default)]
    pub commit_id: Option<String>,
    #[serde(default, rename = "commitTimeStamp")]
    pub commit_timestamp: Option<String>,
}

impl RegistrationPage {
    pub fn version_range(&self) -> VersionRange {
        VersionRange::between(self.lower.clone(), self.upper.clone())
    }
}

/// Standalone catalog page document fetched by a page `@id`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CatalogPage {
    #[serde(rename = "@id", default)]
    pub id: Option<String>,
    #[serde(default)]
    pub count: Option<usize>,
    #[serde(default)]
    pub lower: Option<Version>,
    #[serde(default)]
    pub upper: Option<Version>,
    #[serde(default)]
    pub items: Vec<CatalogItem>,
}

/// Registration leaf wrapping one published version
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
    #[serde(rename = "@id", default)]
    pub id: Option<String>,
    #[serde(default)]
    pub commit_id: Option<String>,
    #[serde(default, rename = "commitTimeStamp")]
    pub commit_timestamp: Option<String>,
    #[serde(default)]
    pub package_content: Option<String>,
    pub catalog_entry: CatalogEntry,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    #[serde(rename = "@id", default)]
    pub url: Option<String>,
    pub id: String,
    pub version: Version,
    #[serde(default)]
    pub listed: Option<bool>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub dependency_groups: Vec<DependencyGroup>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub vulnerabilities: Vec<Vulnerability>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyGroup {
    #[serde(default, deserialize_with = "lowercase_framework")]
    pub target_framework: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub dependencies: Vec<Dependency>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Dependency {
    pub id: String,
    /// Missing range means any version
    #[serde(default, deserialize_with = "range_or_unbounded")]
    pub range: VersionRange,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vulnerability {
    pub advisory_url: String,
    #[serde(deserialize_with = "severity_level")]
    pub severity: u8,
}

impl Vulnerability {
    pub fn severity_name(&self) -> &'static str {
        SEVERITY_NAMES
            .get(usize::from(self.severity))
            .copied()
            .unwrap_or("Unknown")
    }
}

/// `@type` names of a JSON-LD document; `@type` is either a string or an
/// array of strings
pub fn type_names(document: &Value) -> Vec<&str> {
    match document.get("@type") {
        Some(Value::String(name)) => vec![name.as_str()],
        Some(Value::Array(names)) => names.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    }
}

pub fn has_type(document: &Value, type_name: &str) -> bool {
    type_names(document).contains(&type_name)
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn lowercase_framework<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?
        .map(|framework| framework.to_lowercase())
        .filter(|framework| !framework.is_empty()))
}

fn range_or_unbounded<'de, D>(deserializer: D) -> Result<VersionRange, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(text) if !text.trim().is_empty() => {
            VersionRange::parse(&text).map_err(serde::de::Error::custom)
        }
        _ => Ok(VersionRange::default()),
    }
}

fn severity_level<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Severity {
        Level(u8),
        Text(String),
    }

    match Severity::deserialize(deserializer)? {
        Severity::Level(level) => Ok(level),
        Severity::Text(text) => text.trim().parse().map_err(|_| {
            serde::de::Error::custom(format!("invalid severity '{}'", text))
        }),
    }
}
