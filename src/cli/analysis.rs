//! Dependency classification over resolved catalog entries
//!
//! - meta: declared packages nothing else depends on
//! - impostor: declared packages that another declared package already
//!   pulls in
//! - transitive: every dependency name of the selected dependency groups

use std::collections::{BTreeMap, HashSet};

use indexmap::IndexMap;
use tracing::debug;

use crate::parser::types::PackageReference;
use crate::version::nuget::Version;
use crate::version::range::VersionRange;
use crate::version::resolver::Resolution;
use crate::version::types::{CatalogEntry, DependencyGroup, Vulnerability};

/// `dependency range` required by `parent`
#[derive(Debug, Clone, PartialEq)]
pub struct DependencyEdge {
    pub dependency: String,
    pub range: VersionRange,
    pub parent: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VulnerablePackage {
    pub name: String,
    pub version: Version,
    pub vulnerabilities: Vec<Vulnerability>,
}

/// Lowest version satisfying every distinct range a dependency is required with
#[derive(Debug, Clone, PartialEq)]
pub struct Recommendation {
    pub dependency: String,
    pub ranges: Vec<VersionRange>,
    /// `None` when the ranges have no common minimum
    pub version: Option<Version>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DependencyReport {
    /// Lower-cased dependency name -> edges, in first-seen order
    pub grouped: IndexMap<String, Vec<DependencyEdge>>,
    pub meta_packages: Vec<String>,
    pub impostors: Vec<String>,
    pub transitive: Vec<String>,
    pub vulnerable: Vec<VulnerablePackage>,
    pub recommendations: Vec<Recommendation>,
    /// Declared `name version` pairs the registry has no entry for
    pub unresolved: Vec<String>,
    /// Declared packages without a version
    pub skipped: Vec<String>,
    /// Declared package count per vendor
    pub vendors: BTreeMap<String, usize>,
}

pub fn analyze(
    references: &[PackageReference],
    resolutions: &[Resolution],
    target_frameworks: &[String],
) -> DependencyReport {
    let frameworks: Vec<String> = target_frameworks
        .iter()
        .map(|framework| framework.to_lowercase())
        .collect();

    let mut report = DependencyReport::default();

    let mut entries: Vec<&CatalogEntry> = Vec::new();
    for resolution in resolutions {
        match (&resolution.item, &resolution.version) {
            (Some(item), _) => entries.push(&item.catalog_entry),
            (None, Some(version)) => report
                .unresolved
                .push(format!("{} {}", resolution.name, version)),
            (None, None) => report.skipped.push(resolution.name.clone()),
        }
    }
    entries.sort_by_key(|entry| entry.id.to_lowercase());
    report.unresolved.sort();
    report.skipped.sort();

    for entry in &entries {
        if !entry.vulnerabilities.is_empty() {
            report.vulnerable.push(VulnerablePackage {
                name: entry.id.clone(),
                version: entry.version.clone(),
                vulnerabilities: entry.vulnerabilities.clone(),
            });
        }

        let Some(group) = select_dependency_group(entry, &frameworks) else {
            debug!("{} {} has no matching dependency group", entry.id, entry.version);
            continue;
        };

        for dependency in &group.dependencies {
            report
                .grouped
                .entry(dependency.id.to_lowercase())
                .or_default()
                .push(DependencyEdge {
                    dependency: dependency.id.clone(),
                    range: dependency.range.clone(),
                    parent: entry.id.clone(),
                });
        }
    }

    let dependency_names: HashSet<&str> = report.grouped.keys().map(String::as_str).collect();

    let mut declared: Vec<&PackageReference> = references.iter().collect();
    declared.sort_by(|a, b| a.name.cmp(&b.name));
    for reference in declared {
        if dependency_names.contains(reference.name.to_lowercase().as_str()) {
            report.impostors.push(reference.name.clone());
        } else {
            report.meta_packages.push(reference.name.clone());
        }
        *report.vendors.entry(reference.vendor()).or_default() += 1;
    }

    let mut transitive: Vec<String> = report.grouped.keys().cloned().collect();
    transitive.sort();
    report.transitive = transitive;

    report.recommendations = report
        .grouped
        .values()
        .filter_map(|edges| recommend(edges))
        .collect();

    report
}

/// First group whose target framework contains one of `frameworks`,
/// falling back to a framework-agnostic group
pub fn select_dependency_group<'a>(
    entry: &'a CatalogEntry,
    frameworks: &[String],
) -> Option<&'a DependencyGroup> {
    entry
        .dependency_groups
        .iter()
        .find(|group| {
            group.target_framework.as_deref().is_some_and(|target| {
                frameworks
                    .iter()
                    .any(|framework| target.contains(framework.as_str()))
            })
        })
        .or_else(|| {
            entry
                .dependency_groups
                .iter()
                .find(|group| group.target_framework.is_none())
        })
}

fn recommend(edges: &[DependencyEdge]) -> Option<Recommendation> {
    let mut ranges: Vec<VersionRange> = Vec::new();
    for edge in edges {
        if !ranges.contains(&edge.range) {
            ranges.push(edge.range.clone());
        }
    }
    if ranges.len() < 2 {
        return None;
    }

    let mut accumulated = ranges[0].clone();
    let mut version = None;
    for range in &ranges[1..] {
        version = accumulated.common_minimum_version(range);
        match &version {
            Some(candidate) => accumulated = VersionRange::at_least(candidate.clone()),
            None => break,
        }
    }

    Some(Recommendation {
        dependency: edges[0].dependency.clone(),
        ranges,
        version,
    })
}
