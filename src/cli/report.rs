//! Plain-text rendering of a [`DependencyReport`]

use std::fmt::Write;

use crate::cli::analysis::DependencyReport;

const SEPARATOR: &str = "___________________________________";

pub fn render(report: &DependencyReport) -> String {
    let mut out = String::new();

    for edges in report.grouped.values() {
        let Some(first) = edges.first() else {
            continue;
        };
        let _ = writeln!(out, "{} :", first.dependency);
        for edge in edges {
            let _ = writeln!(out, "  {} {} <- {}", edge.dependency, edge.range, edge.parent);
        }
        let _ = writeln!(out, "{}", SEPARATOR);
    }

    section(&mut out, "META PACKAGES", &report.meta_packages, true);
    section(&mut out, "IMPOSTOR PACKAGES", &report.impostors, true);
    section(&mut out, "TRANSITIVE PACKAGES", &report.transitive, true);

    if !report.vulnerable.is_empty() {
        let _ = writeln!(out, "\nVULNERABLE PACKAGES:");
        for package in &report.vulnerable {
            for vulnerability in &package.vulnerabilities {
                let _ = writeln!(
                    out,
                    "{} {}: {} {}",
                    package.name,
                    package.version,
                    vulnerability.severity_name(),
                    vulnerability.advisory_url
                );
            }
        }
    }

    if !report.recommendations.is_empty() {
        let _ = writeln!(out, "\nRECOMMENDED VERSIONS:");
        for recommendation in &report.recommendations {
            let ranges: Vec<String> = recommendation.ranges.iter().map(ToString::to_string).collect();
            let version = recommendation
                .version
                .as_ref()
                .map_or_else(|| "no common version".to_string(), ToString::to_string);
            let _ = writeln!(
                out,
                "{}: {} -> {}",
                recommendation.dependency,
                ranges.join(" + "),
                version
            );
        }
    }

    section(&mut out, "UNRESOLVED PACKAGES", &report.unresolved, false);
    section(&mut out, "SKIPPED PACKAGES (no version)", &report.skipped, false);

    if !report.vendors.is_empty() {
        let _ = writeln!(out, "\nVENDORS:");
        for (vendor, count) in &report.vendors {
            let _ = writeln!(out, "{} ({})", vendor, count);
        }
    }

    out
}

fn section(out: &mut String, title: &str, names: &[String], always: bool) {
    if names.is_empty() && !always {
        return;
    }
    let _ = writeln!(out, "\n{}:", title);
    for name in names {
        let _ = writeln!(out, "{}", name);
    }
}
