//! Subcommand handlers; each returns the text to print

use std::fmt::Write;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Utc};
use tracing::info;

use crate::cli::analysis;
use crate::cli::report;
use crate::cli::{AnalyzeArgs, CacheAction, Settings};
use crate::parser::ProjectFile;
use crate::version::cache::Cache;
use crate::version::fetcher::{CachedFetcher, HttpFetcher, JsonFetcher};
use crate::version::range::VersionRange;
use crate::version::registries::NugetClient;
use crate::version::resolver::{MetadataRequest, Resolution, resolve_all};

pub async fn analyze(settings: &Settings, args: &AnalyzeArgs) -> anyhow::Result<String> {
    let mut project = ProjectFile::load(&args.project)?;

    let cache = Arc::new(
        Cache::new(&settings.cache_dir, settings.cache_ttl).with_context(|| {
            format!("failed to open cache at {}", settings.cache_dir.display())
        })?,
    );
    let fetcher = Arc::new(CachedFetcher::new(
        HttpFetcher::new(settings.fetch_timeout)?,
        cache,
    ));

    let requests: Vec<MetadataRequest> = project
        .references()
        .iter()
        .map(|reference| MetadataRequest::new(reference.name.clone(), reference.effective_version()))
        .collect();
    info!(
        "Resolving {} references from {} with {} workers",
        requests.len(),
        args.project.display(),
        settings.workers
    );

    let resolved = resolve(
        Arc::clone(&fetcher),
        &settings.service_index_url,
        requests,
        settings.workers,
    )
    .await;
    fetcher.close().context("failed to persist cache")?;
    let resolutions = resolved?;

    let dependency_report = analysis::analyze(
        project.references(),
        &resolutions,
        &settings.target_frameworks,
    );
    let mut output = report::render(&dependency_report);

    if args.remove_impostors && !dependency_report.impostors.is_empty() {
        for name in &dependency_report.impostors {
            project.remove_package_reference(name)?;
        }
        project.save()?;
        let _ = writeln!(
            output,
            "\nRemoved {} impostor references from {}",
            dependency_report.impostors.len(),
            project.path().display()
        );
    }

    Ok(output)
}

async fn resolve<F: JsonFetcher + 'static>(
    fetcher: Arc<F>,
    service_index_url: &str,
    requests: Vec<MetadataRequest>,
    workers: usize,
) -> anyhow::Result<Vec<Resolution>> {
    let client = NugetClient::connect(fetcher, service_index_url)
        .await
        .with_context(|| format!("failed to read service index {}", service_index_url))?;
    Ok(resolve_all(Arc::new(client), requests, workers).await?)
}

pub fn common_version(first: &str, second: &str) -> anyhow::Result<String> {
    let first = VersionRange::parse(first)?;
    let second = VersionRange::parse(second)?;

    Ok(match first.common_minimum_version(&second) {
        Some(version) => format!("{}\n", version),
        None => format!("No common version for {} and {}\n", first, second),
    })
}

pub fn set_version(
    path: &Path,
    package: &str,
    version: Option<&str>,
    version_override: bool,
) -> anyhow::Result<String> {
    let mut project = ProjectFile::load(path)?;
    let attribute = if version_override { "VersionOverride" } else { "Version" };

    let changed = if version_override {
        project.set_version_override(package, version)?
    } else {
        project.set_version(package, version)?
    };

    if !changed {
        return Ok(format!("No change to {} of {}\n", attribute, package));
    }

    project.save()?;
    Ok(match version {
        Some(version) => format!("Set {} of {} to {}\n", attribute, package, version),
        None => format!("Removed {} of {}\n", attribute, package),
    })
}

pub fn cache(settings: &Settings, action: CacheAction) -> anyhow::Result<String> {
    let cache = Cache::new(&settings.cache_dir, settings.cache_ttl)
        .with_context(|| format!("failed to open cache at {}", settings.cache_dir.display()))?;

    let output = match action {
        CacheAction::List => {
            let entries = cache.entries()?;
            let mut output = String::new();
            for entry in &entries {
                let expires = DateTime::<Utc>::from_timestamp_millis(entry.expires_at)
                    .map_or_else(|| entry.expires_at.to_string(), |time| time.to_rfc3339());
                let _ = writeln!(
                    output,
                    "{}  {}  {}",
                    &entry.key_hash[..12],
                    expires,
                    entry.key.as_deref().unwrap_or("<unknown key>")
                );
            }
            let _ = writeln!(
                output,
                "{} entries in {}",
                entries.len(),
                cache.dir().display()
            );
            output
        }
        CacheAction::Prune => {
            let removed = cache.delete_expired()?;
            cache.save()?;
            format!("Removed {} expired entries\n", removed)
        }
        CacheAction::Clear => {
            let removed = cache.clear()?;
            cache.save()?;
            format!("Removed {} entries\n", removed)
        }
    };

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;
    use std::path::PathBuf;
    use std::time::Duration;
    use tempfile::TempDir;

    fn settings(cache_dir: PathBuf) -> Settings {
        Settings {
            cache_dir,
            cache_ttl: Duration::from_secs(3600),
            service_index_url: "http://127.0.0.1:1/index.json".to_string(),
            fetch_timeout: Duration::from_secs(1),
            workers: 2,
            target_frameworks: vec!["netstandard2.".to_string()],
        }
    }

    #[rstest]
    #[case("(5.0.13, 5.0.16]", "(5.0.11, 5.0.14]", "5.0.14\n")]
    #[case("[1.0.0, )", "[2.0.0, 3.0.0)", "2.0.0\n")]
    #[case("[1.0.0, )", "[1.0.0, )", "No common version for [1.0.0, ) and [1.0.0, )\n")]
    fn common_version_prints_result(
        #[case] first: &str,
        #[case] second: &str,
        #[case] expected: &str,
    ) {
        assert_eq!(common_version(first, second).unwrap(), expected);
    }

    #[test]
    fn common_version_rejects_invalid_range() {
        assert!(common_version("[1.0.0", "[1.0.0, )").is_err());
    }

    #[test]
    fn set_version_updates_project_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("App.csproj");
        std::fs::write(
            &path,
            "<Project>\n  <ItemGroup>\n    <PackageReference Include=\"Polly\" Version=\"7.2.4\" />\n  </ItemGroup>\n</Project>\n",
        )
        .unwrap();

        let output = set_version(&path, "polly", Some("8.0.0"), true).unwrap();

        assert_eq!(output, "Set VersionOverride of polly to 8.0.0\n");
        assert!(
            std::fs::read_to_string(&path)
                .unwrap()
                .contains("<PackageReference Include=\"Polly\" VersionOverride=\"8.0.0\" />")
        );
    }

    #[test]
    fn cache_commands_list_prune_and_clear() {
        let temp_dir = TempDir::new().unwrap();
        {
            let cache = Cache::new(temp_dir.path(), Duration::from_secs(3600)).unwrap();
            cache.add("https://feed.test/index.json", &json!({})).unwrap();
            cache
                .add_with_ttl("https://feed.test/stale.json", &json!({}), Duration::from_millis(1))
                .unwrap();
            cache.save().unwrap();
        }
        std::thread::sleep(Duration::from_millis(20));
        let settings = settings(temp_dir.path().to_path_buf());

        let listing = cache(&settings, CacheAction::List).unwrap();
        assert!(listing.contains("https://feed.test/index.json"));
        assert!(listing.ends_with(&format!("2 entries in {}\n", temp_dir.path().display())));

        assert_eq!(
            cache(&settings, CacheAction::Prune).unwrap(),
            "Removed 1 expired entries\n"
        );
        assert_eq!(
            cache(&settings, CacheAction::Clear).unwrap(),
            "Removed 1 entries\n"
        );
    }
}
