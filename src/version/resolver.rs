//! Parallel metadata resolution for a batch of package references

use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::version::error::ResolveError;
use crate::version::fetcher::JsonFetcher;
use crate::version::nuget::Version;
use crate::version::registries::NugetClient;
use crate::version::types::CatalogItem;

/// One package to look up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataRequest {
    pub name: String,
    /// Declared version text; `None` when the reference has no version
    pub version: Option<String>,
}

impl MetadataRequest {
    pub fn new(name: impl Into<String>, version: Option<impl Into<String>>) -> Self {
        Self {
            name: name.into(),
            version: version.map(Into::into),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub name: String,
    pub version: Option<Version>,
    /// `None` when skipped or when the registry has no such version
    pub item: Option<CatalogItem>,
}

/// Resolves every request with at most `workers` lookups in flight.
///
/// Results arrive in completion order. The first error aborts the batch and
/// cancels the lookups still running.
pub async fn resolve_all<F>(
    client: Arc<NugetClient<F>>,
    requests: Vec<MetadataRequest>,
    workers: usize,
) -> Result<Vec<Resolution>, ResolveError>
where
    F: JsonFetcher + 'static,
{
    let workers = workers.max(1);
    let total = requests.len();
    let mut pending = requests.into_iter();
    let mut tasks = JoinSet::new();
    let mut resolutions = Vec::with_capacity(total);

    for request in pending.by_ref().take(workers) {
        tasks.spawn(resolve_one(Arc::clone(&client), request));
    }

    while let Some(joined) = tasks.join_next().await {
        resolutions.push(joined??);

        if let Some(request) = pending.next() {
            tasks.spawn(resolve_one(Arc::clone(&client), request));
        }
    }

    info!("Resolved {} package references", total);
    Ok(resolutions)
}

async fn resolve_one<F: JsonFetcher>(
    client: Arc<NugetClient<F>>,
    request: MetadataRequest,
) -> Result<Resolution, ResolveError> {
    let MetadataRequest { name, version } = request;

    let Some(version_text) = version else {
        warn!("{} has no declared version, skipping", name);
        return Ok(Resolution {
            name,
            version: None,
            item: None,
        });
    };

    let version = match Version::parse(&version_text) {
        Ok(version) => version,
        Err(source) => return Err(ResolveError::Version { package: name, source }),
    };

    debug!("Resolving {} {}", name, version);
    let item = match client.get_metadata(&name, &version).await {
        Ok(item) => item,
        Err(source) => return Err(ResolveError::Registry { package: name, source }),
    };

    if item.is_none() {
        info!("No metadata found for {} {}", name, version);
    }

    Ok(Resolution {
        name,
        version: Some(version),
        item,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::error::RegistryError;
    use crate::version::fetcher::MockJsonFetcher;
    use serde_json::{Value, json};
    use std::collections::HashSet;

    fn registration(name: &str, versions: &[&str]) -> Value {
        let items: Vec<Value> = versions
            .iter()
            .map(|version| {
                json!({
                    "catalogEntry": {"id": name, "version": version}
                })
            })
            .collect();
        json!({
            "@id": format!("https://reg.test/{}/index.json", name.to_lowercase()),
            "items": [{
                "@id": format!("https://reg.test/{}/index.json#page", name.to_lowercase()),
                "lower": "0.1.0",
                "upper": "99.0.0",
                "items": items
            }]
        })
    }

    fn client(fetcher: MockJsonFetcher) -> Arc<NugetClient<MockJsonFetcher>> {
        Arc::new(NugetClient::new(Arc::new(fetcher), "https://reg.test"))
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn resolve_all_returns_one_result_per_request() {
        let mut fetcher = MockJsonFetcher::new();
        fetcher.expect_fetch_json().returning(|url| {
            let name = url
                .trim_start_matches("https://reg.test/")
                .trim_end_matches("/index.json");
            Ok(registration(name, &["1.0.0", "2.0.0"]))
        });

        let requests = vec![
            MetadataRequest::new("Alpha", Some("1.0.0")),
            MetadataRequest::new("Beta", Some("2.0.0")),
            MetadataRequest::new("Gamma", Some("3.0.0")),
            MetadataRequest::new("Delta", None::<String>),
        ];

        let resolutions = resolve_all(client(fetcher), requests, 2).await.unwrap();

        assert_eq!(resolutions.len(), 4);
        let found: HashSet<&str> = resolutions
            .iter()
            .filter(|resolution| resolution.item.is_some())
            .map(|resolution| resolution.name.as_str())
            .collect();
        assert_eq!(found, HashSet::from(["Alpha", "Beta"]));

        let skipped = resolutions
            .iter()
            .find(|resolution| resolution.name == "Delta")
            .unwrap();
        assert!(skipped.version.is_none());
    }

    #[tokio::test]
    async fn resolve_all_skips_requests_without_version() {
        let mut fetcher = MockJsonFetcher::new();
        fetcher.expect_fetch_json().times(0);

        let requests = vec![MetadataRequest::new("Alpha", None::<String>)];
        let resolutions = resolve_all(client(fetcher), requests, 4).await.unwrap();

        assert_eq!(resolutions.len(), 1);
        assert!(resolutions[0].item.is_none());
    }

    #[tokio::test]
    async fn resolve_all_fails_on_invalid_version() {
        let mut fetcher = MockJsonFetcher::new();
        fetcher.expect_fetch_json().times(0);

        let requests = vec![MetadataRequest::new("Alpha", Some("not-a-version"))];
        let result = resolve_all(client(fetcher), requests, 1).await;

        assert!(matches!(
            result,
            Err(ResolveError::Version { ref package, .. }) if package == "Alpha"
        ));
    }

    #[tokio::test]
    async fn resolve_all_fails_fast_on_registry_error() {
        let mut fetcher = MockJsonFetcher::new();
        fetcher.expect_fetch_json().returning(|url| {
            if url.contains("/broken/") {
                Err(RegistryError::NotFound(url.to_string()))
            } else {
                Ok(registration("ok", &["1.0.0"]))
            }
        });

        let requests = vec![
            MetadataRequest::new("Ok", Some("1.0.0")),
            MetadataRequest::new("Broken", Some("1.0.0")),
        ];
        let result = resolve_all(client(fetcher), requests, 1).await;

        assert!(matches!(
            result,
            Err(ResolveError::Registry { ref package, source: RegistryError::NotFound(_) })
                if package == "Broken"
        ));
    }

    #[tokio::test]
    async fn resolve_all_treats_zero_workers_as_one() {
        let mut fetcher = MockJsonFetcher::new();
        fetcher
            .expect_fetch_json()
            .returning(|_| Ok(registration("alpha", &["1.0.0"])));

        let requests = vec![MetadataRequest::new("Alpha", Some("1.0"))];
        let resolutions = resolve_all(client(fetcher), requests, 0).await.unwrap();

        assert_eq!(resolutions[0].version, Some(Version::new(1, 0, 0, None)));
        assert!(resolutions[0].item.is_some());
    }
}
