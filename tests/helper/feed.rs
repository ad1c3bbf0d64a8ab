//! Fake NuGet v3 feed served by mockito

use std::path::Path;
use std::time::Duration;

use mockito::{Mock, ServerGuard};
use serde_json::{Value, json};

use nuget_depcheck::cli::Settings;

/// A published package version and its `netstandard2.0` dependencies
pub struct PackageFixture<'a> {
    pub id: &'a str,
    pub version: &'a str,
    pub dependencies: &'a [(&'a str, &'a str)],
}

pub fn registration_base(server: &ServerGuard) -> String {
    format!("{}/v3/registration", server.url())
}

pub fn service_index_url(server: &ServerGuard) -> String {
    format!("{}/v3/index.json", server.url())
}

/// Service index exposing only a registration resource; expects one request
pub async fn mock_service_index(server: &mut ServerGuard) -> Mock {
    let body = json!({
        "version": "3.0.0",
        "resources": [
            {"@id": format!("{}/query", server.url()), "@type": "SearchQueryService"},
            {"@id": format!("{}/", registration_base(server)), "@type": "RegistrationsBaseUrl/3.6.0"}
        ]
    });
    server
        .mock("GET", "/v3/index.json")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(body.to_string())
        .expect(1)
        .create_async()
        .await
}

pub fn catalog_item(package: &PackageFixture<'_>) -> Value {
    let dependencies: Vec<Value> = package
        .dependencies
        .iter()
        .map(|(id, range)| json!({"id": id, "range": range}))
        .collect();
    json!({
        "@id": format!("https://example.test/{}/{}.json", package.id.to_lowercase(), package.version),
        "catalogEntry": {
            "id": package.id,
            "version": package.version,
            "dependencyGroups": [
                {"targetFramework": "net462", "dependencies": []},
                {"targetFramework": ".NETStandard2.0", "dependencies": dependencies}
            ]
        }
    })
}

/// Registration index with one inline page holding `package`; expects one
/// request
pub async fn mock_registration(server: &mut ServerGuard, package: &PackageFixture<'_>) -> Mock {
    let path = format!("/v3/registration/{}/index.json", package.id.to_lowercase());
    let body = json!({
        "@id": format!("{}{}", server.url(), path),
        "count": 1,
        "items": [{
            "@id": format!("{}{}#page/{}/{}", server.url(), path, package.version, package.version),
            "lower": package.version,
            "upper": package.version,
            "count": 1,
            "items": [catalog_item(package)]
        }]
    });
    server
        .mock("GET", path.as_str())
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(body.to_string())
        .expect(1)
        .create_async()
        .await
}

pub fn test_settings(server: &ServerGuard, cache_dir: &Path) -> Settings {
    Settings {
        cache_dir: cache_dir.to_path_buf(),
        cache_ttl: Duration::from_secs(3600),
        service_index_url: service_index_url(server),
        fetch_timeout: Duration::from_secs(5),
        workers: 4,
        target_frameworks: vec!["netstandard2.".to_string(), "net5.0".to_string()],
    }
}
