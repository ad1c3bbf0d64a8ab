//! NuGet v3 registration API client
//!
//! Lookup path for one `(package, version)`:
//! service index -> registration index -> page -> catalog item

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info};

use crate::version::error::RegistryError;
use crate::version::fetcher::JsonFetcher;
use crate::version::nuget::Version;
use crate::version::types::{
    CATALOG_ROOT_TYPE, CatalogItem, CatalogPage, RegistrationIndex, RegistrationPage,
    ServiceIndex, has_type,
};

/// Registration resource types in order of preference
pub const REGISTRATION_BASE_TYPES: [&str; 3] = [
    "RegistrationsBaseUrl/3.6.0",
    "RegistrationsBaseUrl/3.4.0",
    "RegistrationsBaseUrl",
];

pub struct NugetClient<F> {
    fetcher: Arc<F>,
    registration_base: String,
}

impl<F: JsonFetcher> NugetClient<F> {
    /// Client for a known registration base URL
    pub fn new(fetcher: Arc<F>, registration_base: &str) -> Self {
        Self {
            fetcher,
            registration_base: registration_base.trim_end_matches('/').to_string(),
        }
    }

    /// Reads the service index and picks the registration base URL
    pub async fn connect(fetcher: Arc<F>, service_index_url: &str) -> Result<Self, RegistryError> {
        let index: ServiceIndex = fetch_as(fetcher.as_ref(), service_index_url).await?;

        let resource = REGISTRATION_BASE_TYPES
            .iter()
            .find_map(|resource_type| index.find_resource(resource_type))
            .ok_or_else(|| RegistryError::MissingResource(REGISTRATION_BASE_TYPES[0].to_string()))?;

        info!(
            "Using registration base {} ({})",
            resource.id, resource.resource_type
        );
        Ok(Self::new(fetcher, &resource.id))
    }

    pub fn registration_base(&self) -> &str {
        &self.registration_base
    }

    pub fn registration_index_url(&self, package_name: &str) -> String {
        format!(
            "{}/{}/index.json",
            self.registration_base,
            package_name.to_lowercase()
        )
    }

    pub async fn registration_index(
        &self,
        package_name: &str,
    ) -> Result<RegistrationIndex, RegistryError> {
        fetch_as(
            self.fetcher.as_ref(),
            &self.registration_index_url(package_name),
        )
        .await
    }

    /// Catalog item of exactly `version`, or `None` when the registration
    /// has no page or item for it
    pub async fn get_metadata(
        &self,
        package_name: &str,
        version: &Version,
    ) -> Result<Option<CatalogItem>, RegistryError> {
        let index = self.registration_index(package_name).await?;

        let Some(page) = index
            .items
            .into_iter()
            .find(|page| page.version_range().in_range(version))
        else {
            debug!("No registration page of {} covers {}", package_name, version);
            return Ok(None);
        };

        let item = self
            .page_items(page, version)
            .await?
            .into_iter()
            .find(|item| item.catalog_entry.version == *version);

        if item.is_none() {
            debug!("No catalog item for {} {}", package_name, version);
        }
        Ok(item)
    }

    async fn page_items(
        &self,
        page: RegistrationPage,
        version: &Version,
    ) -> Result<Vec<CatalogItem>, RegistryError> {
        if let Some(items) = page.items {
            return Ok(items);
        }

        let document = self.fetcher.fetch_json(&page.id).await?;
        if !has_type(&document, CATALOG_ROOT_TYPE) {
            let page: CatalogPage = decode(&page.id, document)?;
            return Ok(page.items);
        }

        let root: RegistrationIndex = decode(&page.id, document)?;
        let mut items = Vec::new();
        for nested in root
            .items
            .into_iter()
            .filter(|nested| nested.version_range().in_range(version))
        {
            match nested.items {
                Some(inline) => items.extend(inline),
                None => {
                    let page: CatalogPage = fetch_as(self.fetcher.as_ref(), &nested.id).await?;
                    items.extend(page.items);
                }
            }
        }
        Ok(items)
    }
}

async fn fetch_as<T, F>(fetcher: &F, url: &str) -> Result<T, RegistryError>
where
    T: DeserializeOwned,
    F: JsonFetcher + ?Sized,
{
    let document = fetcher.fetch_json(url).await?;
    decode(url, document)
}

fn decode<T: DeserializeOwned>(url: &str, document: Value) -> Result<T, RegistryError> {
    serde_json::from_value(document)
        .map_err(|e| RegistryError::InvalidResponse(format!("{}: {}", url, e)))
}
