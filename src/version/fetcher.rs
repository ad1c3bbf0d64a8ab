//! JSON fetchers for registry documents
//!
//! - [`HttpFetcher`]: plain `reqwest` transport
//! - [`CachedFetcher`]: routes every fetch through the shared [`Cache`] and
//!   coalesces concurrent fetches of the same URL

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[cfg(test)]
use mockall::automock;

use serde_json::Value;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::version::cache::Cache;
use crate::version::error::{CacheError, RegistryError};

const USER_AGENT: &str = concat!("nuget-depcheck/", env!("CARGO_PKG_VERSION"));

/// Trait for fetching a JSON document by URL
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait JsonFetcher: Send + Sync {
    async fn fetch_json(&self, url: &str) -> Result<Value, RegistryError>;
}

/// Fetcher backed by a `reqwest` client
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, RegistryError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl JsonFetcher for HttpFetcher {
    async fn fetch_json(&self, url: &str) -> Result<Value, RegistryError> {
        debug!("GET {}", url);
        let response = self.client.get(url).send().await?;

        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(RegistryError::NotFound(url.to_string()));
        }

        if !status.is_success() {
            warn!("Registry returned status {}: {}", status, url);
            return Err(RegistryError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        response.json::<Value>().await.map_err(|e| {
            warn!("Failed to parse registry response from {}: {}", url, e);
            RegistryError::InvalidResponse(e.to_string())
        })
    }
}

/// Fetcher that memoizes responses in a persistent [`Cache`].
///
/// The URL fragment is not part of the cache key, so `index.json#page/1/2`
/// and `index.json` share one entry.
pub struct CachedFetcher<F> {
    inner: F,
    cache: Arc<Cache>,
    in_flight: Mutex<HashMap<String, Arc<OnceCell<Value>>>>,
}

impl<F: JsonFetcher> CachedFetcher<F> {
    pub fn new(inner: F, cache: Arc<Cache>) -> Self {
        Self {
            inner,
            cache,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    pub fn cache(&self) -> &Arc<Cache> {
        &self.cache
    }

    fn cache_key(url: &str) -> &str {
        url.split_once('#').map_or(url, |(document, _)| document)
    }

    fn slot(&self, key: &str) -> Result<Arc<OnceCell<Value>>, CacheError> {
        let mut in_flight = self.in_flight.lock().map_err(|_| CacheError::LockPoisoned)?;
        Ok(Arc::clone(in_flight.entry(key.to_string()).or_default()))
    }

    /// Drop the slot for `key` once its fetch settled; later requests read the
    /// Cache, which also applies its TTL.
    fn release(&self, key: &str, slot: &Arc<OnceCell<Value>>) -> Result<(), CacheError> {
        let mut in_flight = self.in_flight.lock().map_err(|_| CacheError::LockPoisoned)?;
        if in_flight
            .get(key)
            .is_some_and(|current| Arc::ptr_eq(current, slot))
        {
            in_flight.remove(key);
        }
        Ok(())
    }

    /// Prune expired entries and persist the cache index
    pub fn close(&self) -> Result<(), CacheError> {
        self.cache.delete_expired()?;
        self.cache.save()
    }
}

#[async_trait::async_trait]
impl<F: JsonFetcher> JsonFetcher for CachedFetcher<F> {
    async fn fetch_json(&self, url: &str) -> Result<Value, RegistryError> {
        let key = Self::cache_key(url);
        let slot = self.slot(key)?;

        let result = slot
            .get_or_try_init(|| async {
                if let Some(value) = self.cache.get::<Value>(key)? {
                    debug!("Cache hit: {}", key);
                    return Ok(value);
                }

                debug!("Cache miss: {}", key);
                let value = self.inner.fetch_json(key).await?;
                self.cache.add(key, &value)?;
                Ok::<_, RegistryError>(value)
            })
            .await
            .cloned();
        self.release(key, &slot)?;

        result
    }
}
