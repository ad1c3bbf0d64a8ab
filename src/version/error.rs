use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionError {
    #[error("Invalid version '{input}': {reason}")]
    InvalidVersion { input: String, reason: String },

    #[error("Invalid version range '{input}': {reason}")]
    InvalidRange { input: String, reason: String },
}

impl VersionError {
    pub(crate) fn version(input: &str, reason: impl Into<String>) -> Self {
        Self::InvalidVersion {
            input: input.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn range(input: &str, reason: impl Into<String>) -> Self {
        Self::InvalidRange {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Cache lock poisoned")]
    LockPoisoned,
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Unexpected status {status} for {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Service index has no resource of type {0}")]
    MissingResource(String),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),
}

/// Errors that abort a metadata resolution batch
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("{package}: {source}")]
    Version {
        package: String,
        #[source]
        source: VersionError,
    },

    #[error("{package}: {source}")]
    Registry {
        package: String,
        #[source]
        source: RegistryError,
    },

    #[error("Resolution worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_version_display_includes_input_and_reason() {
        let error = VersionError::version("1.x", "'x' is not a number");
        assert_eq!(
            error.to_string(),
            "Invalid version '1.x': 'x' is not a number"
        );
    }

    #[test]
    fn resolve_error_prefixes_package_name() {
        let error = ResolveError::Registry {
            package: "Newtonsoft.Json".to_string(),
            source: RegistryError::NotFound("https://example.test/index.json".to_string()),
        };
        assert_eq!(
            error.to_string(),
            "Newtonsoft.Json: Not found: https://example.test/index.json"
        );
    }

    #[test]
    fn io_error_converts_into_cache_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let error: CacheError = io_err.into();
        assert!(matches!(error, CacheError::Io(_)));
    }
}
