use serde::Deserialize;
use std::path::{Path, PathBuf};

const APP_NAME: &str = "nuget-depcheck";

// =============================================================================
// Time-related constants
// =============================================================================

/// Default lifetime of a cached registry response in seconds (7 days)
pub const DEFAULT_CACHE_TTL_SECS: u64 = 7 * 24 * 60 * 60;

/// Timeout for a single registry request in seconds
pub const FETCH_TIMEOUT_SECS: u64 = 30;

// =============================================================================
// Registry constants
// =============================================================================

/// Service index of the public NuGet feed
pub const DEFAULT_SERVICE_INDEX_URL: &str = "https://api.nuget.org/v3/index.json";

/// Target framework fragments whose dependency group is analysed
pub const DEFAULT_TARGET_FRAMEWORKS: [&str; 2] = ["netstandard2.", "net5.0"];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Configuration file structure
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct AppConfig {
    pub cache: CacheConfig,
    pub registry: RegistryConfig,
    pub analysis: AnalysisConfig,
}

impl AppConfig {
    /// Loads `path`, or the defaults when it does not exist
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        serde_json::from_str(&content).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Cache-related configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct CacheConfig {
    /// Lifetime of a cached response in seconds
    pub ttl_secs: u64,
    /// Overrides [`cache_dir`]
    pub dir: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: DEFAULT_CACHE_TTL_SECS,
            dir: None,
        }
    }
}

/// Registry configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct RegistryConfig {
    pub service_index_url: String,
    pub timeout_secs: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            service_index_url: DEFAULT_SERVICE_INDEX_URL.to_string(),
            timeout_secs: FETCH_TIMEOUT_SECS,
        }
    }
}

/// Dependency analysis configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct AnalysisConfig {
    /// Concurrent lookups; defaults to the available parallelism
    pub workers: Option<usize>,
    pub target_frameworks: Vec<String>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            workers: None,
            target_frameworks: DEFAULT_TARGET_FRAMEWORKS
                .iter()
                .map(|framework| framework.to_string())
                .collect(),
        }
    }
}

/// Number of lookups to run concurrently when not configured
pub fn default_workers() -> usize {
    std::thread::available_parallelism().map_or(4, |n| n.get())
}

/// Returns the path to the data directory for nuget-depcheck.
/// Uses $XDG_DATA_HOME/nuget-depcheck if XDG_DATA_HOME is set,
/// otherwise falls back to ~/.local/share/nuget-depcheck,
/// or ./nuget-depcheck if neither is available.
pub fn data_dir() -> PathBuf {
    data_dir_with_env(std::env::var("XDG_DATA_HOME").ok(), dirs::home_dir())
}

/// Returns the path to the response cache directory.
/// Uses $XDG_CACHE_HOME/nuget-depcheck, falling back to ~/.cache/nuget-depcheck.
pub fn cache_dir() -> PathBuf {
    cache_dir_with_env(std::env::var("XDG_CACHE_HOME").ok(), dirs::home_dir())
}

/// Returns the path to the config file.
pub fn config_path() -> PathBuf {
    config_dir_with_env(std::env::var("XDG_CONFIG_HOME").ok(), dirs::home_dir()).join("config.json")
}

/// Returns the path to the log file.
pub fn log_path() -> PathBuf {
    data_dir().join(format!("{}.log", APP_NAME))
}

fn data_dir_with_env(xdg_data_home: Option<String>, home_dir: Option<PathBuf>) -> PathBuf {
    app_dir(xdg_data_home, home_dir, ".local/share")
}

fn cache_dir_with_env(xdg_cache_home: Option<String>, home_dir: Option<PathBuf>) -> PathBuf {
    app_dir(xdg_cache_home, home_dir, ".cache")
}

fn config_dir_with_env(xdg_config_home: Option<String>, home_dir: Option<PathBuf>) -> PathBuf {
    app_dir(xdg_config_home, home_dir, ".config")
}

fn app_dir(xdg_home: Option<String>, home_dir: Option<PathBuf>, home_relative: &str) -> PathBuf {
    let base = xdg_home
        .filter(|dir| !dir.is_empty())
        .map(PathBuf::from)
        .or_else(|| home_dir.map(|home| home.join(home_relative)))
        .unwrap_or_else(|| PathBuf::from("."));

    base.join(APP_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn app_config_from_partial_object_uses_defaults_for_missing_fields() {
        let result = serde_json::from_value::<AppConfig>(json!({
            "cache": {
                "ttlSecs": 3600
            }
        }))
        .unwrap();

        assert_eq!(result.cache.ttl_secs, 3600);
        assert_eq!(result.cache.dir, None);
        assert_eq!(result.registry, RegistryConfig::default());
        assert_eq!(result.analysis, AnalysisConfig::default());
    }

    #[test]
    fn app_config_from_full_object_parses_all_fields() {
        let result = serde_json::from_value::<AppConfig>(json!({
            "cache": {
                "ttlSecs": 60,
                "dir": "/tmp/nuget-cache"
            },
            "registry": {
                "serviceIndexUrl": "https://feed.example/v3/index.json",
                "timeoutSecs": 5
            },
            "analysis": {
                "workers": 8,
                "targetFrameworks": ["net8.0"]
            }
        }))
        .unwrap();

        assert_eq!(
            result,
            AppConfig {
                cache: CacheConfig {
                    ttl_secs: 60,
                    dir: Some(PathBuf::from("/tmp/nuget-cache")),
                },
                registry: RegistryConfig {
                    service_index_url: "https://feed.example/v3/index.json".to_string(),
                    timeout_secs: 5,
                },
                analysis: AnalysisConfig {
                    workers: Some(8),
                    target_frameworks: vec!["net8.0".to_string()],
                },
            }
        );
    }

    #[test]
    fn load_returns_defaults_when_file_is_missing() {
        let temp_dir = TempDir::new().unwrap();
        let config = AppConfig::load(&temp_dir.path().join("config.json")).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn load_rejects_invalid_json() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        let result = AppConfig::load(&path);

        assert!(matches!(result, Err(ConfigError::Json { .. })));
    }

    #[test]
    fn data_dir_with_env_uses_xdg_data_home_when_set() {
        let path = data_dir_with_env(
            Some("/tmp/test-data".to_string()),
            Some(PathBuf::from("/home/user")),
        );

        assert_eq!(path, PathBuf::from("/tmp/test-data/nuget-depcheck"));
    }

    #[test]
    fn data_dir_with_env_falls_back_to_home_local_share() {
        let path = data_dir_with_env(None, Some(PathBuf::from("/home/user")));

        assert_eq!(path, PathBuf::from("/home/user/.local/share/nuget-depcheck"));
    }

    #[test]
    fn data_dir_with_env_falls_back_to_current_dir_when_no_dirs_available() {
        let path = data_dir_with_env(None, None);
        assert_eq!(path, PathBuf::from("./nuget-depcheck"));
    }

    #[test]
    fn cache_dir_with_env_ignores_empty_xdg_value() {
        let path = cache_dir_with_env(Some(String::new()), Some(PathBuf::from("/home/user")));
        assert_eq!(path, PathBuf::from("/home/user/.cache/nuget-depcheck"));
    }

    #[test]
    fn config_dir_with_env_uses_xdg_config_home() {
        let path = config_dir_with_env(Some("/etc/xdg".to_string()), None);
        assert_eq!(path, PathBuf::from("/etc/xdg/nuget-depcheck"));
    }
}
