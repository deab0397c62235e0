use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::{constants::*, util::non_empty};

/// Raw configuration as defined in a TOML file.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub server: FileServerConfig,
    #[serde(default)]
    pub cache: FileCacheConfig,
    #[serde(default)]
    pub fetch: FileFetchConfig,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FileServerConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FileCacheConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<PathBuf>,
}

/// Durations are humantime strings (`"30s"`, `"200ms"`).
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FileFetchConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_backoff: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_backoff: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

/// Environment-derived configuration values, kept as raw strings until the
/// loader parses them so bad values can be reported by name.
#[derive(Debug, Default, Clone)]
pub struct EnvConfig {
    pub config_path: Option<PathBuf>,
    pub server_host: Option<String>,
    pub server_port: Option<String>,
    pub cache_root: Option<PathBuf>,
    pub cache_images: Option<PathBuf>,
    pub fetch_timeout: Option<String>,
    pub fetch_max_attempts: Option<String>,
    pub fetch_initial_backoff: Option<String>,
    pub fetch_max_backoff: Option<String>,
    pub fetch_concurrency: Option<String>,
    pub max_bytes: Option<String>,
    pub user_agent: Option<String>,
}

impl EnvConfig {
    pub fn gather() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| non_empty(lookup(name));
        Self {
            config_path: var(ENV_CONFIG_PATH).map(PathBuf::from),
            server_host: var(ENV_SERVER_HOST),
            server_port: var(ENV_SERVER_PORT),
            cache_root: var(ENV_CACHE_DIR).map(PathBuf::from),
            cache_images: var(ENV_IMAGE_CACHE_DIR).map(PathBuf::from),
            fetch_timeout: var(ENV_FETCH_TIMEOUT),
            fetch_max_attempts: var(ENV_FETCH_MAX_ATTEMPTS),
            fetch_initial_backoff: var(ENV_FETCH_INITIAL_BACKOFF),
            fetch_max_backoff: var(ENV_FETCH_MAX_BACKOFF),
            fetch_concurrency: var(ENV_FETCH_CONCURRENCY),
            max_bytes: var(ENV_MAX_BYTES),
            user_agent: var(ENV_USER_AGENT),
        }
    }
}
