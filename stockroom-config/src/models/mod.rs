pub mod sources;

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use stockroom_core::{FetchSettings, MirrorSettings, RetryPolicy};

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub cache: CacheConfig,
    pub fetch: FetchConfig,
    pub metadata: ConfigMetadata,
}

impl Config {
    pub fn ensure_directories(&self) -> anyhow::Result<()> {
        self.cache.ensure_directories()
    }

    pub fn cache_root(&self) -> &Path {
        &self.cache.root
    }

    pub fn image_store_dir(&self) -> &Path {
        &self.cache.images
    }

    /// Settings for the mirror service built from this config.
    pub fn mirror_settings(&self) -> MirrorSettings {
        MirrorSettings {
            store_root: self.cache.images.clone(),
            fetch: FetchSettings {
                timeout: self.fetch.timeout,
                max_bytes: self.fetch.max_bytes,
                user_agent: self.fetch.user_agent.clone(),
            },
            retry: RetryPolicy {
                max_attempts: self.fetch.max_attempts,
                initial_backoff: self.fetch.initial_backoff,
                max_backoff: self.fetch.max_backoff,
            },
            fetch_concurrency: self.fetch.concurrency,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub root: PathBuf,
    pub images: PathBuf,
}

impl CacheConfig {
    fn ensure_directories(&self) -> anyhow::Result<()> {
        std::fs::create_dir_all(&self.root)?;
        std::fs::create_dir_all(&self.images)?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub timeout: Duration,
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub concurrency: usize,
    pub max_bytes: u64,
    pub user_agent: String,
}

#[derive(Debug, Clone, Default)]
pub struct ConfigMetadata {
    pub config_path: Option<PathBuf>,
    pub env_file_loaded: bool,
}
