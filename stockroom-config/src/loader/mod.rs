pub mod error;

use std::{fs, path::PathBuf, time::Duration};

use stockroom_core::mirror::settings::{
    DEFAULT_FETCH_CONCURRENCY, DEFAULT_FETCH_TIMEOUT, DEFAULT_INITIAL_BACKOFF,
    DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_BACKOFF, DEFAULT_MAX_BYTES,
    default_user_agent,
};

use crate::{
    constants::*,
    models::{
        CacheConfig, Config, ConfigMetadata, FetchConfig, ServerConfig,
        sources::{EnvConfig, FileConfig},
    },
    util::{parse_duration, parse_number},
    validation::{self, ConfigWarnings},
};
use error::ConfigLoadError;

#[derive(Debug, Default, Clone)]
pub struct ConfigLoaderOptions {
    pub config_path: Option<PathBuf>,
    pub env_file: Option<PathBuf>,
}

#[derive(Debug, Default)]
pub struct ConfigLoader {
    options: ConfigLoaderOptions,
}

#[derive(Debug)]
pub struct ConfigLoad {
    pub config: Config,
    pub warnings: ConfigWarnings,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ConfigLoaderOptions) -> Self {
        Self { options }
    }

    pub fn with_config_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.config_path = Some(path.into());
        self
    }

    pub fn with_env_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.env_file = Some(path.into());
        self
    }

    /// Load `.env`, read the process environment and the config file, then
    /// compose and validate.
    pub fn load(&self) -> Result<ConfigLoad, ConfigLoadError> {
        let env_file_loaded = match &self.options.env_file {
            Some(path) => dotenvy::from_path(path).map(|_| true).or_else(
                |err| match err {
                    dotenvy::Error::Io(_) => Ok(false),
                    _ => Err(err),
                },
            )?,
            None => {
                dotenvy::dotenv().map(|_| true).or_else(|err| match err {
                    dotenvy::Error::Io(_) => Ok(false),
                    _ => Err(err),
                })?
            }
        };

        self.load_with_env(EnvConfig::gather(), env_file_loaded)
    }

    /// Same as [`ConfigLoader::load`] with an explicit environment; the
    /// process environment is not consulted.
    pub fn load_with_env(
        &self,
        env: EnvConfig,
        env_file_loaded: bool,
    ) -> Result<ConfigLoad, ConfigLoadError> {
        let (file, config_path) = self.load_file_config(&env)?;
        compose(
            file,
            env,
            ConfigMetadata {
                config_path,
                env_file_loaded,
            },
        )
    }

    fn load_file_config(
        &self,
        env: &EnvConfig,
    ) -> Result<(Option<FileConfig>, Option<PathBuf>), ConfigLoadError> {
        // A path given on the command line or via STOCKROOM_CONFIG must
        // exist; the default locations are optional.
        let explicit = self
            .options
            .config_path
            .clone()
            .or_else(|| env.config_path.clone());

        let path = match explicit {
            Some(path) if !path.exists() => {
                return Err(ConfigLoadError::MissingConfig { path });
            }
            Some(path) => path,
            None => match DEFAULT_CONFIG_LOCATIONS
                .iter()
                .map(PathBuf::from)
                .find(|candidate| candidate.exists())
            {
                Some(path) => path,
                None => return Ok((None, None)),
            },
        };

        let contents =
            fs::read_to_string(&path).map_err(|source| ConfigLoadError::Io {
                path: path.clone(),
                source,
            })?;
        let file = parse_file_config(&path, &contents)?;
        Ok((Some(file), Some(path)))
    }
}

pub fn parse_file_config(
    path: &std::path::Path,
    contents: &str,
) -> Result<FileConfig, ConfigLoadError> {
    toml::from_str(contents).map_err(|source| ConfigLoadError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Merge the sources (environment over file over defaults) and validate.
pub fn compose(
    file: Option<FileConfig>,
    env: EnvConfig,
    metadata: ConfigMetadata,
) -> Result<ConfigLoad, ConfigLoadError> {
    let mut warnings = ConfigWarnings::default();

    if file.is_none() {
        warnings.push_with_hint(
            "No stockroom.toml detected; using environment variables and defaults",
            "Set STOCKROOM_CONFIG or pass --config to point at a config file",
        );
    }

    let FileConfig {
        server: file_server,
        cache: file_cache,
        fetch: file_fetch,
    } = file.unwrap_or_default();

    let server = ServerConfig {
        host: env
            .server_host
            .or(file_server.host)
            .unwrap_or_else(|| DEFAULT_HOST.to_string()),
        port: match env.server_port.as_deref() {
            Some(raw) => parse_number(ENV_SERVER_PORT, raw)?,
            None => file_server.port.unwrap_or(DEFAULT_PORT),
        },
    };

    let cache_root = env
        .cache_root
        .or(file_cache.root)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_DIR));
    let images = env
        .cache_images
        .or(file_cache.images)
        .unwrap_or_else(|| cache_root.join(IMAGES_SUBDIR));
    let cache = CacheConfig {
        root: cache_root,
        images,
    };

    let fetch = FetchConfig {
        timeout: layered_duration(
            env.fetch_timeout.as_deref(),
            ENV_FETCH_TIMEOUT,
            file_fetch.timeout.as_deref(),
            "fetch.timeout",
        )?
        .unwrap_or(DEFAULT_FETCH_TIMEOUT),
        max_attempts: match env.fetch_max_attempts.as_deref() {
            Some(raw) => parse_number(ENV_FETCH_MAX_ATTEMPTS, raw)?,
            None => file_fetch.max_attempts.unwrap_or(DEFAULT_MAX_ATTEMPTS),
        },
        initial_backoff: layered_duration(
            env.fetch_initial_backoff.as_deref(),
            ENV_FETCH_INITIAL_BACKOFF,
            file_fetch.initial_backoff.as_deref(),
            "fetch.initial_backoff",
        )?
        .unwrap_or(DEFAULT_INITIAL_BACKOFF),
        max_backoff: layered_duration(
            env.fetch_max_backoff.as_deref(),
            ENV_FETCH_MAX_BACKOFF,
            file_fetch.max_backoff.as_deref(),
            "fetch.max_backoff",
        )?
        .unwrap_or(DEFAULT_MAX_BACKOFF),
        concurrency: match env.fetch_concurrency.as_deref() {
            Some(raw) => parse_number(ENV_FETCH_CONCURRENCY, raw)?,
            None => file_fetch.concurrency.unwrap_or(DEFAULT_FETCH_CONCURRENCY),
        },
        max_bytes: match env.max_bytes.as_deref() {
            Some(raw) => parse_number(ENV_MAX_BYTES, raw)?,
            None => file_fetch.max_bytes.unwrap_or(DEFAULT_MAX_BYTES),
        },
        user_agent: env
            .user_agent
            .or(file_fetch.user_agent)
            .unwrap_or_else(default_user_agent),
    };

    let config = Config {
        server,
        cache,
        fetch,
        metadata,
    };

    warnings.extend(validation::apply_guard_rails(&config)?);
    Ok(ConfigLoad { config, warnings })
}

fn layered_duration(
    env_raw: Option<&str>,
    env_key: &str,
    file_raw: Option<&str>,
    file_key: &str,
) -> Result<Option<Duration>, ConfigLoadError> {
    match (env_raw, file_raw) {
        (Some(raw), _) => parse_duration(env_key, raw).map(Some),
        (None, Some(raw)) => parse_duration(file_key, raw).map(Some),
        (None, None) => Ok(None),
    }
}
