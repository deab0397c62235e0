//! Environment variable names and built-in defaults.

pub const ENV_CONFIG_PATH: &str = "STOCKROOM_CONFIG";
pub const ENV_SERVER_HOST: &str = "SERVER_HOST";
pub const ENV_SERVER_PORT: &str = "SERVER_PORT";
pub const ENV_CACHE_DIR: &str = "CACHE_DIR";
pub const ENV_IMAGE_CACHE_DIR: &str = "IMAGE_CACHE_DIR";
pub const ENV_FETCH_TIMEOUT: &str = "IMAGE_FETCH_TIMEOUT";
pub const ENV_FETCH_MAX_ATTEMPTS: &str = "IMAGE_FETCH_MAX_ATTEMPTS";
pub const ENV_FETCH_INITIAL_BACKOFF: &str = "IMAGE_FETCH_INITIAL_BACKOFF";
pub const ENV_FETCH_MAX_BACKOFF: &str = "IMAGE_FETCH_MAX_BACKOFF";
pub const ENV_FETCH_CONCURRENCY: &str = "IMAGE_FETCH_CONCURRENCY";
pub const ENV_MAX_BYTES: &str = "IMAGE_MAX_BYTES";
pub const ENV_USER_AGENT: &str = "IMAGE_FETCH_USER_AGENT";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8088;
pub const DEFAULT_CACHE_DIR: &str = "./cache";
pub const IMAGES_SUBDIR: &str = "images";

/// Config files probed, in order, when no path is given.
pub const DEFAULT_CONFIG_LOCATIONS: &[&str] =
    &["stockroom.toml", "config/stockroom.toml"];
