//! Configuration for the Stockroom image mirror.
//!
//! Values are resolved from, highest precedence first, the process
//! environment (after an optional `.env` file is loaded), a TOML config
//! file, and built-in defaults. Command-line overrides are applied by the
//! server binary on top of the loaded [`Config`].

pub mod constants;
pub mod loader;
pub mod models;
pub mod util;
pub mod validation;

pub use loader::{
    ConfigLoad, ConfigLoader, ConfigLoaderOptions, error::ConfigLoadError,
};
pub use models::sources::{EnvConfig, FileConfig};
pub use models::{CacheConfig, Config, ConfigMetadata, FetchConfig, ServerConfig};
pub use validation::{ConfigGuardRailError, ConfigWarning, ConfigWarnings};
