use anyhow::Context;
use stockroom_config::{Config, ConfigWarnings};
use stockroom_core::MirrorService;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::infra::app_state::AppState;

const DEFAULT_LOG_FILTER: &str = "info,stockroom_core=info,tower_http=warn";

pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

pub fn log_config_warnings(warnings: &ConfigWarnings) {
    for warning in warnings.iter() {
        match &warning.hint {
            Some(hint) => {
                warn!(message = %warning.message, hint = %hint, "configuration warning")
            }
            None => {
                warn!(message = %warning.message, "configuration warning")
            }
        }
    }
}

/// Prepare directories, build the mirror and adopt blobs from a previous run.
pub async fn bootstrap(config: &Config) -> anyhow::Result<AppState> {
    config
        .ensure_directories()
        .context("failed to create cache directories")?;

    let mirror = MirrorService::new(config.mirror_settings())
        .context("failed to initialize image mirror")?;

    let adopted = mirror
        .rehydrate()
        .await
        .context("failed to scan image store")?;
    info!(
        adopted,
        store = %mirror.store().root().display(),
        "image mirror ready"
    );

    Ok(AppState::new(mirror))
}

pub async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
