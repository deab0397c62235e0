//! # Stockroom Server
//!
//! Serves the image mirror API. Remote product photos are fetched once,
//! verified, stored atomically under the cache directory and then served
//! from local disk.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use stockroom_config::{ConfigLoad, ConfigLoader, ConfigLoaderOptions};
use stockroom_server::{
    create_app,
    infra::startup::{
        bootstrap, init_tracing, log_config_warnings, shutdown_signal,
    },
};
use tracing::info;

/// CLI entry point
#[derive(Parser, Debug)]
#[command(name = "stockroom-server")]
#[command(about = "Local mirror for remotely hosted product images")]
struct ServeArgs {
    /// Path to a TOML config file
    #[arg(short, long, env = "STOCKROOM_CONFIG")]
    config: Option<PathBuf>,

    /// Path to a .env file (defaults to ./.env when present)
    #[arg(long)]
    env_file: Option<PathBuf>,

    /// Server port (overrides config)
    #[arg(short, long, env = "SERVER_PORT")]
    port: Option<u16>,

    /// Server host (overrides config)
    #[arg(long, env = "SERVER_HOST")]
    host: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = ServeArgs::parse();

    let ConfigLoad {
        mut config,
        warnings,
    } = ConfigLoader::with_options(ConfigLoaderOptions {
        config_path: args.config.clone(),
        env_file: args.env_file.clone(),
    })
    .load()
    .context("failed to load configuration")?;

    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(host) = args.host.clone() {
        config.server.host = host;
    }

    init_tracing();

    if config.metadata.env_file_loaded {
        info!("loaded .env file");
    }
    if let Some(path) = &config.metadata.config_path {
        info!(path = %path.display(), "loaded configuration file");
    }
    log_config_warnings(&warnings);

    let state = bootstrap(&config).await?;
    let app = create_app(state);

    let addr = config.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "Starting Stockroom image mirror");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("server stopped");
    Ok(())
}
