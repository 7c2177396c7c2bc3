//! Docstore KV Server
//!
//! Serves the key-value contract over HTTP on top of a MongoDB cluster.
use anyhow::Context;
use clap::{Arg, Command};
use std::net::SocketAddr;
use tokio::signal;
use tracing::{error, info, warn};

use docstore_kv_core::core::config::{BackendType, Config};
use docstore_kv_core::core::factory::create_service;
use docstore_kv_server::api::{start_api_server, ApiState};
use docstore_kv_server::logging::init_logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let matches = Command::new("docstore-kv-server")
        .version(docstore_kv_core::VERSION)
        .about("Key-value store over a document database")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path"),
        )
        .arg(
            Arg::new("http-addr")
                .long("http-addr")
                .value_name("ADDR")
                .help("HTTP bind address, e.g. 0.0.0.0:8080"),
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .value_name("LEVEL")
                .help("Log level (trace, debug, info, warn, error)"),
        )
        .arg(
            Arg::new("storage")
                .long("storage")
                .value_name("BACKEND")
                .help("Storage backend (mongo, memory)"),
        )
        .get_matches();

    // Load configuration: file, then environment, then command line
    let config_path = matches.get_one::<String>("config").map(|s| s.as_str());
    let mut config = Config::load(config_path)?;

    if let Some(addr) = matches.get_one::<String>("http-addr") {
        config.server.http_addr = addr
            .parse::<SocketAddr>()
            .with_context(|| format!("invalid --http-addr {}", addr))?;
    }
    if let Some(level) = matches.get_one::<String>("log-level") {
        config.logging.level = level.clone();
    }
    if let Some(backend) = matches.get_one::<String>("storage") {
        config.storage.backend = backend.parse::<BackendType>()?;
    }
    config.validate()?;

    // Initialize logging
    init_logging(&config.logging)?;
    info!("Starting docstore-kv server {}", docstore_kv_core::VERSION);
    match config_path {
        Some(path) => info!("Loaded configuration from: {}", path),
        None => info!("No config file specified, using defaults"),
    }

    // Connect before accepting requests; any failure here is fatal
    let service = match create_service(&config).await {
        Ok(service) => service,
        Err(e) => {
            error!("Startup failed: {}", e);
            return Err(e.into());
        }
    };

    let http_addr = config.server.http_addr;
    let state = ApiState::new(service, config.metrics.enabled);
    let api_handle = tokio::spawn(async move { start_api_server(http_addr, state).await });

    // Wait for shutdown signal
    tokio::select! {
        _ = signal::ctrl_c() => {
            warn!("Received shutdown signal");
        }
        result = api_handle => {
            match result {
                Ok(Ok(())) => warn!("HTTP server terminated unexpectedly"),
                Ok(Err(e)) => {
                    error!("HTTP server failed: {}", e);
                    return Err(e);
                }
                Err(e) => {
                    error!("HTTP server task panicked: {}", e);
                    return Err(e.into());
                }
            }
        }
    }

    info!("Shutdown complete");
    Ok(())
}
