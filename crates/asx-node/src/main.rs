//! # ASX Node
//!
//! Serves the protected API over the Authenticated Sealed Exchange.
//!
//! ## Startup Sequence
//!
//! 1. Initialise logging (`RUST_LOG`, default `info`)
//! 2. Load configuration: JSON file from `ASX_CONFIG` or the first argument,
//!    then `ASX_*` overrides, then validation
//! 3. Load the identity, key directory and disclosures
//! 4. Start the replay sweeper and the session reaper
//! 5. Serve until Ctrl+C

use std::sync::Arc;

use anyhow::{Context, Result};
use asx_node::{build_exchange, load_disclosures, load_identity, load_key_directory, router};
use asx_protocol::{
    spawn_replay_sweeper, spawn_session_reaper, AsxConfig, SystemTimeSource, TimeSource,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn load_config() -> Result<AsxConfig> {
    let path = std::env::var("ASX_CONFIG")
        .ok()
        .or_else(|| std::env::args().nth(1));

    let mut config = match path {
        Some(path) => {
            let json = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config {}", path))?;
            let config = AsxConfig::from_json_str(&json)
                .with_context(|| format!("invalid config {}", path))?;
            info!(path = %path, "Loaded configuration file");
            config
        }
        None => AsxConfig::default(),
    };

    config
        .apply_env()
        .context("invalid ASX_* environment override")?;
    config.validate().context("invalid configuration")?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .with_thread_ids(true)
        .init();

    info!("ASX node v{}", asx_protocol::VERSION);

    let config = load_config()?;
    let clock: Arc<dyn TimeSource> = Arc::new(SystemTimeSource);

    let identity = load_identity(&config.node)?;
    let directory = Arc::new(load_key_directory(&config.node)?);
    let disclosures = Arc::new(load_disclosures(&config.node)?);
    let exchange = build_exchange(&config, identity, directory, disclosures, clock.clone());

    let sweeper = spawn_replay_sweeper(
        exchange.inbound().replay_cache().clone(),
        clock,
        config.exchange.replay_sweep_interval(),
    );
    let reaper = spawn_session_reaper(exchange.sessions().clone(), config.session.reap_interval());

    let app = router(exchange, config.exchange.max_body_bytes);
    let listener = tokio::net::TcpListener::bind(config.node.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.node.listen_addr))?;

    info!(
        addr = %config.node.listen_addr,
        freshness_ms = config.exchange.freshness_window_ms,
        issuer = %config.session.issuer,
        "Node is running. Press Ctrl+C to stop."
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Received shutdown signal");
        })
        .await
        .context("server error")?;

    sweeper.abort();
    reaper.abort();
    info!("Node stopped");
    Ok(())
}
