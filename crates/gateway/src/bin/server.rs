//! Payment orchestration gateway server.
//!
//! Exposes the four payment patterns and the unified operation registry
//! over REST. Configuration comes from the environment; the signing key is
//! a base64-encoded ed25519 seed registered with the wallet's key id.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use client::{ClientConfig, OpenPaymentsClient, WalletCache};
use common::SystemClock;
use gateway::{start_server, AppState};
use orchestrator::future::DEFAULT_MONITOR_PERIOD;
use orchestrator::UnifiedRegistry;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("starting payment orchestration gateway");

    let config = load_config()?;
    let api = Arc::new(OpenPaymentsClient::new(&ClientConfig {
        wallet_address_url: config.wallet_address_url.clone(),
        key_id: config.key_id.clone(),
        private_key: config.private_key.clone(),
    })?);

    let registry = Arc::new(UnifiedRegistry::new(
        api,
        Arc::new(WalletCache::new()),
        Arc::new(SystemClock),
        config.base_url.clone(),
    ));

    // Background executor for due scheduled payments.
    let _monitor = registry.future().clone().start_monitor(DEFAULT_MONITOR_PERIOD);

    let addr: SocketAddr = config.listen_addr.parse()?;
    info!("gateway configuration:");
    info!("  client wallet: {}", config.wallet_address_url);
    info!("  key id: {}", config.key_id);
    info!("  callback base: {}", config.base_url);
    info!("  listen address: {addr}");

    start_server(AppState::new(registry), addr).await
}

#[derive(Debug)]
struct Config {
    wallet_address_url: String,
    key_id: String,
    private_key: String,
    base_url: String,
    listen_addr: String,
}

fn load_config() -> Result<Config> {
    let wallet_address_url = std::env::var("OP_WALLET_ADDRESS_URL")
        .map_err(|_| anyhow::anyhow!("OP_WALLET_ADDRESS_URL environment variable is required"))?;

    let key_id = std::env::var("OP_KEY_ID")
        .map_err(|_| anyhow::anyhow!("OP_KEY_ID environment variable is required"))?;

    let private_key = std::env::var("OP_PRIVATE_KEY")
        .map_err(|_| anyhow::anyhow!("OP_PRIVATE_KEY environment variable is required"))?;

    let base_url =
        std::env::var("OP_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());

    let listen_addr =
        std::env::var("OP_LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

    Ok(Config {
        wallet_address_url,
        key_id,
        private_key,
        base_url: base_url.trim_end_matches('/').to_string(),
        listen_addr,
    })
}
