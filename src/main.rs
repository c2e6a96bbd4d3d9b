//! Precast pricing API server.

use std::env;
use std::sync::Arc;

use tracing::info;

use precast_pricing::api::{AppState, create_router};
use precast_pricing::config::ConfigLoader;
use precast_pricing::engine::PricingEngine;
use precast_pricing::logging;
use precast_pricing::store::LedgerStore;

const CONFIG_DIR_ENV: &str = "PRECAST_CONFIG_DIR";
const DEFAULT_CONFIG_DIR: &str = "./config/precast";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init();

    let config_dir = env::var(CONFIG_DIR_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_DIR.to_string());
    let config = ConfigLoader::load(&config_dir)?.into_config();
    info!(config_dir = %config_dir, "Configuration loaded");

    let store = LedgerStore::open(&config.database().path)?;
    info!(path = %config.database().path, "Ledger store opened");

    let bind_address = config.server().bind_address.clone();
    let engine = PricingEngine::new(store, Arc::new(config));
    let router = create_router(AppState::new(engine));

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    info!(address = %bind_address, "Precast pricing API listening");
    axum::serve(listener, router).await?;

    Ok(())
}
