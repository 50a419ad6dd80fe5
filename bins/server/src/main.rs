//! Paystore API Server
//!
//! Main entry point for the Paystore ledger service.

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use paystore_api::{AppState, create_router};
use paystore_core::ledger::{LedgerCaches, LedgerService, LedgerSettings, LedgerStores};
use paystore_db::{SeaStore, connect};
use paystore_shared::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "paystore=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load().context("Failed to load configuration")?;

    let db = connect(&config.database).await?;
    info!(
        max_connections = config.database.max_connections,
        "Connected to database"
    );

    let settings = LedgerSettings::from_config(&config.ledger, &config.cache);
    info!(
        transaction_timeout_ms = config.ledger.transaction_timeout_ms,
        page_size = settings.page_size,
        "Ledger configured"
    );

    let service = LedgerService::new(
        LedgerStores::from_backend(Arc::new(SeaStore::new(db))),
        LedgerCaches::in_memory(&config.cache),
        settings,
    );

    let app = create_router(AppState::new(service));

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
