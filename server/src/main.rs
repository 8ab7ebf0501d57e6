//! `ReportMe` Server - Main Entry Point

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{error, info, warn};

use reportme_server::db::{self, Backoff, ConnectionManager, MySqlConnector};
use reportme_server::streams::StreamRegistry;
use reportme_server::telegram::TelegramClient;
use reportme_server::{api, config};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "reportme_server=debug,tower_http=debug".into()),
        )
        .json()
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::from_env()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        base_url = %config.base_url,
        webhook_url = %config.webhook_url(),
        "Starting ReportMe Server"
    );

    // Database preflight: the server does not start without a reachable store
    let connector = MySqlConnector::new(&config.database);
    if let Err(e) = db::check_connection(&connector).await {
        error!(error = %e, "Database connect failed");
        return Err(e).context("Database connect failed");
    }
    db::run_migrations(&connector).await?;

    let backoff = Backoff::new(config.reconnect_unit, config.reconnect_max_units);
    let manager = ConnectionManager::new(Arc::new(connector), backoff);

    // Load streams
    info!("Loading streams...");
    let registry = StreamRegistry::load(manager)
        .await
        .context("Failed to load streams")?;

    // Telegram bot
    let telegram = TelegramClient::new(&config.bot_token);
    install_webhook(&telegram, &config.webhook_url()).await;

    // Build application state
    let state = api::AppState::new(Arc::new(registry), Arc::new(telegram), config.clone());

    // Build router
    let app = api::create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    info!(address = %config.bind_address, "Server listening");

    // Graceful shutdown handler
    let shutdown_signal = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install CTRL+C signal handler");
            std::future::pending::<()>().await;
        }
        info!("Received shutdown signal, cleaning up...");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("Server shutdown complete");

    Ok(())
}

/// Replace the bot's webhook with ours. Failures are logged; the server still starts.
async fn install_webhook(telegram: &TelegramClient, url: &str) {
    if let Err(e) = telegram.delete_webhook().await {
        warn!(error = %e, "Exception when removing the old webhook for telegram bot");
    }
    match telegram.set_webhook(url).await {
        Ok(true) => info!(url, "Webhook for telegram bot is set"),
        Ok(false) => error!(url, "Error when installing webhook for telegram bot"),
        Err(e) => warn!(error = %e, "Exception when installing webhook for telegram bot"),
    }
}
