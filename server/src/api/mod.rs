//! API Router and Application State
//!
//! Central routing configuration and shared state.

pub mod send;
pub mod webhook;

use std::sync::Arc;

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::streams::StreamRegistry;
use crate::telegram::Messenger;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Stream registry (cache + store)
    pub registry: Arc<StreamRegistry>,
    /// Outgoing messages to users
    pub messenger: Arc<dyn Messenger>,
    /// Server configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(
        registry: Arc<StreamRegistry>,
        messenger: Arc<dyn Messenger>,
        config: Config,
    ) -> Self {
        Self {
            registry,
            messenger,
            config: Arc::new(config),
        }
    }
}

/// Create the main application router.
///
/// The webhook and send routes live under the configured webhook path.
pub fn create_router(state: AppState) -> Router {
    let bot_routes = Router::new()
        // Telegram webhook
        .route("/", post(webhook::telegram_webhook))
        // Message relay
        .route("/send/{secret}/{message}", get(send::send_get))
        .route("/send", post(send::send_post))
        .route("/send/", post(send::send_post));

    let prefix = state.config.webhook_path.clone();
    let router = if prefix.is_empty() {
        bot_routes
    } else {
        Router::new().nest(&prefix, bot_routes)
    };

    router
        // Health check
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check response.
#[derive(Serialize)]
struct HealthResponse {
    /// Service status
    status: &'static str,
    /// Number of cached streams
    streams: usize,
}

/// Health check endpoint.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        streams: state.registry.len(),
    })
}
