//! Message Relay Handlers
//!
//! Anyone holding a stream key can push a message to the stream's owner.
//! The response is always `ok` so callers learn nothing about keys.

use axum::extract::{Form, Path, State};
use serde::Deserialize;
use tracing::{info, instrument, warn};

use super::AppState;
use crate::telegram::SendOptions;

/// Outcome of one relay attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    /// The stream exists but is stopped.
    Ignored,
    NotFound,
    /// The messenger refused or could not be reached. Not retried.
    Failed,
}

/// Form body of `POST /send/`.
#[derive(Debug, Deserialize)]
pub struct SendForm {
    #[serde(default)]
    pub secret: String,
    #[serde(default)]
    pub message: String,
}

/// `GET /send/{secret}/{message}`
pub async fn send_get(
    State(state): State<AppState>,
    Path((secret, message)): Path<(String, String)>,
) -> &'static str {
    relay(&state, &secret, &message).await;
    "ok"
}

/// `POST /send/` with `secret` and `message` form fields.
pub async fn send_post(State(state): State<AppState>, Form(form): Form<SendForm>) -> &'static str {
    relay(&state, &form.secret, &form.message).await;
    "ok"
}

/// Deliver `message` to the owner of the stream with `secret` if the stream is active.
#[instrument(skip(state, message))]
pub async fn relay(state: &AppState, secret: &str, message: &str) -> Delivery {
    let Some(stream) = state.registry.get(secret) else {
        info!("Attempt to send to a nonexistent stream");
        return Delivery::NotFound;
    };

    if !stream.status.is_active() {
        info!(name = %stream.name, message, "IGNORED (stopped)");
        return Delivery::Ignored;
    }

    let text = if stream.name.is_empty() {
        message.to_string()
    } else {
        format!("{}: {message}", stream.name)
    };

    match state
        .messenger
        .send_message(&stream.owner_id, &text, SendOptions::default())
        .await
    {
        Ok(()) => {
            info!(name = %stream.name, message, "SEND");
            Delivery::Sent
        }
        Err(e) => {
            warn!(name = %stream.name, error = %e, "Failed to deliver message");
            Delivery::Failed
        }
    }
}
