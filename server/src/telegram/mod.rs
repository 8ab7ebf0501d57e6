//! Telegram Messaging
//!
//! Bot API client, update types and the [`Messenger`] seam used by the
//! dispatch layer to talk to users.

mod client;
mod types;

use async_trait::async_trait;

pub use client::{TelegramClient, TELEGRAM_API_URL};
pub use types::{Chat, Message, ParseMode, SendOptions, Update, User};

/// Errors talking to the Bot API.
#[derive(Debug, thiserror::Error)]
pub enum TelegramError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Telegram API error {code:?}: {description}")]
    Api {
        code: Option<i64>,
        description: String,
    },
}

/// Sends text messages to users.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Send `text` to the chat of `chat_id` (the user ID for private chats).
    async fn send_message(
        &self,
        chat_id: &str,
        text: &str,
        options: SendOptions,
    ) -> Result<(), TelegramError>;
}
