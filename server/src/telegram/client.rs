//! Telegram Bot API client.

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use super::types::{ApiResponse, SendMessageRequest, SendOptions};
use super::{Messenger, TelegramError};

/// Default Bot API endpoint.
pub const TELEGRAM_API_URL: &str = "https://api.telegram.org";

/// HTTP client for one bot.
#[derive(Clone)]
pub struct TelegramClient {
    http: reqwest::Client,
    /// `{api_url}/bot{token}`
    endpoint: String,
}

impl TelegramClient {
    pub fn new(token: &str) -> Self {
        Self::with_api_url(TELEGRAM_API_URL, token)
    }

    /// Client for a custom Bot API server.
    pub fn with_api_url(api_url: &str, token: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: format!("{}/bot{token}", api_url.trim_end_matches('/')),
        }
    }

    async fn call<P: Serialize + Sync>(
        &self,
        method: &str,
        params: &P,
    ) -> Result<serde_json::Value, TelegramError> {
        debug!(method, "Calling Telegram Bot API");
        let response: ApiResponse = self
            .http
            .post(format!("{}/{method}", self.endpoint))
            .json(params)
            .send()
            .await?
            .json()
            .await?;

        if response.ok {
            Ok(response.result.unwrap_or(serde_json::Value::Null))
        } else {
            Err(TelegramError::Api {
                code: response.error_code,
                description: response.description.unwrap_or_default(),
            })
        }
    }

    /// Point the bot's webhook at `url`.
    pub async fn set_webhook(&self, url: &str) -> Result<bool, TelegramError> {
        let result = self
            .call("setWebhook", &serde_json::json!({ "url": url }))
            .await?;
        Ok(result.as_bool().unwrap_or(false))
    }

    /// Remove the bot's current webhook.
    pub async fn delete_webhook(&self) -> Result<bool, TelegramError> {
        let result = self.call("deleteWebhook", &serde_json::json!({})).await?;
        Ok(result.as_bool().unwrap_or(false))
    }
}

#[async_trait]
impl Messenger for TelegramClient {
    async fn send_message(
        &self,
        chat_id: &str,
        text: &str,
        options: SendOptions,
    ) -> Result<(), TelegramError> {
        let body = SendMessageRequest {
            chat_id,
            text,
            parse_mode: options.parse_mode,
            disable_web_page_preview: options.disable_web_page_preview,
        };
        self.call("sendMessage", &body).await?;
        Ok(())
    }
}
