//! Reusable test helpers for HTTP and registry integration tests.
//!
//! Provides `TestApp` for building and sending requests through the full axum
//! router against an in-memory store, and `RecordingMessenger` to capture what
//! the bot would have sent to Telegram.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{self, Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use reportme_server::api::{create_router, AppState};
use reportme_server::config::Config;
use reportme_server::db::memory::MemoryStore;
use reportme_server::db::{Backoff, ConnectionManager};
use reportme_server::streams::StreamRegistry;
use reportme_server::telegram::{Messenger, SendOptions, TelegramError};
use tower::ServiceExt;

/// One message the bot sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub chat_id: String,
    pub text: String,
    pub options: SendOptions,
}

/// Messenger that records messages instead of sending them.
#[derive(Debug, Default)]
pub struct RecordingMessenger {
    sent: Mutex<Vec<SentMessage>>,
    fail: Mutex<bool>,
}

impl RecordingMessenger {
    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }

    /// Text of the last message sent, if any.
    pub fn last_text(&self) -> Option<String> {
        self.sent.lock().unwrap().last().map(|m| m.text.clone())
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }

    /// Make every following send fail.
    pub fn set_failing(&self, fail: bool) {
        *self.fail.lock().unwrap() = fail;
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn send_message(
        &self,
        chat_id: &str,
        text: &str,
        options: SendOptions,
    ) -> Result<(), TelegramError> {
        if *self.fail.lock().unwrap() {
            return Err(TelegramError::Api {
                code: Some(403),
                description: "Forbidden: bot was blocked by the user".into(),
            });
        }
        self.sent.lock().unwrap().push(SentMessage {
            chat_id: chat_id.to_string(),
            text: text.to_string(),
            options,
        });
        Ok(())
    }
}

/// Backoff short enough that reconnect tests finish quickly.
pub fn fast_backoff() -> Backoff {
    Backoff::new(Duration::from_millis(1), 60)
}

/// Load a registry over `store`.
pub async fn load_registry(store: &MemoryStore) -> StreamRegistry {
    let manager = ConnectionManager::new(Arc::new(store.connector()), fast_backoff());
    StreamRegistry::load(manager)
        .await
        .expect("Failed to load streams")
}

/// Full router over an in-memory store.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub store: MemoryStore,
    pub registry: Arc<StreamRegistry>,
    pub messenger: Arc<RecordingMessenger>,
    pub config: Config,
}

impl TestApp {
    /// Build a test app over an empty store.
    pub async fn new() -> Self {
        Self::with_store(MemoryStore::new()).await
    }

    /// Build a test app over `store`, loading whatever it already holds.
    pub async fn with_store(store: MemoryStore) -> Self {
        let config = Config::default_for_test();
        let registry = Arc::new(load_registry(&store).await);
        let messenger = Arc::new(RecordingMessenger::default());
        let state = AppState::new(registry.clone(), messenger.clone(), config.clone());

        Self {
            router: create_router(state.clone()),
            state,
            store,
            registry,
            messenger,
            config,
        }
    }

    /// Build a request with the given method and URI.
    pub fn request(method: Method, uri: &str) -> http::request::Builder {
        Request::builder().method(method).uri(uri)
    }

    /// Send a request through the router via `tower::ServiceExt::oneshot`.
    pub async fn oneshot(&self, request: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("oneshot request failed")
    }

    /// Route prefix under which the bot routes live.
    pub fn path(&self, suffix: &str) -> String {
        format!("{}{suffix}", self.config.webhook_path)
    }

    /// URI of the Telegram webhook.
    pub fn webhook_uri(&self) -> String {
        if self.config.webhook_path.is_empty() {
            "/".to_string()
        } else {
            self.config.webhook_path.clone()
        }
    }

    /// Deliver a text message from `user_id` to the webhook.
    pub async fn send_command(&self, user_id: i64, text: &str) -> Response<Body> {
        let update = serde_json::json!({
            "update_id": 1,
            "message": {
                "message_id": 1,
                "from": { "id": user_id, "is_bot": false, "first_name": "Test" },
                "chat": { "id": user_id },
                "text": text,
            }
        });
        let req = Self::request(Method::POST, &self.webhook_uri())
            .header("Content-Type", "application/json")
            .body(Body::from(update.to_string()))
            .unwrap();
        self.oneshot(req).await
    }

    /// `GET /send/{secret}/{message}`
    pub async fn send_get(&self, secret: &str, message: &str) -> Response<Body> {
        let req = Self::request(Method::GET, &self.path(&format!("/send/{secret}/{message}")))
            .body(Body::empty())
            .unwrap();
        self.oneshot(req).await
    }
}

/// Read a response body as a string.
pub async fn body_to_string(response: Response<Body>) -> String {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("Failed to read response body")
        .to_bytes();
    String::from_utf8(bytes.to_vec()).expect("Response body is not UTF-8")
}

/// Read a response body as JSON.
pub async fn body_to_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("Failed to read response body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("Response body is not JSON")
}
