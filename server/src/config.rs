//! Server Configuration
//!
//! Loads configuration from `REPORTME_*` environment variables.

use std::env;
use std::time::Duration;

use anyhow::{bail, Result};
use sqlx::mysql::MySqlConnectOptions;

/// Character set used for every store connection.
pub const DB_CHARSET: &str = "utf8mb4";

/// Persistent store connection settings.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// MySQL host, optionally with `:port`
    pub host: String,

    /// MySQL user
    pub user: String,

    /// MySQL password (may be empty)
    pub password: String,

    /// Database name
    pub database: String,
}

impl DatabaseConfig {
    /// Build `sqlx` connect options for these settings.
    pub fn connect_options(&self) -> MySqlConnectOptions {
        let (host, port) = match self.host.rsplit_once(':') {
            Some((host, port)) => match port.parse::<u16>() {
                Ok(port) => (host, Some(port)),
                Err(_) => (self.host.as_str(), None),
            },
            None => (self.host.as_str(), None),
        };

        let mut options = MySqlConnectOptions::new()
            .host(host)
            .username(&self.user)
            .database(&self.database)
            .charset(DB_CHARSET);
        if let Some(port) = port {
            options = options.port(port);
        }
        if !self.password.is_empty() {
            options = options.password(&self.password);
        }
        options
    }
}

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Public URL of the site where this bot runs (e.g., `https://bot.example.com`)
    pub base_url: String,

    /// Path prefix for every route, including the Telegram webhook.
    /// Either empty or starting with `/` and without a trailing `/`.
    pub webhook_path: String,

    /// Server bind address (default: `0.0.0.0:8443`)
    pub bind_address: String,

    /// Store connection settings
    pub database: DatabaseConfig,

    /// Telegram bot token
    pub bot_token: String,

    /// Length of one reconnect backoff unit (default: 1s)
    pub reconnect_unit: Duration,

    /// Backoff cap in units (default: 60)
    pub reconnect_max_units: u32,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            base_url: required(
                "REPORTME_BASE_URL",
                "Base URL",
                "URL of the site where this bot will be run and processed",
            )?,
            webhook_path: normalize_webhook_path(
                &env::var("REPORTME_WEBHOOK_PATH").unwrap_or_default(),
            ),
            bind_address: env::var("REPORTME_BIND_ADDRESS")
                .unwrap_or_else(|_| "0.0.0.0:8443".into()),
            database: DatabaseConfig {
                host: required("REPORTME_DB_HOST", "Database host", "")?,
                user: required("REPORTME_DB_USER", "Database user", "")?,
                password: env::var("REPORTME_DB_PASSWORD").unwrap_or_default(),
                database: required("REPORTME_DB_DATABASE", "Database", "Name of database")?,
            },
            bot_token: required(
                "REPORTME_BOT_TOKEN",
                "Telegram bot token",
                "This token can be obtained in the telegram bot @BotFather",
            )?,
            reconnect_unit: Duration::from_millis(
                env::var("REPORTME_RECONNECT_UNIT_MS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(1000),
            ),
            reconnect_max_units: env::var("REPORTME_RECONNECT_MAX_UNITS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(60),
        })
    }

    /// URL Telegram should deliver updates to.
    pub fn webhook_url(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), self.webhook_path)
    }

    /// Public link for pushing messages into a stream.
    pub fn stream_link(&self, secret: &str) -> String {
        format!("{}/send/{secret}/your-custom-message", self.webhook_url())
    }

    /// Create a default configuration for testing.
    ///
    /// Uses a Docker test container:
    /// - MySQL: `docker run -d --name reportme-test-mysql -e MYSQL_ROOT_PASSWORD=test -e MYSQL_USER=test -e MYSQL_PASSWORD=test -e MYSQL_DATABASE=test -p 3307:3306 mysql:8`
    #[must_use]
    pub fn default_for_test() -> Self {
        Self {
            base_url: "https://bot.example.com".into(),
            webhook_path: "/hook".into(),
            bind_address: "127.0.0.1:8443".into(),
            database: DatabaseConfig {
                host: "127.0.0.1:3307".into(),
                user: "test".into(),
                password: "test".into(),
                database: "test".into(),
            },
            bot_token: "123456:test-token".into(),
            reconnect_unit: Duration::from_millis(10),
            reconnect_max_units: 60,
        }
    }
}

/// Read a required variable, failing with a message that tells the operator what to set.
fn required(name: &str, desc: &str, hint: &str) -> Result<String> {
    match env::var(name) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => {
            let hint = if hint.is_empty() {
                String::new()
            } else {
                format!(". {hint}")
            };
            bail!("To start this application, you must set environment variable {name} ({desc}){hint}")
        }
    }
}

/// Normalize the route prefix to `""` or `/segment[/segment...]`.
pub fn normalize_webhook_path(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}
