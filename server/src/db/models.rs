//! Database Models

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use tracing::warn;

/// Table holding every stream. The name is stable across versions.
pub const STREAMS_TABLE: &str = "streams";

/// Delivery status of a stream.
///
/// Stored as an integer: `0` = stopped, `1` = active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamStatus {
    Stopped,
    Active,
}

impl StreamStatus {
    /// Column value for this status.
    pub const fn as_db(self) -> i8 {
        match self {
            Self::Stopped => 0,
            Self::Active => 1,
        }
    }

    /// Parse a column value.
    pub const fn from_db(value: i8) -> Option<Self> {
        match value {
            0 => Some(Self::Stopped),
            1 => Some(Self::Active),
            _ => None,
        }
    }

    pub const fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }
}

/// A named, secret-keyed notification channel owned by one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamRecord {
    /// Store-assigned identity.
    pub id: i64,
    /// Telegram user ID of the owner (chat ID).
    pub owner_id: String,
    /// Stream key. Unique, immutable, and the only capability needed to push messages.
    pub secret: String,
    /// Display label given at creation.
    pub name: String,
    pub status: StreamStatus,
}

/// Raw `streams` row.
#[derive(Debug, Clone, FromRow)]
pub struct StreamRow {
    pub id: i64,
    pub user_id: String,
    pub secret: String,
    pub name: String,
    pub status: i8,
}

impl From<StreamRow> for StreamRecord {
    fn from(row: StreamRow) -> Self {
        let status = StreamStatus::from_db(row.status).unwrap_or_else(|| {
            warn!(
                secret = %row.secret,
                status = row.status,
                "Unknown stream status in database, treating stream as stopped"
            );
            StreamStatus::Stopped
        });

        Self {
            id: row.id,
            owner_id: row.user_id,
            secret: row.secret,
            name: row.name,
            status,
        }
    }
}
