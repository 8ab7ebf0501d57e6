//! Store Error Classification
//!
//! Splits store failures into the transient "connection lost" class, which the
//! connection manager recovers from by reconnecting, and everything else.

use sqlx::mysql::MySqlDatabaseError;

/// MySQL server has gone away.
pub const CR_SERVER_GONE_ERROR: u16 = 2006;

/// Lost connection to MySQL server during query.
pub const CR_SERVER_LOST: u16 = 2013;

/// The client was disconnected by the server because of inactivity.
pub const ER_CLIENT_INTERACTION_TIMEOUT: u16 = 4031;

/// Errors raised by the persistent store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The connection is dead and has to be re-established.
    #[error("Connection to the database is lost: {0}")]
    ConnectionLost(String),

    /// The server closed an idle connection.
    #[error("Disconnected by the server because of inactivity: {0}")]
    IdleDisconnect(String),

    /// The statement failed for a reason reconnecting will not fix.
    #[error("Database error: {0}")]
    Database(#[source] sqlx::Error),

    /// The backend refused the statement.
    #[error("Statement rejected: {0}")]
    Rejected(String),
}

impl StoreError {
    /// Whether the error belongs to the "connection lost" class.
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::ConnectionLost(_) | Self::IdleDisconnect(_))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Io(_) | sqlx::Error::PoolClosed | sqlx::Error::WorkerCrashed => {
                Self::ConnectionLost(err.to_string())
            }
            sqlx::Error::Database(db_err) => {
                match db_err
                    .try_downcast_ref::<MySqlDatabaseError>()
                    .map(MySqlDatabaseError::number)
                {
                    Some(CR_SERVER_GONE_ERROR | CR_SERVER_LOST) => {
                        Self::ConnectionLost(err.to_string())
                    }
                    Some(ER_CLIENT_INTERACTION_TIMEOUT) => Self::IdleDisconnect(err.to_string()),
                    _ => Self::Database(err),
                }
            }
            _ => Self::Database(err),
        }
    }
}
