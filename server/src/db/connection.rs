//! Store Connection Traits
//!
//! The seam between the connection manager and a concrete store backend.

use async_trait::async_trait;

use super::error::StoreError;
use super::models::{StreamRecord, StreamStatus};

/// One live connection to the persistent store.
///
/// Each method is a single statement. Backends report connection loss through
/// [`StoreError::ConnectionLost`] / [`StoreError::IdleDisconnect`].
#[async_trait]
pub trait StoreConnection: Send {
    /// Read every stream row.
    async fn fetch_streams(&mut self) -> Result<Vec<StreamRecord>, StoreError>;

    /// Insert a stream and return the identity assigned by the store, if any.
    async fn insert_stream(
        &mut self,
        owner_id: &str,
        secret: &str,
        name: &str,
        status: StreamStatus,
    ) -> Result<Option<i64>, StoreError>;

    /// Set the status of the stream with `secret`. Returns rows affected.
    async fn update_stream_status(
        &mut self,
        secret: &str,
        status: StreamStatus,
    ) -> Result<u64, StoreError>;

    /// Delete the stream with `secret`. Returns rows affected.
    async fn delete_stream(&mut self, secret: &str) -> Result<u64, StoreError>;

    /// Count rows with `secret` (0 or 1).
    async fn count_streams_by_secret(&mut self, secret: &str) -> Result<i64, StoreError>;

    async fn begin(&mut self) -> Result<(), StoreError>;

    async fn commit(&mut self) -> Result<(), StoreError>;

    async fn rollback(&mut self) -> Result<(), StoreError>;

    async fn ping(&mut self) -> Result<(), StoreError>;

    /// Close the connection gracefully.
    async fn close(self: Box<Self>) -> Result<(), StoreError>;
}

/// Opens new store connections.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn StoreConnection>, StoreError>;
}

/// Open a throwaway connection and close it immediately.
///
/// Startup preflight only; the error's message is the diagnostic.
pub async fn check_connection(connector: &dyn Connector) -> Result<(), StoreError> {
    let conn = connector.connect().await?;
    conn.close().await
}
