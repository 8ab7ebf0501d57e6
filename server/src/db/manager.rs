//! Connection Manager
//!
//! Hands every worker context its own store connection and hides transient
//! connection loss from callers.
//!
//! A worker context is a [`Session`]. A session owns at most one connection
//! at a time, opens it lazily, and parks it in the manager when dropped so the
//! next context can adopt it instead of opening a new one. A connection is
//! never used by two sessions at once.
//!
//! Reconnecting never gives up: a store outage suspends the sessions that
//! touch the store until it comes back.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures::future::BoxFuture;
use tracing::{error, info, warn};

use super::connection::{Connector, StoreConnection};
use super::error::StoreError;

/// Upper bound on parked idle connections.
const MAX_PARKED_CONNECTIONS: usize = 16;

/// Linear reconnect backoff: attempt `n` is followed by `min(n, max_units)` units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub unit: Duration,
    pub max_units: u32,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            unit: Duration::from_secs(1),
            max_units: 60,
        }
    }
}

impl Backoff {
    pub const fn new(unit: Duration, max_units: u32) -> Self {
        Self { unit, max_units }
    }

    /// Delay after the failed attempt number `attempt` (1-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        self.unit * attempt.min(self.max_units)
    }
}

/// Process-wide owner of store connectivity.
pub struct ConnectionManager {
    connector: Arc<dyn Connector>,
    backoff: Backoff,
    parked: Mutex<Vec<Box<dyn StoreConnection>>>,
}

impl ConnectionManager {
    pub fn new(connector: Arc<dyn Connector>, backoff: Backoff) -> Arc<Self> {
        Arc::new(Self {
            connector,
            backoff,
            parked: Mutex::new(Vec::new()),
        })
    }

    /// Start a worker context, adopting a parked connection if one is available.
    pub fn session(self: &Arc<Self>) -> Session {
        let conn = self
            .parked
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop();
        Session {
            manager: Arc::clone(self),
            adopted: conn.is_some(),
            conn,
            in_transaction: false,
        }
    }

    /// Number of idle connections waiting for a session.
    pub fn parked_connections(&self) -> usize {
        self.parked
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn park(&self, conn: Box<dyn StoreConnection>) {
        let mut parked = self.parked.lock().unwrap_or_else(PoisonError::into_inner);
        if parked.len() < MAX_PARKED_CONNECTIONS {
            parked.push(conn);
        }
    }

    /// Open a connection, retrying until the store accepts one.
    async fn establish(&self) -> Box<dyn StoreConnection> {
        let mut attempt: u32 = 1;
        loop {
            info!(attempt, "Connecting to the database");
            match self.connector.connect().await {
                Ok(conn) => {
                    info!(attempt, "The connection to the database is established");
                    return conn;
                }
                Err(e) => {
                    let delay = self.backoff.delay(attempt);
                    warn!(
                        attempt,
                        error = %e,
                        delay_ms = delay.as_millis() as u64,
                        "Failed to connect to the database, waiting before the next attempt"
                    );
                    attempt = attempt.saturating_add(1);
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

/// A worker context's private handle on one store connection.
pub struct Session {
    manager: Arc<ConnectionManager>,
    conn: Option<Box<dyn StoreConnection>>,
    /// The connection came from the parking lot and has not been checked yet.
    adopted: bool,
    in_transaction: bool,
}

impl Session {
    /// The session's connection, established first if there is none yet.
    ///
    /// A connection adopted from the parking lot is pinged before its first
    /// use and replaced if the server has dropped it in the meantime.
    pub async fn get_connection(&mut self) -> &mut dyn StoreConnection {
        let conn = match self.conn.take() {
            Some(mut conn) if self.adopted => {
                self.adopted = false;
                match conn.ping().await {
                    Ok(()) => conn,
                    Err(e) => {
                        warn!(error = %e, "Parked connection is dead, reconnecting");
                        drop(conn);
                        self.manager.establish().await
                    }
                }
            }
            Some(conn) => conn,
            None => self.manager.establish().await,
        };
        &mut **self.conn.insert(conn)
    }

    /// Drop the current connection and block until a new one is established.
    pub async fn reconnect(&mut self) {
        self.conn = None;
        self.adopted = false;
        self.in_transaction = false;
        let conn = self.manager.establish().await;
        self.conn = Some(conn);
    }

    #[cfg(test)]
    const fn has_connection(&self) -> bool {
        self.conn.is_some()
    }

    /// Run `op` against the connection.
    ///
    /// Connection loss triggers a reconnect and another run of `op`, as many
    /// times as the connection keeps dropping. Any other error is logged and
    /// returned without a retry; partial side effects are the caller's concern.
    pub async fn execute<T, F>(&mut self, mut op: F) -> Result<T, StoreError>
    where
        F: for<'c> FnMut(&'c mut dyn StoreConnection) -> BoxFuture<'c, Result<T, StoreError>>
            + Send,
        T: Send,
    {
        loop {
            let conn = self.get_connection().await;
            let result = op(conn).await;
            match result {
                Ok(value) => return Ok(value),
                Err(e @ StoreError::IdleDisconnect(_)) => {
                    warn!(error = %e, "The client was disconnected by the server because of inactivity");
                    self.reconnect().await;
                }
                Err(e) if e.is_transient() => {
                    warn!(error = %e, "Connection to the database is lost");
                    self.reconnect().await;
                }
                Err(e) => {
                    error!(error = %e, "Error when executing a database statement");
                    return Err(e);
                }
            }
        }
    }

    /// Start an explicit transaction on the session's connection.
    pub async fn begin(&mut self) -> Result<(), StoreError> {
        self.get_connection().await.begin().await?;
        self.in_transaction = true;
        Ok(())
    }

    pub async fn commit(&mut self) -> Result<(), StoreError> {
        let result = self.get_connection().await.commit().await;
        self.in_transaction = false;
        result
    }

    pub async fn rollback(&mut self) -> Result<(), StoreError> {
        let result = self.get_connection().await.rollback().await;
        self.in_transaction = false;
        result
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        // A connection with an open transaction is discarded, never handed on.
        if let Some(conn) = self.conn.take() {
            if !self.in_transaction {
                self.manager.park(conn);
            }
        }
    }
}
