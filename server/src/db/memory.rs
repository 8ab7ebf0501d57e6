//! In-Memory Backend
//!
//! A store that lives in process memory, with fault injection for exercising
//! reconnect and failure paths without a MySQL server.

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use super::connection::{Connector, StoreConnection};
use super::error::StoreError;
use super::models::{StreamRecord, StreamStatus};

/// A failure to raise on the next statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Behave like "server has gone away".
    ConnectionLost,
    /// Behave like the server closing an idle connection.
    IdleDisconnect,
    /// Reject the statement with a non-transient error.
    Rejected,
}

#[derive(Debug, Default)]
struct State {
    rows: BTreeMap<i64, StreamRecord>,
    next_id: i64,
    /// Bumped by `drop_connections`; connections from older generations are dead.
    generation: u64,
    refuse_connects: u32,
    connect_attempts: u32,
    faults: VecDeque<Fault>,
    insert_without_id: bool,
    /// Delay between applying a write and reporting it back.
    write_latency: Duration,
    writes: u32,
    commits: u32,
    rollbacks: u32,
}

/// Shared handle to an in-memory store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A connector opening connections to this store.
    pub fn connector(&self) -> MemoryConnector {
        MemoryConnector {
            store: self.clone(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Make the next `count` connection attempts fail.
    pub fn refuse_connects(&self, count: u32) {
        self.lock().refuse_connects = count;
    }

    /// Kill every open connection; their next statement reports connection loss.
    pub fn drop_connections(&self) {
        self.lock().generation += 1;
    }

    /// Queue a fault for the next statement on any connection.
    pub fn inject_fault(&self, fault: Fault) {
        self.lock().faults.push_back(fault);
    }

    /// Make inserts succeed without reporting an identity.
    pub fn set_insert_without_id(&self, enabled: bool) {
        self.lock().insert_without_id = enabled;
    }

    /// Hold every write's response for `latency` after the write has been applied.
    pub fn set_write_latency(&self, latency: Duration) {
        self.lock().write_latency = latency;
    }

    /// Insert a row directly, bypassing any cache. Returns its id.
    pub fn seed(&self, owner_id: &str, secret: &str, name: &str, status: StreamStatus) -> i64 {
        let mut state = self.lock();
        state.next_id += 1;
        let id = state.next_id;
        state.rows.insert(
            id,
            StreamRecord {
                id,
                owner_id: owner_id.to_string(),
                secret: secret.to_string(),
                name: name.to_string(),
                status,
            },
        );
        id
    }

    /// Current row for `secret`, if any.
    pub fn find(&self, secret: &str) -> Option<StreamRecord> {
        self.lock()
            .rows
            .values()
            .find(|r| r.secret == secret)
            .cloned()
    }

    pub fn rows(&self) -> Vec<StreamRecord> {
        self.lock().rows.values().cloned().collect()
    }

    /// Successful insert/update/delete statements so far.
    pub fn writes(&self) -> u32 {
        self.lock().writes
    }

    pub fn connect_attempts(&self) -> u32 {
        self.lock().connect_attempts
    }

    pub fn commits(&self) -> u32 {
        self.lock().commits
    }

    pub fn rollbacks(&self) -> u32 {
        self.lock().rollbacks
    }
}

/// Opens [`MemoryConnection`]s.
#[derive(Debug, Clone)]
pub struct MemoryConnector {
    store: MemoryStore,
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect(&self) -> Result<Box<dyn StoreConnection>, StoreError> {
        let mut state = self.store.lock();
        state.connect_attempts += 1;
        if state.refuse_connects > 0 {
            state.refuse_connects -= 1;
            return Err(StoreError::ConnectionLost(
                "Can't connect to in-memory server".into(),
            ));
        }

        Ok(Box::new(MemoryConnection {
            store: self.store.clone(),
            generation: state.generation,
            snapshot: None,
        }))
    }
}

async fn respond_after(latency: Duration) {
    if !latency.is_zero() {
        tokio::time::sleep(latency).await;
    }
}

/// One connection to a [`MemoryStore`].
#[derive(Debug)]
pub struct MemoryConnection {
    store: MemoryStore,
    generation: u64,
    /// Rows as of `begin`, restored on `rollback`.
    snapshot: Option<BTreeMap<i64, StreamRecord>>,
}

impl MemoryConnection {
    /// Lock the store if this connection has not been dropped. Queued faults stay queued.
    fn alive(&self) -> Result<MutexGuard<'_, State>, StoreError> {
        let state = self.store.lock();
        if state.generation != self.generation {
            return Err(StoreError::ConnectionLost(
                "MySQL server has gone away".into(),
            ));
        }
        Ok(state)
    }

    /// Lock the store for one statement, raising dead-connection and queued faults first.
    fn statement(&self) -> Result<MutexGuard<'_, State>, StoreError> {
        let mut state = self.alive()?;
        match state.faults.pop_front() {
            Some(Fault::ConnectionLost) => {
                // The connection stays dead after the failure.
                state.generation += 1;
                Err(StoreError::ConnectionLost(
                    "Lost connection to MySQL server during query".into(),
                ))
            }
            Some(Fault::IdleDisconnect) => {
                state.generation += 1;
                Err(StoreError::IdleDisconnect(
                    "The client was disconnected by the server because of inactivity".into(),
                ))
            }
            Some(Fault::Rejected) => Err(StoreError::Rejected("injected failure".into())),
            None => Ok(state),
        }
    }
}

#[async_trait]
impl StoreConnection for MemoryConnection {
    async fn fetch_streams(&mut self) -> Result<Vec<StreamRecord>, StoreError> {
        let state = self.statement()?;
        Ok(state.rows.values().cloned().collect())
    }

    async fn insert_stream(
        &mut self,
        owner_id: &str,
        secret: &str,
        name: &str,
        status: StreamStatus,
    ) -> Result<Option<i64>, StoreError> {
        let (id, latency) = {
            let mut state = self.statement()?;
            if state.rows.values().any(|r| r.secret == secret) {
                return Err(StoreError::Rejected(format!(
                    "Duplicate entry '{secret}' for key 'uq_streams_secret'"
                )));
            }
            state.next_id += 1;
            let id = state.next_id;
            state.rows.insert(
                id,
                StreamRecord {
                    id,
                    owner_id: owner_id.to_string(),
                    secret: secret.to_string(),
                    name: name.to_string(),
                    status,
                },
            );
            state.writes += 1;
            ((!state.insert_without_id).then_some(id), state.write_latency)
        };
        respond_after(latency).await;
        Ok(id)
    }

    async fn update_stream_status(
        &mut self,
        secret: &str,
        status: StreamStatus,
    ) -> Result<u64, StoreError> {
        let (affected, latency) = {
            let mut state = self.statement()?;
            state.writes += 1;
            let mut affected = 0;
            for row in state.rows.values_mut().filter(|r| r.secret == secret) {
                row.status = status;
                affected += 1;
            }
            (affected, state.write_latency)
        };
        respond_after(latency).await;
        Ok(affected)
    }

    async fn delete_stream(&mut self, secret: &str) -> Result<u64, StoreError> {
        let (affected, latency) = {
            let mut state = self.statement()?;
            state.writes += 1;
            let before = state.rows.len();
            state.rows.retain(|_, r| r.secret != secret);
            ((before - state.rows.len()) as u64, state.write_latency)
        };
        respond_after(latency).await;
        Ok(affected)
    }

    async fn count_streams_by_secret(&mut self, secret: &str) -> Result<i64, StoreError> {
        let state = self.statement()?;
        Ok(state.rows.values().filter(|r| r.secret == secret).count() as i64)
    }

    async fn begin(&mut self) -> Result<(), StoreError> {
        let rows = self.statement()?.rows.clone();
        self.snapshot = Some(rows);
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), StoreError> {
        self.statement()?.commits += 1;
        self.snapshot = None;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), StoreError> {
        let snapshot = self.snapshot.take();
        let mut state = self.statement()?;
        state.rollbacks += 1;
        if let Some(rows) = snapshot {
            state.rows = rows;
        }
        Ok(())
    }

    async fn ping(&mut self) -> Result<(), StoreError> {
        self.alive().map(|_| ())
    }

    async fn close(self: Box<Self>) -> Result<(), StoreError> {
        Ok(())
    }
}
