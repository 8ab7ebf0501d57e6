//! Stream Registry
//!
//! In-memory index of every stream, keyed by secret, kept consistent with the
//! `streams` table. The store is loaded once at startup; after that reads are
//! served from the cache and every mutation writes through to the store
//! before the cache changes.
//!
//! Mutations are serialized by a registry-wide lock held across the store
//! write and the cache update, so concurrent callers never interleave inside
//! that window. Each mutation runs on its own task: a caller that goes away
//! mid-write (client disconnect, request timeout) cannot stop the cache update
//! once the store has accepted the write. Reads go straight to the `DashMap`
//! and never wait on the lock.

use std::future::Future;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{error, info};

use super::error::RegistryError;
use super::secret::generate_secret;
use crate::db::{ConnectionManager, StreamRecord, StreamStatus};

/// Authoritative cache of all streams.
pub struct StreamRegistry {
    inner: Arc<Inner>,
}

struct Inner {
    db: Arc<ConnectionManager>,
    streams: DashMap<String, StreamRecord>,
    write_lock: Mutex<()>,
}

impl StreamRegistry {
    /// Load every stream from the store.
    ///
    /// Fails if the bulk read fails; there is no empty-cache fallback.
    #[tracing::instrument(skip(db))]
    pub async fn load(db: Arc<ConnectionManager>) -> Result<Self, RegistryError> {
        let records = {
            let mut session = db.session();
            session
                .execute(|conn| conn.fetch_streams())
                .await
                .map_err(|e| {
                    error!(error = %e, "Failed to load streams");
                    e
                })?
        };

        let streams = DashMap::with_capacity(records.len());
        for record in records {
            streams.insert(record.secret.clone(), record);
        }
        info!(count = streams.len(), "Streams loaded");

        Ok(Self {
            inner: Arc::new(Inner {
                db,
                streams,
                write_lock: Mutex::new(()),
            }),
        })
    }

    /// Look up a stream by key. Cache only.
    pub fn get(&self, secret: &str) -> Option<StreamRecord> {
        self.inner
            .streams
            .get(secret)
            .map(|entry| entry.value().clone())
    }

    /// All streams owned by `owner_id`, in no particular order.
    pub fn get_all_for_owner(&self, owner_id: &str) -> Vec<StreamRecord> {
        self.inner
            .streams
            .iter()
            .filter(|entry| entry.owner_id == owner_id)
            .map(|entry| entry.value().clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.streams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.streams.is_empty()
    }

    /// Create an active stream for `owner_id` and return its key.
    ///
    /// A key collision is reported, not retried; call again for a new key.
    pub async fn add(&self, owner_id: &str, name: &str) -> Result<String, RegistryError> {
        self.add_with_secret(owner_id, name, generate_secret())
            .await
    }

    async fn add_with_secret(
        &self,
        owner_id: &str,
        name: &str,
        secret: String,
    ) -> Result<String, RegistryError> {
        let inner = Arc::clone(&self.inner);
        let (owner_id, name) = (owner_id.to_owned(), name.to_owned());
        run_to_completion(async move { inner.add(&owner_id, &name, secret).await }).await
    }

    /// Change a stream's delivery status.
    ///
    /// Setting the status a stream already has is a successful no-op. The
    /// cache changes only after the store update succeeds.
    pub async fn set_status(
        &self,
        record: &StreamRecord,
        status: StreamStatus,
    ) -> Result<(), RegistryError> {
        if record.status == status {
            return Ok(());
        }

        let inner = Arc::clone(&self.inner);
        let secret = record.secret.clone();
        run_to_completion(async move { inner.set_status(&secret, status).await }).await
    }

    /// Delete a stream from the store and the cache.
    ///
    /// The store delete runs even when the key is not cached. Returns whether a
    /// store row was removed; a key unknown to both is `Ok(false)`.
    pub async fn delete(&self, secret: &str) -> Result<bool, RegistryError> {
        let inner = Arc::clone(&self.inner);
        let secret = secret.to_owned();
        run_to_completion(async move { inner.delete(&secret).await }).await
    }
}

/// Run a mutation on its own task and wait for it.
///
/// Dropping the returned future detaches the task instead of cancelling it.
async fn run_to_completion<T, F>(mutation: F) -> Result<T, RegistryError>
where
    F: Future<Output = Result<T, RegistryError>> + Send + 'static,
    T: Send + 'static,
{
    match tokio::spawn(mutation).await {
        Ok(result) => result,
        Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
        Err(e) => {
            error!(error = %e, "Registry write task was cancelled");
            Err(RegistryError::Interrupted)
        }
    }
}

impl Inner {
    async fn add(
        &self,
        owner_id: &str,
        name: &str,
        secret: String,
    ) -> Result<String, RegistryError> {
        let _guard = self.write_lock.lock().await;

        if self.streams.contains_key(&secret) {
            error!(secret = %secret, "Uniqueness error when adding a stream");
            return Err(RegistryError::SecretCollision(secret));
        }

        let status = StreamStatus::Active;
        let mut session = self.db.session();
        let inserted = session
            .execute(|conn| {
                let (owner_id, secret, name) = (owner_id.to_owned(), secret.clone(), name.to_owned());
                Box::pin(async move { conn.insert_stream(&owner_id, &secret, &name, status).await })
            })
            .await
            .map_err(|e| {
                error!(user_id = %owner_id, error = %e, "Error when adding a new stream");
                e
            })?;

        let Some(id) = inserted else {
            error!(secret = %secret, "Store accepted a new stream but assigned no id");
            panic!("stream {secret} was inserted but the store assigned no id");
        };

        self.streams.insert(
            secret.clone(),
            StreamRecord {
                id,
                owner_id: owner_id.to_owned(),
                secret: secret.clone(),
                name: name.to_owned(),
                status,
            },
        );
        info!(name, user_id = %owner_id, secret = %secret, "Added new stream");

        Ok(secret)
    }

    async fn set_status(&self, secret: &str, status: StreamStatus) -> Result<(), RegistryError> {
        let _guard = self.write_lock.lock().await;

        let cached_status = self.streams.get(secret).map(|entry| entry.status);
        match cached_status {
            None => {
                error!(
                    secret,
                    "Attempt to change the status of the stream that is not in the cache"
                );
                return Err(RegistryError::NotCached(secret.to_owned()));
            }
            Some(current) if current == status => return Ok(()),
            Some(_) => {}
        }

        let mut session = self.db.session();
        session
            .execute(|conn| {
                let secret = secret.to_owned();
                Box::pin(async move { conn.update_stream_status(&secret, status).await })
            })
            .await
            .map_err(|e| {
                error!(secret, error = %e, "Error when changing the stream status");
                e
            })?;

        if let Some(mut cached) = self.streams.get_mut(secret) {
            cached.status = status;
        }
        info!(secret, status = ?status, "Stream status changed");

        Ok(())
    }

    async fn delete(&self, secret: &str) -> Result<bool, RegistryError> {
        let _guard = self.write_lock.lock().await;

        let mut session = self.db.session();
        let removed = session
            .execute(|conn| {
                let secret = secret.to_owned();
                Box::pin(async move { conn.delete_stream(&secret).await })
            })
            .await
            .map_err(|e| {
                error!(secret, error = %e, "Error deleting a stream");
                e
            })?;

        match self.streams.remove(secret) {
            Some((_, record)) => info!(
                name = %record.name,
                user_id = %record.owner_id,
                secret,
                rows = removed,
                "Deleted stream"
            ),
            None => info!(secret, rows = removed, "Deleted stream that was not cached"),
        }

        Ok(removed > 0)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::db::memory::MemoryStore;
    use crate::db::Backoff;

    async fn registry(store: &MemoryStore) -> StreamRegistry {
        let manager = ConnectionManager::new(
            Arc::new(store.connector()),
            Backoff::new(Duration::from_millis(1), 60),
        );
        StreamRegistry::load(manager).await.unwrap()
    }

    #[tokio::test]
    async fn test_secret_collision_leaves_store_untouched() {
        let store = MemoryStore::new();
        store.seed("u1", "TAKEN", "old", StreamStatus::Active);
        let registry = registry(&store).await;

        let result = registry
            .add_with_secret("u2", "new", "TAKEN".to_string())
            .await;

        assert!(matches!(result, Err(RegistryError::SecretCollision(s)) if s == "TAKEN"));
        assert_eq!(store.writes(), 0);
        assert_eq!(store.rows().len(), 1);
        assert_eq!(registry.get("TAKEN").unwrap().owner_id, "u1");
    }

    #[tokio::test]
    async fn test_add_with_secret_caches_record() {
        let store = MemoryStore::new();
        let registry = registry(&store).await;

        let secret = registry
            .add_with_secret("u1", "alerts", "FIXED".to_string())
            .await
            .unwrap();

        assert_eq!(secret, "FIXED");
        let record = registry.get("FIXED").unwrap();
        assert_eq!(record.id, store.find("FIXED").unwrap().id);
        assert_eq!(record.status, StreamStatus::Active);
    }

    #[tokio::test]
    #[should_panic(expected = "assigned no id")]
    async fn test_insert_without_identity_aborts() {
        let store = MemoryStore::new();
        store.set_insert_without_id(true);
        let registry = registry(&store).await;

        let _ = registry.add("u1", "alerts").await;
    }

    #[tokio::test]
    async fn test_set_status_on_uncached_record_fails() {
        let store = MemoryStore::new();
        let registry = registry(&store).await;
        let ghost = StreamRecord {
            id: 99,
            owner_id: "u1".into(),
            secret: "GHOST".into(),
            name: "ghost".into(),
            status: StreamStatus::Active,
        };

        let result = registry.set_status(&ghost, StreamStatus::Stopped).await;

        assert!(matches!(result, Err(RegistryError::NotCached(_))));
        assert_eq!(store.writes(), 0);
    }
}
