//! Stream Registry Error Types

use crate::db::StoreError;

/// Failures of registry operations.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// The generated key already belongs to a cached stream. Call `add` again.
    #[error("Uniqueness error when adding a stream: {0}")]
    SecretCollision(String),

    /// The stream is no longer tracked by the registry.
    #[error("Stream is not in the cache: {0}")]
    NotCached(String),

    /// The write task was cancelled before it finished (runtime shutdown).
    #[error("Registry write was interrupted")]
    Interrupted,

    #[error(transparent)]
    Store(#[from] StoreError),
}
