//! Notification Streams
//!
//! Stream registry, key generation and registry errors.

mod error;
mod registry;
pub mod secret;

pub use error::RegistryError;
pub use registry::StreamRegistry;
pub use secret::{generate_secret, is_valid_secret, SECRET_LEN};

pub use crate::db::{StreamRecord, StreamStatus};
