//! Database Layer
//!
//! Store connectivity for the stream table:
//! - [`ConnectionManager`] / [`Session`]: per-context connections with
//!   transparent reconnect and retry
//! - [`MySqlConnector`]: the production MySQL backend
//! - [`memory::MemoryStore`]: in-process backend with fault injection, public
//!   so the integration tests under `tests/` can use it

mod connection;
mod error;
mod manager;
pub mod memory;
mod models;
mod mysql;

pub use connection::{check_connection, Connector, StoreConnection};
pub use error::*;
pub use manager::{Backoff, ConnectionManager, Session};
pub use models::*;
pub use mysql::{run_migrations, MySqlConnector};
