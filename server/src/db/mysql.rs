//! MySQL Backend
//!
//! Runtime queries (no compile-time `DATABASE_URL` required).

use async_trait::async_trait;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection};
use sqlx::{ConnectOptions, Connection};
use tracing::{debug, error};

use super::connection::{Connector, StoreConnection};
use super::error::StoreError;
use super::models::{StreamRecord, StreamRow, StreamStatus};
use crate::config::DatabaseConfig;

/// Log and return a database error with context.
macro_rules! db_error {
    ($query:expr, $($field:tt)*) => {
        |e: sqlx::Error| {
            error!(query = $query, $($field)*, error = %e, "Database query failed");
            StoreError::from(e)
        }
    };
    ($query:expr) => {
        |e: sqlx::Error| {
            error!(query = $query, error = %e, "Database query failed");
            StoreError::from(e)
        }
    };
}

/// Opens dedicated `MySqlConnection`s (no pool).
#[derive(Debug, Clone)]
pub struct MySqlConnector {
    options: MySqlConnectOptions,
}

impl MySqlConnector {
    pub fn new(config: &DatabaseConfig) -> Self {
        Self {
            options: config.connect_options(),
        }
    }

    /// Open a bare `sqlx` connection, e.g. for running migrations.
    pub async fn connect_raw(&self) -> Result<MySqlConnection, StoreError> {
        Ok(self.options.connect().await?)
    }
}

#[async_trait]
impl Connector for MySqlConnector {
    async fn connect(&self) -> Result<Box<dyn StoreConnection>, StoreError> {
        debug!("Opening MySQL connection");
        let conn = self.connect_raw().await?;
        Ok(Box::new(conn))
    }
}

#[async_trait]
impl StoreConnection for MySqlConnection {
    async fn fetch_streams(&mut self) -> Result<Vec<StreamRecord>, StoreError> {
        let rows = sqlx::query_as::<_, StreamRow>(
            "SELECT id, user_id, secret, name, status FROM streams",
        )
        .fetch_all(&mut *self)
        .await
        .map_err(db_error!("fetch_streams"))?;

        Ok(rows.into_iter().map(StreamRecord::from).collect())
    }

    async fn insert_stream(
        &mut self,
        owner_id: &str,
        secret: &str,
        name: &str,
        status: StreamStatus,
    ) -> Result<Option<i64>, StoreError> {
        let result = sqlx::query(
            "INSERT INTO streams (user_id, secret, name, status) VALUES (?, ?, ?, ?)",
        )
        .bind(owner_id)
        .bind(secret)
        .bind(name)
        .bind(status.as_db())
        .execute(&mut *self)
        .await
        .map_err(db_error!("insert_stream", user_id = %owner_id, secret = %secret))?;

        let id = result.last_insert_id();
        Ok((id != 0).then_some(id as i64))
    }

    async fn update_stream_status(
        &mut self,
        secret: &str,
        status: StreamStatus,
    ) -> Result<u64, StoreError> {
        let result = sqlx::query("UPDATE streams SET status = ? WHERE secret = ?")
            .bind(status.as_db())
            .bind(secret)
            .execute(&mut *self)
            .await
            .map_err(db_error!("update_stream_status", secret = %secret))?;

        Ok(result.rows_affected())
    }

    async fn delete_stream(&mut self, secret: &str) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM streams WHERE secret = ?")
            .bind(secret)
            .execute(&mut *self)
            .await
            .map_err(db_error!("delete_stream", secret = %secret))?;

        Ok(result.rows_affected())
    }

    async fn count_streams_by_secret(&mut self, secret: &str) -> Result<i64, StoreError> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM streams WHERE secret = ?")
            .bind(secret)
            .fetch_one(&mut *self)
            .await
            .map_err(db_error!("count_streams_by_secret", secret = %secret))
    }

    async fn begin(&mut self) -> Result<(), StoreError> {
        sqlx::query("START TRANSACTION")
            .execute(&mut *self)
            .await
            .map_err(db_error!("begin"))?;
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), StoreError> {
        sqlx::query("COMMIT")
            .execute(&mut *self)
            .await
            .map_err(db_error!("commit"))?;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), StoreError> {
        sqlx::query("ROLLBACK")
            .execute(&mut *self)
            .await
            .map_err(db_error!("rollback"))?;
        Ok(())
    }

    async fn ping(&mut self) -> Result<(), StoreError> {
        Ok(Connection::ping(self).await?)
    }

    async fn close(self: Box<Self>) -> Result<(), StoreError> {
        Ok(Connection::close(*self).await?)
    }
}

/// Run database migrations over a dedicated connection.
pub async fn run_migrations(connector: &MySqlConnector) -> anyhow::Result<()> {
    let mut conn = connector.connect_raw().await?;
    sqlx::migrate!("./migrations").run(&mut conn).await?;
    Connection::close(conn).await?;
    tracing::info!("Database migrations completed");
    Ok(())
}
