//! MySQL Backend Integration Tests
//!
//! Requires a running MySQL server matching `Config::default_for_test()`:
//! `docker run -d --name reportme-test-mysql -e MYSQL_ROOT_PASSWORD=test -e MYSQL_USER=test -e MYSQL_PASSWORD=test -e MYSQL_DATABASE=test -p 3307:3306 mysql:8`
//!
//! Run with: `cargo test --test mysql_store_test -- --ignored --test-threads=1`

use std::sync::Arc;
use std::time::Duration;

use reportme_server::config::Config;
use reportme_server::db::{
    check_connection, run_migrations, Backoff, ConnectionManager, Connector, MySqlConnector,
    StoreConnection, StoreError,
};
use reportme_server::streams::{generate_secret, StreamRegistry, StreamStatus};
use serial_test::serial;

async fn connector() -> MySqlConnector {
    let config = Config::default_for_test();
    let connector = MySqlConnector::new(&config.database);
    run_migrations(&connector)
        .await
        .expect("Failed to run migrations");
    connector
}

#[tokio::test]
#[ignore = "requires MySQL"]
#[serial]
async fn test_check_connection() {
    let connector = connector().await;

    check_connection(&connector).await.unwrap();
}

#[tokio::test]
#[ignore = "requires MySQL"]
#[serial]
async fn test_statements_round_trip() {
    let connector = connector().await;
    let mut conn = connector.connect().await.unwrap();
    let secret = generate_secret();

    let id = conn
        .insert_stream("U1", &secret, "mysql test", StreamStatus::Active)
        .await
        .unwrap();
    assert!(id.is_some());
    assert_eq!(conn.count_streams_by_secret(&secret).await.unwrap(), 1);

    let updated = conn
        .update_stream_status(&secret, StreamStatus::Stopped)
        .await
        .unwrap();
    assert_eq!(updated, 1);
    let row = conn
        .fetch_streams()
        .await
        .unwrap()
        .into_iter()
        .find(|r| r.secret == secret)
        .unwrap();
    assert_eq!(row.status, StreamStatus::Stopped);
    assert_eq!(row.name, "mysql test");

    assert_eq!(conn.delete_stream(&secret).await.unwrap(), 1);
    assert_eq!(conn.delete_stream(&secret).await.unwrap(), 0);
    conn.close().await.unwrap();
}

#[tokio::test]
#[ignore = "requires MySQL"]
#[serial]
async fn test_duplicate_secret_is_not_transient() {
    let connector = connector().await;
    let mut conn = connector.connect().await.unwrap();
    let secret = generate_secret();

    conn.insert_stream("U1", &secret, "first", StreamStatus::Active)
        .await
        .unwrap();
    let err = conn
        .insert_stream("U2", &secret, "second", StreamStatus::Active)
        .await
        .unwrap_err();

    assert!(matches!(err, StoreError::Database(_)));
    assert!(!err.is_transient());
    conn.delete_stream(&secret).await.unwrap();
}

#[tokio::test]
#[ignore = "requires MySQL"]
#[serial]
async fn test_rollback_discards_insert() {
    let connector = connector().await;
    let mut conn = connector.connect().await.unwrap();
    let secret = generate_secret();

    conn.begin().await.unwrap();
    conn.insert_stream("U1", &secret, "rolled back", StreamStatus::Active)
        .await
        .unwrap();
    conn.rollback().await.unwrap();

    assert_eq!(conn.count_streams_by_secret(&secret).await.unwrap(), 0);
}

#[tokio::test]
#[ignore = "requires MySQL"]
#[serial]
async fn test_registry_over_mysql() {
    let connector = connector().await;
    let manager = ConnectionManager::new(
        Arc::new(connector),
        Backoff::new(Duration::from_millis(100), 60),
    );
    let registry = StreamRegistry::load(manager.clone()).await.unwrap();

    let secret = registry.add("U1", "registry test").await.unwrap();
    let record = registry.get(&secret).unwrap();
    registry
        .set_status(&record, StreamStatus::Stopped)
        .await
        .unwrap();

    let reloaded = StreamRegistry::load(manager).await.unwrap();
    assert_eq!(reloaded.get(&secret).unwrap().status, StreamStatus::Stopped);

    assert!(registry.delete(&secret).await.unwrap());
}
