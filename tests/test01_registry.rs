#![cfg(feature = "sqlite")]

mod common;

use std::sync::Arc;
use std::time::Duration;

use sql_registry::prelude::*;
use tempfile::tempdir;

use common::{init_tracing, sqlite_config, sqlite_path};

#[tokio::test]
async fn register_provide_get_reports_system() -> Result<(), SqlRegistryError> {
    init_tracing();
    let dir = tempdir().map_err(|e| SqlRegistryError::ConfigError(e.to_string()))?;
    let registry = Registry::new();
    registry.register(sqlite_config("test", &sqlite_path(dir.path(), "test")))?;

    let provided = registry.provide(&Context::background(), "test").await?;
    let db = registry.get("test")?;
    assert!(Arc::ptr_eq(&provided, &db));
    assert_eq!(db.system(), DatabaseSystem::Sqlite3);
    assert_eq!(db.name(), "test");
    Ok(())
}

#[tokio::test]
async fn duplicate_register_conflicts_and_keeps_original() -> Result<(), SqlRegistryError> {
    let dir = tempdir().map_err(|e| SqlRegistryError::ConfigError(e.to_string()))?;
    let registry = Registry::new();
    let first = sqlite_path(dir.path(), "first");
    registry.register(sqlite_config("test", &first))?;
    let db = registry.provide(&Context::background(), "test").await?;

    let err = registry
        .register(sqlite_config("test", &sqlite_path(dir.path(), "second")))
        .unwrap_err();
    assert!(matches!(err, SqlRegistryError::DatabaseConflict(ref n) if n == "test"));

    let cfg = registry.configuration("test")?;
    assert_eq!(cfg.dsn, first.to_string_lossy());
    assert!(Arc::ptr_eq(&db, &registry.get("test")?));
    assert_eq!(registry.len(), 1);
    Ok(())
}

#[tokio::test]
async fn unknown_name_is_not_found_everywhere() {
    let registry = Registry::new();
    assert!(matches!(registry.get("nope"), Err(SqlRegistryError::DbNotFound(_))));
    assert!(matches!(registry.unregister("nope"), Err(SqlRegistryError::DbNotFound(_))));
    assert!(matches!(
        registry.provide(&Context::background(), "nope").await,
        Err(SqlRegistryError::DbNotFound(_))
    ));
    assert!(matches!(
        registry.configuration("nope"),
        Err(SqlRegistryError::DbNotFound(_))
    ));
}

#[tokio::test]
async fn get_before_provisioning_is_a_distinct_error() -> Result<(), SqlRegistryError> {
    let dir = tempdir().map_err(|e| SqlRegistryError::ConfigError(e.to_string()))?;
    let registry = Registry::new();
    registry.register(sqlite_config("lazy", &sqlite_path(dir.path(), "lazy")))?;

    assert!(matches!(registry.get("lazy"), Err(SqlRegistryError::NotProvisioned(ref n)) if n == "lazy"));
    // registration alone performs no I/O
    assert!(!sqlite_path(dir.path(), "lazy").exists());

    registry.provide(&Context::background(), "lazy").await?;
    assert!(registry.get("lazy").is_ok());
    Ok(())
}

#[tokio::test]
async fn unregister_twice_fails_the_second_time() -> Result<(), SqlRegistryError> {
    let dir = tempdir().map_err(|e| SqlRegistryError::ConfigError(e.to_string()))?;
    let registry = Registry::new();
    registry.register(sqlite_config("test", &sqlite_path(dir.path(), "test")))?;
    registry.unregister("test")?;
    assert!(matches!(registry.unregister("test"), Err(SqlRegistryError::DbNotFound(_))));
    assert!(registry.is_empty());
    Ok(())
}

#[tokio::test]
async fn reregister_after_unregister_starts_fresh() -> Result<(), SqlRegistryError> {
    let dir = tempdir().map_err(|e| SqlRegistryError::ConfigError(e.to_string()))?;
    let path = sqlite_path(dir.path(), "test");
    let registry = Registry::new();
    let ctx = Context::background();

    registry.register(sqlite_config("test", &path))?;
    let old = registry.provide(&ctx, "test").await?;
    registry.unregister("test")?;
    assert!(old.is_closed());
    assert!(matches!(
        old.select(&ctx, "SELECT 1", &[]).await,
        Err(SqlRegistryError::Closed(_))
    ));

    registry.register(sqlite_config("test", &path))?;
    assert!(matches!(registry.get("test"), Err(SqlRegistryError::NotProvisioned(_))));
    let fresh = registry.provide(&ctx, "test").await?;
    assert!(!Arc::ptr_eq(&old, &fresh));
    assert!(!fresh.is_closed());
    Ok(())
}

#[tokio::test]
async fn provide_twice_returns_the_same_handle() -> Result<(), SqlRegistryError> {
    let dir = tempdir().map_err(|e| SqlRegistryError::ConfigError(e.to_string()))?;
    let registry = Registry::new();
    registry.register(sqlite_config("test", &sqlite_path(dir.path(), "test")))?;

    let ctx = Context::background();
    let a = registry.provide(&ctx, "test").await?;
    let b = registry.provide(&ctx, "test").await?;
    assert!(Arc::ptr_eq(&a, &b));
    Ok(())
}

#[tokio::test]
async fn bad_dsn_fails_open_and_leaves_registration_intact() -> Result<(), SqlRegistryError> {
    let dir = tempdir().map_err(|e| SqlRegistryError::ConfigError(e.to_string()))?;
    let missing_dir = dir.path().join("does").join("not").join("exist.sqlite");
    let registry = Registry::new();
    registry.register(sqlite_config("broken", &missing_dir))?;

    let err = registry
        .provide(&Context::background(), "broken")
        .await
        .unwrap_err();
    assert!(matches!(err, SqlRegistryError::ConnectionOpenFailed(_)), "{err:?}");
    assert!(registry.contains("broken"));
    assert!(matches!(registry.get("broken"), Err(SqlRegistryError::NotProvisioned(_))));
    Ok(())
}

#[tokio::test]
async fn cancelled_context_aborts_provisioning() -> Result<(), SqlRegistryError> {
    let dir = tempdir().map_err(|e| SqlRegistryError::ConfigError(e.to_string()))?;
    let path = sqlite_path(dir.path(), "cancelled");
    let registry = Registry::new();
    registry.register(sqlite_config("cancelled", &path))?;

    let ctx = Context::background().with_cancel();
    ctx.cancel();
    let err = registry.provide(&ctx, "cancelled").await.unwrap_err();
    assert!(matches!(err, SqlRegistryError::ConnectionOpenFailed(_)), "{err:?}");
    assert!(matches!(registry.get("cancelled"), Err(SqlRegistryError::NotProvisioned(_))));

    // a live context can still provision the same name afterwards
    registry.provide(&Context::background(), "cancelled").await?;
    Ok(())
}

#[tokio::test]
async fn expired_deadline_aborts_provisioning() -> Result<(), SqlRegistryError> {
    let dir = tempdir().map_err(|e| SqlRegistryError::ConfigError(e.to_string()))?;
    let registry = Registry::new();
    registry.register(sqlite_config("expired", &sqlite_path(dir.path(), "expired")))?;

    let ctx = Context::background().with_timeout(Duration::ZERO);
    let err = registry.provide(&ctx, "expired").await.unwrap_err();
    assert!(matches!(err, SqlRegistryError::ConnectionOpenFailed(_)), "{err:?}");
    assert!(matches!(registry.get("expired"), Err(SqlRegistryError::NotProvisioned(_))));

    registry.provide(&Context::background(), "expired").await?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn deadline_reached_while_opening_aborts_provisioning() -> Result<(), SqlRegistryError> {
    let dir = tempdir().map_err(|e| SqlRegistryError::ConfigError(e.to_string()))?;
    let path = sqlite_path(dir.path(), "locked");

    // an exclusive transaction on a separate connection holds the file lock
    let locker = rusqlite::Connection::open(&path)?;
    locker.execute_batch("CREATE TABLE t (id INTEGER); BEGIN EXCLUSIVE;")?;

    let registry = Registry::new();
    registry.register(sqlite_config("locked", &path))?;

    let ctx = Context::background().with_timeout(Duration::from_millis(200));
    let err = registry.provide(&ctx, "locked").await.unwrap_err();
    assert!(matches!(err, SqlRegistryError::ConnectionOpenFailed(_)), "{err:?}");
    assert!(matches!(registry.get("locked"), Err(SqlRegistryError::NotProvisioned(_))));

    locker.execute_batch("COMMIT;")?;
    drop(locker);

    let db = registry.provide(&Context::background(), "locked").await?;
    let rows = db.select(&Context::background(), "SELECT id FROM t", &[]).await?;
    assert!(rows.is_empty());
    Ok(())
}

#[tokio::test]
async fn zero_connect_timeout_is_rejected_at_registration() {
    let registry = Registry::new();
    let err = registry
        .register(
            DatabaseConfiguration::new("z", "z.sqlite", DatabaseSystem::Sqlite3)
                .with_connect_timeout(Duration::ZERO),
        )
        .unwrap_err();
    assert!(matches!(err, SqlRegistryError::ConfigError(_)));
    assert!(matches!(
        registry.provide(&Context::background(), "z").await,
        Err(SqlRegistryError::DbNotFound(_))
    ));
}

#[tokio::test]
async fn system_without_driver_is_unimplemented() -> Result<(), SqlRegistryError> {
    let registry = Registry::new();
    registry.register(DatabaseConfiguration::new(
        "legacy",
        "mysql://user@localhost/app",
        DatabaseSystem::Mysql,
    ))?;
    let err = registry
        .provide(&Context::background(), "legacy")
        .await
        .unwrap_err();
    assert!(matches!(err, SqlRegistryError::Unimplemented(_)), "{err:?}");
    Ok(())
}

#[tokio::test]
async fn invalid_configuration_is_never_stored() {
    let registry = Registry::new();
    let err = registry
        .register(DatabaseConfiguration::new("", ":memory:", DatabaseSystem::Sqlite3))
        .unwrap_err();
    assert!(matches!(err, SqlRegistryError::ConfigError(_)));
    assert!(registry.is_empty());
}

#[tokio::test]
async fn shutdown_closes_every_handle() -> Result<(), SqlRegistryError> {
    let dir = tempdir().map_err(|e| SqlRegistryError::ConfigError(e.to_string()))?;
    let registry = Registry::new();
    let ctx = Context::background();
    registry.register(sqlite_config("a", &sqlite_path(dir.path(), "a")))?;
    registry.register(sqlite_config("b", &sqlite_path(dir.path(), "b")))?;
    let a = registry.provide(&ctx, "a").await?;
    assert_eq!(registry.names(), vec!["a".to_string(), "b".to_string()]);

    registry.shutdown();
    assert!(registry.is_empty());
    assert!(a.is_closed());
    Ok(())
}

#[tokio::test]
async fn registry_is_usable_through_its_traits() -> Result<(), SqlRegistryError> {
    let registry: Arc<Registry> = Arc::new(Registry::new());
    let bookkeeping: Arc<dyn DatabaseRegistry> = registry.clone();
    let provider: Arc<dyn ConnectionProvider> = registry.clone();

    bookkeeping.register(DatabaseConfiguration::new(
        "mem",
        ":memory:",
        DatabaseSystem::Sqlite3,
    ))?;
    let ctx = Context::background();
    let db = provider.provide(&ctx, "mem").await?;
    db.exec(&ctx, "CREATE TABLE t (id INTEGER)", &[]).await?;
    db.insert(&ctx, "INSERT INTO t (id) VALUES (?1)", &[RowValues::Int(3)])
        .await?;
    // a single pinned connection keeps the in-memory database alive
    let row = bookkeeping.get("mem")?.select_one(&ctx, "SELECT id FROM t", &[]).await?;
    assert_eq!(row.and_then(|r| r.get("id").cloned()), Some(RowValues::Int(3)));

    bookkeeping.unregister("mem")?;
    assert!(matches!(bookkeeping.get("mem"), Err(SqlRegistryError::DbNotFound(_))));
    Ok(())
}
