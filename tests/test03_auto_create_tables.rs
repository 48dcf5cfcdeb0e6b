#![cfg(feature = "sqlite")]

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use sql_registry::prelude::*;
use tempfile::tempdir;

use common::{init_tracing, remove_sqlite_files, sqlite_config, sqlite_path};

const USERS_DDL: &str = "CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    created_at TEXT
)";

/// Counts how often it runs.
#[derive(Default)]
struct CountingCreator {
    calls: AtomicUsize,
}

#[async_trait]
impl TableCreator for CountingCreator {
    async fn create_tables(&self, ctx: &Context, db: &Database) -> Result<(), SqlRegistryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        db.exec(ctx, USERS_DDL, &[]).await.map(|_| ())
    }
}

#[tokio::test]
async fn auto_create_tables_lifecycle() -> Result<(), SqlRegistryError> {
    init_tracing();
    let dir = tempdir().map_err(|e| SqlRegistryError::ConfigError(e.to_string()))?;
    let path = sqlite_path(dir.path(), "test");
    let registry = Registry::new();

    let cfg = sqlite_config("test", &path)
        .with_auto_create_tables(true)
        .with_table_creator(Arc::new(DdlTableCreator::new([USERS_DDL])));
    registry.register(cfg)?;
    registry.provide(&Context::background(), "test").await?;

    let db = registry.get("test")?;
    assert_eq!(db.system(), DatabaseSystem::Sqlite3);

    // the table exists and is usable right after provisioning
    let ctx = Context::background();
    db.insert(
        &ctx,
        "INSERT INTO users (id, name) VALUES (?1, ?2)",
        &[RowValues::Int(1), RowValues::Text("alice".into())],
    )
    .await?;
    let row = db
        .select_one(&ctx, "SELECT name FROM users WHERE id = ?1", &[RowValues::Int(1)])
        .await?;
    assert_eq!(
        row.and_then(|r| r.get("name").cloned()),
        Some(RowValues::Text("alice".into()))
    );

    registry.unregister("test")?;
    assert!(db.is_closed());

    assert!(path.exists());
    remove_sqlite_files(&path);
    assert!(!path.exists());

    assert!(matches!(
        registry.get("test"),
        Err(SqlRegistryError::DbNotFound(name)) if name == "test"
    ));
    Ok(())
}

#[tokio::test]
async fn creator_is_skipped_without_auto_create() -> Result<(), SqlRegistryError> {
    let dir = tempdir().map_err(|e| SqlRegistryError::ConfigError(e.to_string()))?;
    let registry = Registry::new();
    let creator = Arc::new(CountingCreator::default());

    registry.register(
        sqlite_config("manual", &sqlite_path(dir.path(), "manual"))
            .with_table_creator(creator.clone()),
    )?;
    let db = registry.provide(&Context::background(), "manual").await?;
    assert_eq!(creator.calls.load(Ordering::SeqCst), 0);

    let err = db
        .select(&Context::background(), "SELECT * FROM users", &[])
        .await
        .unwrap_err();
    assert!(matches!(err, SqlRegistryError::SqliteError(_)), "{err:?}");
    Ok(())
}

#[tokio::test]
async fn creator_runs_once_per_provisioning() -> Result<(), SqlRegistryError> {
    let dir = tempdir().map_err(|e| SqlRegistryError::ConfigError(e.to_string()))?;
    let registry = Registry::new();
    let creator = Arc::new(CountingCreator::default());

    registry.register(
        sqlite_config("counted", &sqlite_path(dir.path(), "counted"))
            .with_auto_create_tables(true)
            .with_table_creator(creator.clone()),
    )?;
    let ctx = Context::background();
    let first = registry.provide(&ctx, "counted").await?;
    let second = registry.provide(&ctx, "counted").await?;
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(creator.calls.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test]
async fn failing_ddl_reports_schema_failure_and_allows_retry() -> Result<(), SqlRegistryError> {
    let dir = tempdir().map_err(|e| SqlRegistryError::ConfigError(e.to_string()))?;
    let path = sqlite_path(dir.path(), "broken");
    let registry = Registry::new();

    registry.register(
        sqlite_config("broken", &path)
            .with_auto_create_tables(true)
            .with_table_creator(Arc::new(DdlTableCreator::new(["CREATE TABLEX nonsense"]))),
    )?;

    let err = registry
        .provide(&Context::background(), "broken")
        .await
        .unwrap_err();
    assert!(matches!(err, SqlRegistryError::SchemaCreationFailed(_)), "{err:?}");

    // still registered, never provisioned
    assert!(matches!(
        registry.get("broken"),
        Err(SqlRegistryError::NotProvisioned(_))
    ));

    registry.unregister("broken")?;
    registry.register(
        sqlite_config("broken", &path)
            .with_auto_create_tables(true)
            .with_table_creator(Arc::new(DdlTableCreator::new([USERS_DDL]))),
    )?;
    let db = registry.provide(&Context::background(), "broken").await?;
    let rows = db.select(&Context::background(), "SELECT * FROM users", &[]).await?;
    assert!(rows.is_empty());
    Ok(())
}

#[tokio::test]
async fn partial_batch_is_rolled_back() -> Result<(), SqlRegistryError> {
    let dir = tempdir().map_err(|e| SqlRegistryError::ConfigError(e.to_string()))?;
    let registry = Registry::new();
    let script = "CREATE TABLE first (id INTEGER); CREATE TABLEX second;";

    registry.register(sqlite_config("batch", &sqlite_path(dir.path(), "batch")))?;
    let db = registry.provide(&Context::background(), "batch").await?;
    let ctx = Context::background();

    assert!(db.exec_batch(&ctx, script).await.is_err());
    let tables = db
        .select(
            &ctx,
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1",
            &[RowValues::Text("first".into())],
        )
        .await?;
    assert!(tables.is_empty());
    Ok(())
}
