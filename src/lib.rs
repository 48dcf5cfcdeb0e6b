//! Named database registry.
//!
//! Register database configurations under unique names, provision each one
//! into a pooled [`Database`] handle on demand, and observe every query the
//! handle runs through a pluggable [`ExecutorHook`].
//!
//! ```rust,no_run
//! use sql_registry::prelude::*;
//!
//! # async fn demo() -> Result<(), SqlRegistryError> {
//! let registry = Registry::new();
//! registry.register(
//!     DatabaseConfiguration::new("app", "/tmp/app.sqlite", DatabaseSystem::Sqlite3)
//!         .with_auto_create_tables(true),
//! )?;
//!
//! let ctx = Context::background();
//! registry.provide(&ctx, "app").await?;
//! let db = registry.get("app")?;
//! assert_eq!(db.system(), DatabaseSystem::Sqlite3);
//!
//! registry.unregister("app")?;
//! # Ok(()) }
//! ```

pub mod config;
pub mod context;
pub mod database;
pub mod error;
pub mod executor_hook;
pub mod prelude;
pub mod registry;
pub mod results;
pub mod schema;
pub mod types;

mod pool;

#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use config::{DatabaseConfiguration, PoolSettings};
pub use context::{Context, ContextError};
pub use database::Database;
pub use error::SqlRegistryError;
pub use executor_hook::{DefaultExecutorHook, ExecutorHook, QueryKind};
pub use registry::{
    ConnectionProvider, DatabaseRegistry, Registry, get_db, global_registry, new_db_provider,
    register_db, shutdown_registry, unregister_db,
};
pub use results::{CustomDbRow, ResultSet};
pub use schema::{DdlTableCreator, TableCreator};
pub use types::{DatabaseSystem, RowValues};
