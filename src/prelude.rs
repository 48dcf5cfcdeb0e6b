//! Convenient re-exports for common usage.
//!
//! ```rust
//! use sql_registry::prelude::*;
//! ```

pub use crate::config::{DatabaseConfiguration, PoolSettings};
pub use crate::context::{Context, ContextError};
pub use crate::database::Database;
pub use crate::error::SqlRegistryError;
pub use crate::executor_hook::{DefaultExecutorHook, ExecutorHook, QueryKind};
pub use crate::registry::{
    ConnectionProvider, DatabaseRegistry, Registry, get_db, global_registry, new_db_provider,
    register_db, shutdown_registry, unregister_db,
};
pub use crate::results::{CustomDbRow, ResultSet};
pub use crate::schema::{DdlTableCreator, TableCreator};
pub use crate::types::{DatabaseSystem, RowValues};
