use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::error::SqlRegistryError;
use crate::executor_hook::ExecutorHook;
use crate::schema::TableCreator;
use crate::types::DatabaseSystem;

/// Connection pool sizing for one provisioned database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PoolSettings {
    /// Upper bound on open connections.
    pub max_size: u32,
    /// How long opening (or checking out) a connection may take.
    pub connect_timeout_ms: u64,
}

impl PoolSettings {
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_size: 10,
            connect_timeout_ms: 30_000,
        }
    }
}

/// Everything needed to provision one named database.
///
/// The registry keeps its own copy once registered; later changes to the
/// caller's value have no effect.
///
/// ```rust
/// use sql_registry::prelude::*;
///
/// let cfg = DatabaseConfiguration::new("main", "/tmp/main.sqlite", DatabaseSystem::Sqlite3)
///     .with_auto_create_tables(true)
///     .with_max_connections(4);
/// assert_eq!(cfg.name, "main");
/// ```
///
/// Configurations can also be deserialized from the host application's own
/// config files; the hook and table creator are attached in code afterwards.
#[derive(Clone, Deserialize)]
pub struct DatabaseConfiguration {
    /// Unique name in the registry.
    pub name: String,
    /// Backend-specific connection locator (file path, URI, `key=value` list).
    pub dsn: String,
    pub system: DatabaseSystem,
    /// Run the table creator while provisioning.
    #[serde(default)]
    pub auto_create_tables: bool,
    /// Custom hook; the handle falls back to `DefaultExecutorHook` when unset.
    #[serde(skip)]
    pub executor_hook: Option<Arc<dyn ExecutorHook>>,
    #[serde(skip)]
    pub table_creator: Option<Arc<dyn TableCreator>>,
    #[serde(default)]
    pub pool: PoolSettings,
}

impl DatabaseConfiguration {
    #[must_use]
    pub fn new(name: impl Into<String>, dsn: impl Into<String>, system: DatabaseSystem) -> Self {
        Self {
            name: name.into(),
            dsn: dsn.into(),
            system,
            auto_create_tables: false,
            executor_hook: None,
            table_creator: None,
            pool: PoolSettings::default(),
        }
    }

    #[must_use]
    pub fn with_auto_create_tables(mut self, auto_create_tables: bool) -> Self {
        self.auto_create_tables = auto_create_tables;
        self
    }

    #[must_use]
    pub fn with_executor_hook(mut self, hook: Arc<dyn ExecutorHook>) -> Self {
        self.executor_hook = Some(hook);
        self
    }

    #[must_use]
    pub fn with_table_creator(mut self, creator: Arc<dyn TableCreator>) -> Self {
        self.table_creator = Some(creator);
        self
    }

    #[must_use]
    pub fn with_max_connections(mut self, max_size: u32) -> Self {
        self.pool.max_size = max_size;
        self
    }

    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.pool.connect_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Check the fields the registry itself relies on.
    ///
    /// # Errors
    /// Returns `SqlRegistryError::ConfigError` for an empty name, a zero-sized
    /// pool or a zero connect timeout.
    pub fn validate(&self) -> Result<(), SqlRegistryError> {
        if self.name.trim().is_empty() {
            return Err(SqlRegistryError::ConfigError(
                "database name is required".to_string(),
            ));
        }
        if self.pool.max_size == 0 {
            return Err(SqlRegistryError::ConfigError(format!(
                "database {:?}: pool max_size must be at least 1",
                self.name
            )));
        }
        if self.pool.connect_timeout_ms == 0 {
            return Err(SqlRegistryError::ConfigError(format!(
                "database {:?}: pool connect_timeout_ms must be at least 1",
                self.name
            )));
        }
        Ok(())
    }
}

// The DSN may embed credentials, so it is left out.
impl fmt::Debug for DatabaseConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfiguration")
            .field("name", &self.name)
            .field("system", &self.system)
            .field("auto_create_tables", &self.auto_create_tables)
            .field(
                "executor_hook",
                &self.executor_hook.as_ref().map(|h| h.hook_name()),
            )
            .field("table_creator", &self.table_creator.is_some())
            .field("pool", &self.pool)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor_hook::DefaultExecutorHook;

    #[test]
    fn deserializes_with_defaults() {
        let cfg: DatabaseConfiguration = serde_json::from_str(
            r#"{"name": "reports", "dsn": "host=db user=app", "system": "postgres"}"#,
        )
        .unwrap();
        assert_eq!(cfg.system, DatabaseSystem::Postgres);
        assert!(!cfg.auto_create_tables);
        assert!(cfg.executor_hook.is_none());
        assert_eq!(cfg.pool, PoolSettings::default());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn rejects_empty_name_empty_pool_and_zero_timeout() {
        let cfg = DatabaseConfiguration::new("  ", "x.db", DatabaseSystem::Sqlite3);
        assert!(matches!(cfg.validate(), Err(SqlRegistryError::ConfigError(_))));

        let cfg = DatabaseConfiguration::new("a", "x.db", DatabaseSystem::Sqlite3)
            .with_max_connections(0);
        assert!(matches!(cfg.validate(), Err(SqlRegistryError::ConfigError(_))));

        let cfg = DatabaseConfiguration::new("a", "x.db", DatabaseSystem::Sqlite3)
            .with_connect_timeout(Duration::ZERO);
        assert!(matches!(cfg.validate(), Err(SqlRegistryError::ConfigError(_))));

        let cfg: DatabaseConfiguration = serde_json::from_str(
            r#"{"name": "a", "dsn": "x.db", "system": "sqlite3", "pool": {"connect_timeout_ms": 0}}"#,
        )
        .unwrap();
        assert!(matches!(cfg.validate(), Err(SqlRegistryError::ConfigError(_))));
    }

    #[test]
    fn debug_hides_dsn() {
        let cfg = DatabaseConfiguration::new("a", "postgres://u:secret@h/db", DatabaseSystem::Postgres)
            .with_executor_hook(Arc::new(DefaultExecutorHook))
            .with_connect_timeout(Duration::from_secs(2));
        let out = format!("{cfg:?}");
        assert!(!out.contains("secret"));
        assert!(out.contains("DefaultExecutorHook"));
        assert_eq!(cfg.pool.connect_timeout(), Duration::from_secs(2));
    }
}
