use std::collections::HashMap;
use std::sync::{Arc, LazyLock, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use crate::config::DatabaseConfiguration;
use crate::context::Context;
use crate::database::Database;
use crate::error::SqlRegistryError;
use crate::executor_hook::{DefaultExecutorHook, ExecutorHook};
use crate::pool::BackendPool;

/// Name-keyed bookkeeping: register, look up and tear down databases.
///
/// All three operations are in-memory only; opening connections is the
/// job of [`ConnectionProvider`].
pub trait DatabaseRegistry: Send + Sync {
    /// Store `config` under `config.name`.
    ///
    /// # Errors
    /// `DatabaseConflict` if the name is taken, `ConfigError` if the configuration is invalid.
    fn register(&self, config: DatabaseConfiguration) -> Result<(), SqlRegistryError>;

    /// Close the database's connections (if provisioned) and forget the name.
    ///
    /// # Errors
    /// `DbNotFound` if the name is not registered.
    fn unregister(&self, name: &str) -> Result<(), SqlRegistryError>;

    /// The live handle for `name`.
    ///
    /// # Errors
    /// `DbNotFound` if the name is not registered, `NotProvisioned` if it is
    /// registered but no provider call has opened it yet.
    fn get(&self, name: &str) -> Result<Arc<Database>, SqlRegistryError>;
}

/// Turns a registered configuration into a live [`Database`].
#[async_trait]
pub trait ConnectionProvider: Send + Sync {
    /// Open (or return the already-open) handle for `name`, bounded by `ctx`.
    ///
    /// # Errors
    /// `DbNotFound`, `ConnectionOpenFailed`, `SchemaCreationFailed`, or
    /// `Unimplemented` for a system with no compiled-in driver.
    async fn provide(&self, ctx: &Context, name: &str) -> Result<Arc<Database>, SqlRegistryError>;
}

struct Entry {
    config: Arc<DatabaseConfiguration>,
    handle: Option<Arc<Database>>,
}

/// In-memory registry of named databases.
///
/// Every read and write of the name map goes through one readers-writer
/// lock. The lock is never held while a connection opens or a query runs.
///
/// Provisioning twice returns the handle from the first call. If two
/// first-time calls race, one handle is installed and the other call's
/// connections are closed before it returns the winner.
#[derive(Default)]
pub struct Registry {
    entries: RwLock<HashMap<String, Entry>>,
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `config` under `config.name`.
    ///
    /// # Errors
    /// `DatabaseConflict` if the name is taken, `ConfigError` if the configuration is invalid.
    pub fn register(&self, config: DatabaseConfiguration) -> Result<(), SqlRegistryError> {
        config.validate()?;
        let mut entries = self.write_entries();
        if entries.contains_key(&config.name) {
            return Err(SqlRegistryError::DatabaseConflict(config.name));
        }
        tracing::debug!(database = %config.name, system = %config.system, "database registered");
        entries.insert(
            config.name.clone(),
            Entry {
                config: Arc::new(config),
                handle: None,
            },
        );
        Ok(())
    }

    /// Close the database's connections (if provisioned) and forget the name.
    ///
    /// # Errors
    /// `DbNotFound` if the name is not registered.
    pub fn unregister(&self, name: &str) -> Result<(), SqlRegistryError> {
        let removed = self
            .write_entries()
            .remove(name)
            .ok_or_else(|| SqlRegistryError::DbNotFound(name.to_string()))?;
        if let Some(handle) = removed.handle {
            handle.close();
        }
        tracing::debug!(database = %name, "database unregistered");
        Ok(())
    }

    /// The live handle for `name`.
    ///
    /// # Errors
    /// `DbNotFound` if the name is not registered, `NotProvisioned` if it has not been opened.
    pub fn get(&self, name: &str) -> Result<Arc<Database>, SqlRegistryError> {
        let entries = self.read_entries();
        let entry = entries
            .get(name)
            .ok_or_else(|| SqlRegistryError::DbNotFound(name.to_string()))?;
        entry
            .handle
            .clone()
            .ok_or_else(|| SqlRegistryError::NotProvisioned(name.to_string()))
    }

    /// Open (or return the already-open) handle for `name`, bounded by `ctx`.
    ///
    /// # Errors
    /// `DbNotFound`, `ConnectionOpenFailed`, `SchemaCreationFailed`, or
    /// `Unimplemented` for a system with no compiled-in driver.
    pub async fn provide(
        &self,
        ctx: &Context,
        name: &str,
    ) -> Result<Arc<Database>, SqlRegistryError> {
        let config = {
            let entries = self.read_entries();
            let entry = entries
                .get(name)
                .ok_or_else(|| SqlRegistryError::DbNotFound(name.to_string()))?;
            if let Some(handle) = &entry.handle {
                return Ok(Arc::clone(handle));
            }
            Arc::clone(&entry.config)
        };

        let db = Arc::new(open_database(ctx, &config).await?);

        let installed = {
            let mut entries = self.write_entries();
            match entries.get_mut(name) {
                // re-registered under the same name while we were opening
                Some(entry) if !Arc::ptr_eq(&entry.config, &config) => {
                    Err(SqlRegistryError::DbNotFound(name.to_string()))
                }
                Some(Entry {
                    handle: Some(existing),
                    ..
                }) => Ok(Arc::clone(existing)),
                Some(entry) => {
                    entry.handle = Some(Arc::clone(&db));
                    Ok(Arc::clone(&db))
                }
                None => Err(SqlRegistryError::DbNotFound(name.to_string())),
            }
        };

        // the losing pool is closed after the map lock is released
        match installed {
            Ok(handle) if Arc::ptr_eq(&handle, &db) => {
                tracing::debug!(database = %name, system = %db.system(), "database provisioned");
                Ok(handle)
            }
            outcome => {
                db.close();
                outcome
            }
        }
    }

    /// The stored configuration for `name`.
    ///
    /// # Errors
    /// `DbNotFound` if the name is not registered.
    pub fn configuration(&self, name: &str) -> Result<Arc<DatabaseConfiguration>, SqlRegistryError> {
        self.read_entries()
            .get(name)
            .map(|entry| Arc::clone(&entry.config))
            .ok_or_else(|| SqlRegistryError::DbNotFound(name.to_string()))
    }

    /// Registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.read_entries().keys().cloned().collect();
        names.sort();
        names
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.read_entries().contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.read_entries().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read_entries().is_empty()
    }

    /// Unregister every database, closing all open handles.
    pub fn shutdown(&self) {
        let drained: Vec<(String, Entry)> = self.write_entries().drain().collect();
        for (name, entry) in drained {
            if let Some(handle) = entry.handle {
                handle.close();
            }
            tracing::debug!(database = %name, "database unregistered during shutdown");
        }
    }

    fn read_entries(&self) -> RwLockReadGuard<'_, HashMap<String, Entry>> {
        self.entries
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn write_entries(&self) -> RwLockWriteGuard<'_, HashMap<String, Entry>> {
        self.entries
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("names", &self.names())
            .finish()
    }
}

impl DatabaseRegistry for Registry {
    fn register(&self, config: DatabaseConfiguration) -> Result<(), SqlRegistryError> {
        Registry::register(self, config)
    }

    fn unregister(&self, name: &str) -> Result<(), SqlRegistryError> {
        Registry::unregister(self, name)
    }

    fn get(&self, name: &str) -> Result<Arc<Database>, SqlRegistryError> {
        Registry::get(self, name)
    }
}

#[async_trait]
impl ConnectionProvider for Registry {
    async fn provide(&self, ctx: &Context, name: &str) -> Result<Arc<Database>, SqlRegistryError> {
        Registry::provide(self, ctx, name).await
    }
}

/// Open the pool, wrap it in a handle and run the table creator if asked to.
/// Nothing is left open on failure.
async fn open_database(
    ctx: &Context,
    config: &DatabaseConfiguration,
) -> Result<Database, SqlRegistryError> {
    let pool = BackendPool::open(ctx, config)
        .await
        .map_err(SqlRegistryError::into_open_failure)?;

    let hook: Arc<dyn ExecutorHook> = match &config.executor_hook {
        Some(hook) => Arc::clone(hook),
        None => Arc::new(DefaultExecutorHook),
    };
    let db = Database::new(config.name.clone(), config.system, hook, pool);

    if config.auto_create_tables {
        if let Some(creator) = &config.table_creator {
            let created = match ctx.run(creator.create_tables(ctx, &db)).await {
                Ok(result) => result,
                Err(e) => Err(SqlRegistryError::Cancelled(e)),
            };
            if let Err(e) = created {
                db.close();
                return Err(e.into_schema_failure());
            }
        }
    }

    Ok(db)
}

static GLOBAL_REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

/// The process-wide registry behind the free functions below, created on first use.
#[must_use]
pub fn global_registry() -> &'static Registry {
    &GLOBAL_REGISTRY
}

/// Register `config` in the process-wide registry.
///
/// # Errors
/// See [`Registry::register`].
pub fn register_db(config: DatabaseConfiguration) -> Result<(), SqlRegistryError> {
    global_registry().register(config)
}

/// Unregister `name` from the process-wide registry.
///
/// # Errors
/// See [`Registry::unregister`].
pub fn unregister_db(name: &str) -> Result<(), SqlRegistryError> {
    global_registry().unregister(name)
}

/// Look up `name` in the process-wide registry.
///
/// # Errors
/// See [`Registry::get`].
pub fn get_db(name: &str) -> Result<Arc<Database>, SqlRegistryError> {
    global_registry().get(name)
}

/// Provision `name` in the process-wide registry.
///
/// # Errors
/// See [`Registry::provide`].
pub async fn new_db_provider(ctx: &Context, name: &str) -> Result<Arc<Database>, SqlRegistryError> {
    global_registry().provide(ctx, name).await
}

/// Unregister everything in the process-wide registry.
pub fn shutdown_registry() {
    global_registry().shutdown();
}
