use std::fmt;
use std::future::Future;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::context::Context;
use crate::error::SqlRegistryError;
use crate::executor_hook::{ExecutorHook, Phase, QueryKind, notify};
use crate::pool::BackendPool;
use crate::results::{CustomDbRow, ResultSet};
use crate::types::{DatabaseSystem, RowValues};

/// A live, queryable database bound to one registered configuration.
///
/// Handles are created by the registry's provider and shared as
/// `Arc<Database>`. Every query goes through the handle's
/// [`ExecutorHook`]: `before_*` right before the statement reaches the
/// connection, `after_*` right after it returns, on success and on failure.
///
/// ```rust,no_run
/// use sql_registry::prelude::*;
///
/// # async fn demo() -> Result<(), SqlRegistryError> {
/// let registry = Registry::new();
/// registry.register(DatabaseConfiguration::new(
///     "main",
///     "file::memory:?cache=shared",
///     DatabaseSystem::Sqlite3,
/// ))?;
/// let ctx = Context::background();
/// let db = registry.provide(&ctx, "main").await?;
/// db.exec(&ctx, "CREATE TABLE t (id INTEGER)", &[]).await?;
/// db.insert(&ctx, "INSERT INTO t (id) VALUES (?1)", &[RowValues::Int(1)]).await?;
/// let row = db.select_one(&ctx, "SELECT id FROM t", &[]).await?;
/// assert!(row.is_some());
/// # Ok(()) }
/// ```
pub struct Database {
    name: String,
    system: DatabaseSystem,
    hook: Arc<dyn ExecutorHook>,
    pool: RwLock<Option<BackendPool>>,
}

impl Database {
    pub(crate) fn new(
        name: String,
        system: DatabaseSystem,
        hook: Arc<dyn ExecutorHook>,
        pool: BackendPool,
    ) -> Self {
        Self {
            name,
            system,
            hook,
            pool: RwLock::new(Some(pool)),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The backend system, fixed when the handle was provisioned.
    #[must_use]
    pub fn system(&self) -> DatabaseSystem {
        self.system
    }

    /// The active hook: the configuration's custom hook, or a `DefaultExecutorHook`.
    #[must_use]
    pub fn executor_hook(&self) -> Arc<dyn ExecutorHook> {
        Arc::clone(&self.hook)
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.read_pool().is_none()
    }

    /// Release the pool. Idle connections close now; connections checked out
    /// by in-flight queries close when those queries finish. Later queries
    /// fail with `SqlRegistryError::Closed`.
    pub fn close(&self) {
        let pool = self.write_pool().take();
        if pool.is_some() {
            tracing::debug!(database = %self.name, "database handle closed");
        }
    }

    /// Run a query expected to return at most one row.
    ///
    /// # Errors
    /// Returns `SqlRegistryError` if the handle is closed, `ctx` finishes, or the backend fails.
    pub async fn select_one(
        &self,
        ctx: &Context,
        query: &str,
        args: &[RowValues],
    ) -> Result<Option<CustomDbRow>, SqlRegistryError> {
        self.observed(QueryKind::SelectOne, ctx, query, args, |pool| async move {
            pool.select(query, args).await.map(ResultSet::into_first)
        })
        .await
    }

    /// # Errors
    /// Returns `SqlRegistryError` if the handle is closed, `ctx` finishes, or the backend fails.
    pub async fn select(
        &self,
        ctx: &Context,
        query: &str,
        args: &[RowValues],
    ) -> Result<ResultSet, SqlRegistryError> {
        self.observed(QueryKind::Select, ctx, query, args, |pool| async move {
            pool.select(query, args).await
        })
        .await
    }

    /// Returns the number of rows inserted.
    ///
    /// # Errors
    /// Returns `SqlRegistryError` if the handle is closed, `ctx` finishes, or the backend fails.
    pub async fn insert(
        &self,
        ctx: &Context,
        query: &str,
        args: &[RowValues],
    ) -> Result<usize, SqlRegistryError> {
        self.dml(QueryKind::Insert, ctx, query, args).await
    }

    /// Returns the number of rows updated.
    ///
    /// # Errors
    /// Returns `SqlRegistryError` if the handle is closed, `ctx` finishes, or the backend fails.
    pub async fn update(
        &self,
        ctx: &Context,
        query: &str,
        args: &[RowValues],
    ) -> Result<usize, SqlRegistryError> {
        self.dml(QueryKind::Update, ctx, query, args).await
    }

    /// Returns the number of rows deleted.
    ///
    /// # Errors
    /// Returns `SqlRegistryError` if the handle is closed, `ctx` finishes, or the backend fails.
    pub async fn delete(
        &self,
        ctx: &Context,
        query: &str,
        args: &[RowValues],
    ) -> Result<usize, SqlRegistryError> {
        self.dml(QueryKind::Delete, ctx, query, args).await
    }

    /// Run any single statement (DDL included) and return rows affected.
    ///
    /// # Errors
    /// Returns `SqlRegistryError` if the handle is closed, `ctx` finishes, or the backend fails.
    pub async fn exec(
        &self,
        ctx: &Context,
        query: &str,
        args: &[RowValues],
    ) -> Result<usize, SqlRegistryError> {
        self.dml(QueryKind::Exec, ctx, query, args).await
    }

    /// Run a multi-statement script in one transaction. Hooks see it as an
    /// exec with no arguments.
    ///
    /// # Errors
    /// Returns `SqlRegistryError` if the handle is closed, `ctx` finishes, or the backend fails.
    pub async fn exec_batch(&self, ctx: &Context, script: &str) -> Result<(), SqlRegistryError> {
        self.observed(QueryKind::Exec, ctx, script, &[], |pool| async move {
            pool.execute_batch(script).await
        })
        .await
    }

    async fn dml(
        &self,
        kind: QueryKind,
        ctx: &Context,
        query: &str,
        args: &[RowValues],
    ) -> Result<usize, SqlRegistryError> {
        self.observed(kind, ctx, query, args, |pool| async move {
            pool.execute(query, args).await
        })
        .await
    }

    /// Wrap one backend call in its before/after hook events and race it against `ctx`.
    async fn observed<'q, T, F, Fut>(
        &self,
        kind: QueryKind,
        ctx: &Context,
        query: &'q str,
        args: &'q [RowValues],
        run: F,
    ) -> Result<T, SqlRegistryError>
    where
        F: FnOnce(BackendPool) -> Fut,
        Fut: Future<Output = Result<T, SqlRegistryError>> + 'q,
    {
        let pool = self
            .read_pool()
            .clone()
            .ok_or_else(|| SqlRegistryError::Closed(self.name.clone()))?;

        notify(self.hook.as_ref(), kind, Phase::Before, ctx, query, args);
        let outcome = match ctx.run(run(pool)).await {
            Ok(result) => result,
            Err(e) => Err(SqlRegistryError::Cancelled(e)),
        };
        notify(self.hook.as_ref(), kind, Phase::After, ctx, query, args);
        outcome
    }

    fn read_pool(&self) -> RwLockReadGuard<'_, Option<BackendPool>> {
        self.pool.read().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn write_pool(&self) -> RwLockWriteGuard<'_, Option<BackendPool>> {
        self.pool.write().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("name", &self.name)
            .field("system", &self.system)
            .field("executor_hook", &self.hook.hook_name())
            .field("pool", &*self.read_pool())
            .finish()
    }
}
