#[cfg(feature = "postgres")]
use crate::postgres::{self, PgPool};
#[cfg(feature = "sqlite")]
use crate::sqlite::{self, SqlitePool};

use crate::config::DatabaseConfiguration;
use crate::context::Context;
use crate::error::SqlRegistryError;
use crate::results::ResultSet;
use crate::types::{DatabaseSystem, RowValues};

/// Connection pool behind one provisioned database.
///
/// Cloning is cheap: every variant is a reference-counted bb8 pool.
#[derive(Clone)]
pub(crate) enum BackendPool {
    #[cfg(feature = "sqlite")]
    Sqlite(SqlitePool),
    #[cfg(feature = "postgres")]
    Postgres(PgPool),
}

// Manual Debug implementation because bb8 pools only print their state
impl std::fmt::Debug for BackendPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            #[cfg(feature = "sqlite")]
            Self::Sqlite(pool) => f.debug_tuple("Sqlite").field(&pool.state()).finish(),
            #[cfg(feature = "postgres")]
            Self::Postgres(pool) => f.debug_tuple("Postgres").field(&pool.state()).finish(),
            #[allow(unreachable_patterns)]
            _ => f.write_str("BackendPool"),
        }
    }
}

impl BackendPool {
    /// Open a pool for `config.system`, bounded by `ctx`.
    ///
    /// # Errors
    /// Returns `SqlRegistryError::Unimplemented` when no driver for the system is
    /// compiled in, otherwise whatever the backend reports while connecting.
    #[cfg_attr(
        not(any(feature = "sqlite", feature = "postgres")),
        allow(unused_variables)
    )]
    pub(crate) async fn open(
        ctx: &Context,
        config: &DatabaseConfiguration,
    ) -> Result<Self, SqlRegistryError> {
        match config.system {
            #[cfg(feature = "sqlite")]
            DatabaseSystem::Sqlite3 => Ok(BackendPool::Sqlite(
                sqlite::config::open_pool(ctx, config).await?,
            )),
            #[cfg(feature = "postgres")]
            DatabaseSystem::Postgres => Ok(BackendPool::Postgres(
                postgres::config::open_pool(ctx, config).await?,
            )),
            #[allow(unreachable_patterns)]
            other => Err(SqlRegistryError::Unimplemented(format!(
                "no driver for {other} is enabled in the current build"
            ))),
        }
    }

    pub(crate) async fn select(
        &self,
        query: &str,
        params: &[RowValues],
    ) -> Result<ResultSet, SqlRegistryError> {
        match self {
            #[cfg(feature = "sqlite")]
            BackendPool::Sqlite(pool) => sqlite::execute_select(pool, query, params).await,
            #[cfg(feature = "postgres")]
            BackendPool::Postgres(pool) => postgres::execute_select(pool, query, params).await,
            #[allow(unreachable_patterns)]
            _ => Err(disabled()),
        }
    }

    pub(crate) async fn execute(
        &self,
        query: &str,
        params: &[RowValues],
    ) -> Result<usize, SqlRegistryError> {
        match self {
            #[cfg(feature = "sqlite")]
            BackendPool::Sqlite(pool) => sqlite::execute_dml(pool, query, params).await,
            #[cfg(feature = "postgres")]
            BackendPool::Postgres(pool) => postgres::execute_dml(pool, query, params).await,
            #[allow(unreachable_patterns)]
            _ => Err(disabled()),
        }
    }

    pub(crate) async fn execute_batch(&self, query: &str) -> Result<(), SqlRegistryError> {
        match self {
            #[cfg(feature = "sqlite")]
            BackendPool::Sqlite(pool) => sqlite::execute_batch(pool, query).await,
            #[cfg(feature = "postgres")]
            BackendPool::Postgres(pool) => postgres::execute_batch(pool, query).await,
            #[allow(unreachable_patterns)]
            _ => Err(disabled()),
        }
    }
}

#[allow(dead_code)]
fn disabled() -> SqlRegistryError {
    SqlRegistryError::Unimplemented("This database type is not enabled in the current build".to_string())
}
