use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bb8::{ManageConnection, Pool};
use rusqlite::OpenFlags;
use tokio::sync::Mutex;

use crate::config::DatabaseConfiguration;
use crate::context::Context;
use crate::error::SqlRegistryError;

use super::connection::{apply_wal_pragmas, run_blocking};

/// A pooled `SQLite` connection; statement work locks it from a blocking thread.
pub type SharedSqliteConnection = Arc<Mutex<rusqlite::Connection>>;

pub type SqlitePool = Pool<SqliteManager>;

const IN_MEMORY_DSN: &str = ":memory:";

// Writers on other pooled connections hold the file lock briefly; wait instead of failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// bb8 manager opening `rusqlite` connections for one DSN.
#[derive(Debug, Clone)]
pub struct SqliteManager {
    path: String,
}

impl SqliteManager {
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl ManageConnection for SqliteManager {
    type Connection = SharedSqliteConnection;
    type Error = SqlRegistryError;

    #[allow(clippy::manual_async_fn)]
    fn connect(&self) -> impl Future<Output = Result<Self::Connection, Self::Error>> + Send {
        let path = self.path.clone();
        async move {
            // Default flags include SQLITE_OPEN_URI so `file:` DSNs work as-is.
            let conn = tokio::task::spawn_blocking(move || {
                let conn = rusqlite::Connection::open_with_flags(&path, OpenFlags::default())?;
                conn.busy_timeout(BUSY_TIMEOUT)?;
                Ok::<_, rusqlite::Error>(conn)
            })
            .await
            .map_err(|e| {
                SqlRegistryError::ConnectionError(format!("sqlite open join error: {e}"))
            })??;
            Ok(Arc::new(Mutex::new(conn)))
        }
    }

    #[allow(clippy::manual_async_fn)]
    fn is_valid(
        &self,
        conn: &mut Self::Connection,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send {
        let handle = Arc::clone(conn);
        async move {
            run_blocking(handle, |guard| {
                guard
                    .query_row("SELECT 1", [], |_| Ok(()))
                    .map_err(SqlRegistryError::SqliteError)
            })
            .await
        }
    }

    fn has_broken(&self, _conn: &mut Self::Connection) -> bool {
        false
    }
}

/// Build a pool for `config`, proving the DSN with one direct connection first
/// so an unopenable file fails here instead of at the first checkout.
///
/// `:memory:` gives every connection its own private database, so that DSN
/// is pinned to a single connection that is never reaped.
///
/// # Errors
/// Returns `SqlRegistryError` if the file cannot be opened, the WAL pragma
/// fails, or `ctx` finishes first.
pub(crate) async fn open_pool(
    ctx: &Context,
    config: &DatabaseConfiguration,
) -> Result<SqlitePool, SqlRegistryError> {
    let manager = SqliteManager::new(config.dsn.clone());
    let builder = Pool::builder().connection_timeout(config.pool.connect_timeout());
    let builder = if config.dsn == IN_MEMORY_DSN {
        builder
            .max_size(1)
            .min_idle(Some(1))
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        builder.max_size(config.pool.max_size)
    };

    ctx.run(async move {
        let mut probe = manager.connect().await?;
        apply_wal_pragmas(&mut probe).await?;
        drop(probe);
        builder.build(manager).await
    })
    .await?
}
