use std::future::Future;

use bb8::{ManageConnection, Pool};
use tokio_postgres::{Client, NoTls};

use crate::config::DatabaseConfiguration;
use crate::context::Context;
use crate::error::SqlRegistryError;

pub type PgPool = Pool<PgManager>;

/// bb8 manager for Postgres clients.
pub struct PgManager {
    pub(crate) config: tokio_postgres::Config,
}

impl PgManager {
    #[must_use]
    pub fn new(config: tokio_postgres::Config) -> Self {
        Self { config }
    }

    /// Parse a DSN in either URL (`postgres://...`) or `key=value` form.
    ///
    /// # Errors
    /// Returns `SqlRegistryError::ConnectionOpenFailed` if the DSN does not parse.
    pub fn from_dsn(dsn: &str) -> Result<Self, SqlRegistryError> {
        let config = dsn
            .parse::<tokio_postgres::Config>()
            .map_err(|e| SqlRegistryError::ConnectionOpenFailed(format!("invalid postgres dsn: {e}")))?;
        Ok(Self::new(config))
    }
}

impl ManageConnection for PgManager {
    type Connection = Client;
    type Error = tokio_postgres::Error;

    #[allow(clippy::manual_async_fn)]
    fn connect(&self) -> impl Future<Output = Result<Self::Connection, Self::Error>> + Send {
        let cfg = self.config.clone();
        async move {
            tracing::debug!(
                hosts = ?cfg.get_hosts(),
                dbname = ?cfg.get_dbname(),
                user = ?cfg.get_user(),
                "postgres connect start"
            );
            let (client, connection) = cfg.connect(NoTls).await?;
            tokio::spawn(async move {
                if let Err(e) = connection.await {
                    tracing::debug!("postgres connection closed with error: {e}");
                }
            });
            Ok(client)
        }
    }

    #[allow(clippy::manual_async_fn)]
    fn is_valid(
        &self,
        conn: &mut Self::Connection,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send {
        async move { conn.simple_query("SELECT 1").await.map(|_| ()) }
    }

    fn has_broken(&self, conn: &mut Self::Connection) -> bool {
        conn.is_closed()
    }
}

/// Build a pool for `config`, proving the DSN with one direct connection first
/// so an unreachable server fails here instead of at the first checkout.
///
/// # Errors
/// Returns `SqlRegistryError` if the DSN is invalid, the server cannot be
/// reached, or `ctx` finishes first.
pub(crate) async fn open_pool(
    ctx: &Context,
    config: &DatabaseConfiguration,
) -> Result<PgPool, SqlRegistryError> {
    let manager = PgManager::from_dsn(&config.dsn)?;
    let builder = Pool::builder()
        .max_size(config.pool.max_size)
        .connection_timeout(config.pool.connect_timeout());

    ctx.run(async move {
        let probe = manager.connect().await?;
        drop(probe);
        let pool = builder.build(manager).await?;
        Ok::<_, SqlRegistryError>(pool)
    })
    .await?
}
