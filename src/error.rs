use thiserror::Error;

use crate::context::ContextError;

#[derive(Debug, Error)]
pub enum SqlRegistryError {
    #[error("database {0:?} is already registered")]
    DatabaseConflict(String),

    #[error("database {0:?} is not registered")]
    DbNotFound(String),

    #[error("database {0:?} is registered but has not been provisioned")]
    NotProvisioned(String),

    #[error("Connection open failed: {0}")]
    ConnectionOpenFailed(String),

    #[error("Schema creation failed: {0}")]
    SchemaCreationFailed(String),

    #[error("database {0:?} has been closed")]
    Closed(String),

    #[error(transparent)]
    Cancelled(#[from] ContextError),

    #[cfg(feature = "postgres")]
    #[error(transparent)]
    PostgresError(#[from] tokio_postgres::Error),

    #[cfg(feature = "sqlite")]
    #[error(transparent)]
    SqliteError(#[from] rusqlite::Error),

    #[cfg(feature = "postgres")]
    #[error(transparent)]
    PoolErrorPostgres(#[from] bb8::RunError<tokio_postgres::Error>),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Parameter conversion error: {0}")]
    ParameterError(String),

    #[error("SQL execution error: {0}")]
    ExecutionError(String),

    #[error("Unimplemented feature: {0}")]
    Unimplemented(String),
}

impl From<bb8::RunError<SqlRegistryError>> for SqlRegistryError {
    fn from(err: bb8::RunError<SqlRegistryError>) -> Self {
        match err {
            bb8::RunError::User(inner) => inner,
            bb8::RunError::TimedOut => {
                SqlRegistryError::ConnectionError("pool checkout timed out".to_string())
            }
        }
    }
}

impl SqlRegistryError {
    /// Rewrap an error raised while opening a connection as
    /// [`SqlRegistryError::ConnectionOpenFailed`].
    ///
    /// Errors that already carry an open-time meaning (`Unimplemented`,
    /// `ConfigError`, an existing `ConnectionOpenFailed`) pass through unchanged.
    pub(crate) fn into_open_failure(self) -> Self {
        match self {
            err @ (SqlRegistryError::ConnectionOpenFailed(_)
            | SqlRegistryError::Unimplemented(_)
            | SqlRegistryError::ConfigError(_)) => err,
            other => SqlRegistryError::ConnectionOpenFailed(other.to_string()),
        }
    }

    /// Rewrap an error raised by a [`TableCreator`](crate::schema::TableCreator) as
    /// [`SqlRegistryError::SchemaCreationFailed`].
    pub(crate) fn into_schema_failure(self) -> Self {
        match self {
            err @ SqlRegistryError::SchemaCreationFailed(_) => err,
            other => SqlRegistryError::SchemaCreationFailed(other.to_string()),
        }
    }
}
