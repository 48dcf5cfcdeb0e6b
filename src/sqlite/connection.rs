use std::sync::Arc;

use crate::error::SqlRegistryError;

use super::config::SharedSqliteConnection;

/// Run `func` against the connection on tokio's blocking pool.
///
/// # Errors
/// Propagates the closure's error, or `ExecutionError` if the blocking task panicked.
pub(crate) async fn run_blocking<F, R>(
    conn: SharedSqliteConnection,
    func: F,
) -> Result<R, SqlRegistryError>
where
    F: FnOnce(&mut rusqlite::Connection) -> Result<R, SqlRegistryError> + Send + 'static,
    R: Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let mut guard = conn.blocking_lock();
        func(&mut guard)
    })
    .await
    .map_err(|e| SqlRegistryError::ExecutionError(format!("sqlite spawn_blocking join error: {e}")))?
}

/// Switch a freshly provisioned database to WAL journaling.
///
/// In-memory databases report `memory` and keep their journal mode.
///
/// # Errors
/// Returns `SqlRegistryError` if the PRAGMA statement cannot be executed.
pub(crate) async fn apply_wal_pragmas(
    conn: &mut SharedSqliteConnection,
) -> Result<(), SqlRegistryError> {
    let handle = Arc::clone(conn);
    run_blocking(handle, |guard| {
        guard
            .query_row("PRAGMA journal_mode = WAL;", [], |_| Ok(()))
            .map_err(SqlRegistryError::SqliteError)
    })
    .await
}
