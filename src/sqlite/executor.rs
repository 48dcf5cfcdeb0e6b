use std::sync::Arc;

use crate::error::SqlRegistryError;
use crate::results::ResultSet;
use crate::types::RowValues;

use super::config::SqlitePool;
use super::connection::run_blocking;
use super::params::Params;
use super::query::build_result_set;

async fn checkout(
    pool: &SqlitePool,
) -> Result<bb8::PooledConnection<'_, super::SqliteManager>, SqlRegistryError> {
    pool.get().await.map_err(SqlRegistryError::from)
}

/// Run a SELECT and collect its rows.
///
/// # Errors
/// Returns `SqlRegistryError` if checkout, preparation or execution fails.
pub async fn execute_select(
    pool: &SqlitePool,
    query: &str,
    params: &[RowValues],
) -> Result<ResultSet, SqlRegistryError> {
    let conn = checkout(pool).await?;
    let sql_owned = query.to_owned();
    let params_owned = Params::convert(params);
    run_blocking(Arc::clone(&*conn), move |guard| {
        let mut stmt = guard.prepare_cached(&sql_owned)?;
        build_result_set(&mut stmt, &params_owned)
    })
    .await
}

/// Run one INSERT/UPDATE/DELETE (or any other single statement) and return rows affected.
///
/// # Errors
/// Returns `SqlRegistryError` if checkout, preparation or execution fails.
pub async fn execute_dml(
    pool: &SqlitePool,
    query: &str,
    params: &[RowValues],
) -> Result<usize, SqlRegistryError> {
    let conn = checkout(pool).await?;
    let sql_owned = query.to_owned();
    let params_owned = Params::convert(params);
    run_blocking(Arc::clone(&*conn), move |guard| {
        let mut stmt = guard.prepare_cached(&sql_owned)?;
        let refs = params_owned.as_refs();
        Ok(stmt.execute(&refs[..])?)
    })
    .await
}

/// Run a multi-statement script inside one transaction (or the caller's, if one is open).
///
/// # Errors
/// Returns `SqlRegistryError` if checkout or any statement fails; the script is rolled back.
pub async fn execute_batch(pool: &SqlitePool, query: &str) -> Result<(), SqlRegistryError> {
    let conn = checkout(pool).await?;
    let sql_owned = query.to_owned();
    run_blocking(Arc::clone(&*conn), move |guard| {
        if guard.is_autocommit() {
            let tx = guard.transaction()?;
            tx.execute_batch(&sql_owned)?;
            tx.commit()?;
        } else {
            guard.execute_batch(&sql_owned)?;
        }
        Ok(())
    })
    .await
}
