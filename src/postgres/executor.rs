use crate::error::SqlRegistryError;
use crate::results::ResultSet;
use crate::types::RowValues;

use super::config::PgPool;
use super::params::Params;
use super::query::build_result_set_from_rows;

/// Run a SELECT and collect its rows.
///
/// # Errors
/// Returns `SqlRegistryError` if checkout or execution fails.
pub async fn execute_select(
    pool: &PgPool,
    query: &str,
    params: &[RowValues],
) -> Result<ResultSet, SqlRegistryError> {
    let client = pool.get().await?;
    let converted = Params::convert(params);
    let rows = client.query(query, converted.as_refs()).await?;
    build_result_set_from_rows(&rows)
}

/// Run one statement and return rows affected.
///
/// # Errors
/// Returns `SqlRegistryError` if checkout or execution fails.
pub async fn execute_dml(
    pool: &PgPool,
    query: &str,
    params: &[RowValues],
) -> Result<usize, SqlRegistryError> {
    let client = pool.get().await?;
    let converted = Params::convert(params);
    let rows = client.execute(query, converted.as_refs()).await?;
    usize::try_from(rows).map_err(|e| {
        SqlRegistryError::ExecutionError(format!("rows affected does not fit in usize: {e}"))
    })
}

/// Run a multi-statement script inside one transaction.
///
/// # Errors
/// Returns `SqlRegistryError` if checkout or any statement fails; the script is rolled back.
pub async fn execute_batch(pool: &PgPool, query: &str) -> Result<(), SqlRegistryError> {
    let mut client = pool.get().await?;
    let tx = client.transaction().await?;
    tx.batch_execute(query).await?;
    tx.commit().await?;
    Ok(())
}
