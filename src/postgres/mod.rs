// Postgres backend
//
// - config: bb8 connection manager and pool provisioning
// - params: `ToSql` for `RowValues`
// - query: row extraction into `ResultSet`
// - executor: select / dml / batch entry points used by the pool dispatcher

pub mod config;
pub mod executor;
pub mod params;
pub mod query;

pub use config::{PgManager, PgPool};
pub use executor::{execute_batch, execute_dml, execute_select};
pub use query::build_result_set_from_rows;
