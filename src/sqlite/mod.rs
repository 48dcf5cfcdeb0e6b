// SQLite backend
//
// - config: bb8 connection manager and pool provisioning
// - connection: blocking-thread execution against a pooled connection
// - params: conversion from `RowValues` to rusqlite values
// - query: row extraction into `ResultSet`
// - executor: select / dml / batch entry points used by the pool dispatcher

pub mod config;
pub mod connection;
pub mod executor;
pub mod params;
pub mod query;

pub use config::{SharedSqliteConnection, SqliteManager, SqlitePool};
pub use executor::{execute_batch, execute_dml, execute_select};
pub use query::build_result_set;
