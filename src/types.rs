use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::SqlRegistryError;

/// Positional query arguments and column values.
///
/// The same enum is handed to every backend and to every
/// [`ExecutorHook`](crate::executor_hook::ExecutorHook) callback:
/// ```rust
/// use sql_registry::prelude::*;
///
/// let args = vec![
///     RowValues::Int(1),
///     RowValues::Text("alice".into()),
///     RowValues::Bool(true),
/// ];
/// # let _ = args;
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum RowValues {
    /// Integer value (64-bit)
    Int(i64),
    /// Floating point value (64-bit)
    Float(f64),
    /// Text/string value
    Text(String),
    /// Boolean value
    Bool(bool),
    /// Timestamp value
    Timestamp(NaiveDateTime),
    /// NULL value
    Null,
    /// JSON value
    JSON(JsonValue),
    /// Binary data
    Blob(Vec<u8>),
}

impl RowValues {
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_int(&self) -> Option<&i64> {
        if let RowValues::Int(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        if let RowValues::Text(value) = self {
            Some(value)
        } else {
            None
        }
    }

    /// Booleans come back from `SQLite` as 0/1 integers, so both shapes are accepted.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            RowValues::Bool(value) => Some(*value),
            RowValues::Int(1) => Some(true),
            RowValues::Int(0) => Some(false),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        if let RowValues::Float(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            RowValues::Timestamp(value) => Some(*value),
            RowValues::Text(s) => NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f").ok(),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_blob(&self) -> Option<&[u8]> {
        if let RowValues::Blob(bytes) = self {
            Some(bytes)
        } else {
            None
        }
    }
}

/// The database engine a configuration targets.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseSystem {
    /// `SQLite` 3, file-backed or in-memory
    Sqlite3,
    /// `PostgreSQL`
    Postgres,
    /// `MySQL` / `MariaDB`; no driver ships with this crate
    Mysql,
}

impl DatabaseSystem {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            DatabaseSystem::Sqlite3 => "sqlite3",
            DatabaseSystem::Postgres => "postgres",
            DatabaseSystem::Mysql => "mysql",
        }
    }

    /// Whether a driver for this system is compiled into the current build.
    #[must_use]
    pub fn is_enabled(self) -> bool {
        match self {
            DatabaseSystem::Sqlite3 => cfg!(feature = "sqlite"),
            DatabaseSystem::Postgres => cfg!(feature = "postgres"),
            DatabaseSystem::Mysql => false,
        }
    }
}

impl fmt::Display for DatabaseSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DatabaseSystem {
    type Err = SqlRegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" | "sqlite3" => Ok(DatabaseSystem::Sqlite3),
            "postgres" | "postgresql" | "pg" => Ok(DatabaseSystem::Postgres),
            "mysql" | "mariadb" => Ok(DatabaseSystem::Mysql),
            other => Err(SqlRegistryError::ConfigError(format!(
                "unknown database system: {other}"
            ))),
        }
    }
}
