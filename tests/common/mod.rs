#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Once;

use sql_registry::prelude::*;

static TRACING: Once = Once::new();

pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init();
    });
}

/// A file-backed sqlite path inside `dir`.
pub fn sqlite_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{name}.sqlite"))
}

pub fn sqlite_config(name: &str, path: &Path) -> DatabaseConfiguration {
    DatabaseConfiguration::new(name, path.to_string_lossy(), DatabaseSystem::Sqlite3)
}

/// Remove a sqlite file together with its WAL side files.
pub fn remove_sqlite_files(path: &Path) {
    let _ = std::fs::remove_file(path);
    let base = path.to_string_lossy();
    let _ = std::fs::remove_file(format!("{base}-wal"));
    let _ = std::fs::remove_file(format!("{base}-shm"));
}
