use async_trait::async_trait;

use crate::context::Context;
use crate::database::Database;
use crate::error::SqlRegistryError;

/// Creates the tables a database needs; run while provisioning when
/// `auto_create_tables` is set.
///
/// Model mapping and dialect translation live outside this crate; an
/// implementation typically renders `CREATE TABLE` statements for its models
/// and runs them through the handle it is given.
#[async_trait]
pub trait TableCreator: Send + Sync {
    /// # Errors
    /// Any error aborts provisioning and is reported as
    /// `SqlRegistryError::SchemaCreationFailed`.
    async fn create_tables(&self, ctx: &Context, db: &Database) -> Result<(), SqlRegistryError>;
}

/// A [`TableCreator`] that runs fixed DDL statements in order.
///
/// ```rust
/// use sql_registry::prelude::*;
///
/// let creator = DdlTableCreator::new([
///     "CREATE TABLE IF NOT EXISTS users (id INTEGER PRIMARY KEY, name TEXT NOT NULL)",
/// ]);
/// assert_eq!(creator.statements().len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct DdlTableCreator {
    statements: Vec<String>,
}

impl DdlTableCreator {
    #[must_use]
    pub fn new<I, S>(statements: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            statements: statements.into_iter().map(Into::into).collect(),
        }
    }

    #[must_use]
    pub fn statements(&self) -> &[String] {
        &self.statements
    }
}

#[async_trait]
impl TableCreator for DdlTableCreator {
    async fn create_tables(&self, ctx: &Context, db: &Database) -> Result<(), SqlRegistryError> {
        for statement in &self.statements {
            db.exec_batch(ctx, statement).await?;
        }
        Ok(())
    }
}
