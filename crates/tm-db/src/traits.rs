//! Database trait definition

use crate::error::DbResult;
use async_trait::async_trait;
use tm_core::IsolationLevel;

/// Connection abstraction for Tidemark.
///
/// One implementation instance owns one connection. Transactions are scoped
/// to that connection: `begin`, then any number of statements, then exactly
/// one of `commit` or `rollback`. Implementations must be Send + Sync for
/// async operation.
#[async_trait]
pub trait Database: Send + Sync {
    /// Check that the connection is usable
    async fn ping(&self) -> DbResult<()>;

    /// Execute a single statement, returns affected rows
    async fn execute(&self, sql: &str) -> DbResult<usize>;

    /// Execute a script of one or more statements
    async fn execute_batch(&self, sql: &str) -> DbResult<()>;

    /// Run a query whose projected columns are all text.
    ///
    /// Callers cast non-text columns (`CAST(x AS VARCHAR)`).
    async fn query_rows(&self, sql: &str) -> DbResult<Vec<Vec<Option<String>>>>;

    /// Check if a table or view exists (`schema.name` or `name`)
    async fn relation_exists(&self, name: &str) -> DbResult<bool>;

    /// Create a schema if it does not exist
    async fn create_schema_if_not_exists(&self, schema: &str) -> DbResult<()>;

    /// Open a transaction
    async fn begin(&self, isolation: IsolationLevel) -> DbResult<()>;

    /// Commit the open transaction
    async fn commit(&self) -> DbResult<()>;

    /// Roll back the open transaction
    async fn rollback(&self) -> DbResult<()>;

    /// Abort the statement currently running on this connection, if any.
    ///
    /// Called when a deadline passes. Backends without a cancel primitive
    /// keep the default no-op.
    fn interrupt(&self) {}

    /// Database type identifier for logging
    fn db_type(&self) -> &'static str;
}
