//! DuckDB database backend implementation

use crate::error::{DbError, DbResult};
use crate::traits::Database;
use async_trait::async_trait;
use duckdb::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tm_core::IsolationLevel;

type Rows = Vec<Vec<Option<String>>>;

/// DuckDB database backend
///
/// Statements run on the blocking pool so a caller's timer can fire while a
/// long statement is still executing. [`Database::interrupt`] aborts it.
pub struct DuckDbBackend {
    conn: Arc<Mutex<Connection>>,
    interrupt: Arc<duckdb::InterruptHandle>,
}

impl DuckDbBackend {
    fn wrap(conn: Connection) -> Self {
        let interrupt = conn.interrupt_handle();
        Self {
            conn: Arc::new(Mutex::new(conn)),
            interrupt,
        }
    }

    /// Create a new in-memory DuckDB connection
    pub fn in_memory() -> DbResult<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| DbError::ConnectionError(e.to_string()))?;
        Ok(Self::wrap(conn))
    }

    /// Create a new DuckDB connection from a file path
    pub fn from_path(path: &Path) -> DbResult<Self> {
        let conn = Connection::open(path)
            .map_err(|e| DbError::ConnectionError(format!("{e}: {}", path.display())))?;
        Ok(Self::wrap(conn))
    }

    /// Create from a connection string (handles :memory: special case)
    pub fn new(connection_string: &str) -> DbResult<Self> {
        if connection_string == ":memory:" {
            Self::in_memory()
        } else {
            Self::from_path(Path::new(connection_string))
        }
    }

    /// Like [`DuckDbBackend::new`], but a file that does not exist yet is a
    /// connection error instead of being created.
    pub fn open_existing(connection_string: &str) -> DbResult<Self> {
        let path = Path::new(connection_string);
        if connection_string != ":memory:" && !path.is_file() {
            return Err(DbError::ConnectionError(format!(
                "database file does not exist: {}",
                path.display()
            )));
        }
        Self::new(connection_string)
    }

    /// Run `f` against the connection on the blocking pool
    async fn run<T, F>(&self, f: F) -> DbResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> DbResult<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|e| DbError::MutexPoisoned(e.to_string()))?;
            f(&guard)
        })
        .await
        .map_err(|e| DbError::ExecutionError(format!("database task failed: {e}")))?
    }
}

fn ping_sync(conn: &Connection) -> DbResult<()> {
    conn.query_row("SELECT 1", [], |row| row.get::<_, i32>(0))
        .map_err(|e| DbError::ConnectionError(e.to_string()))?;
    Ok(())
}

fn execute_sync(conn: &Connection, sql: &str) -> DbResult<usize> {
    conn.execute(sql, [])
        .map_err(|e| DbError::ExecutionError(format!("{}: {}", e, sql)))
}

fn execute_batch_sync(conn: &Connection, sql: &str) -> DbResult<()> {
    conn.execute_batch(sql)
        .map_err(|e| DbError::ExecutionError(e.to_string()))
}

/// Collect text rows.
///
/// Column count is read from the row because DuckDB panics on
/// `Statement::column_count()` before execution.
fn query_rows_sync(conn: &Connection, sql: &str) -> DbResult<Rows> {
    let mut stmt = conn
        .prepare(sql)
        .map_err(|e| DbError::ExecutionError(format!("prepare failed: {e}")))?;
    let rows = stmt
        .query_map([], |row| {
            let col_count = row.as_ref().column_count();
            (0..col_count)
                .map(|i| row.get::<_, Option<String>>(i))
                .collect::<Result<Vec<_>, _>>()
        })
        .map_err(|e| DbError::ExecutionError(format!("query failed: {e}")))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| DbError::ExecutionError(format!("row error: {e}")))?;
    Ok(rows)
}

fn relation_exists_sync(conn: &Connection, name: &str) -> DbResult<bool> {
    // Handle schema-qualified names
    let (schema, table) = if let Some(pos) = name.rfind('.') {
        (&name[..pos], &name[pos + 1..])
    } else {
        ("main", name)
    };

    let count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM information_schema.tables WHERE table_schema = ? AND table_name = ?",
            duckdb::params![schema, table],
            |row| row.get(0),
        )
        .map_err(|e| DbError::ExecutionError(e.to_string()))?;

    Ok(count > 0)
}

#[async_trait]
impl Database for DuckDbBackend {
    async fn ping(&self) -> DbResult<()> {
        self.run(ping_sync).await
    }

    async fn execute(&self, sql: &str) -> DbResult<usize> {
        let sql = sql.to_string();
        self.run(move |conn| execute_sync(conn, &sql)).await
    }

    async fn execute_batch(&self, sql: &str) -> DbResult<()> {
        let sql = sql.to_string();
        self.run(move |conn| execute_batch_sync(conn, &sql)).await
    }

    async fn query_rows(&self, sql: &str) -> DbResult<Rows> {
        let sql = sql.to_string();
        self.run(move |conn| query_rows_sync(conn, &sql)).await
    }

    async fn relation_exists(&self, name: &str) -> DbResult<bool> {
        let name = name.to_string();
        self.run(move |conn| relation_exists_sync(conn, &name)).await
    }

    async fn create_schema_if_not_exists(&self, schema: &str) -> DbResult<()> {
        let sql = format!(
            "CREATE SCHEMA IF NOT EXISTS \"{}\"",
            schema.replace('"', "\"\"")
        );
        self.run(move |conn| execute_batch_sync(conn, &sql)).await
    }

    async fn begin(&self, isolation: IsolationLevel) -> DbResult<()> {
        // DuckDB runs every transaction under snapshot isolation.
        log::debug!("BEGIN TRANSACTION (requested {isolation}, duckdb uses snapshot)");
        self.run(|conn| execute_batch_sync(conn, "BEGIN TRANSACTION"))
            .await
            .map_err(|e| DbError::TransactionError(format!("BEGIN failed: {e}")))
    }

    async fn commit(&self) -> DbResult<()> {
        self.run(|conn| execute_batch_sync(conn, "COMMIT"))
            .await
            .map_err(|e| DbError::TransactionError(format!("COMMIT failed: {e}")))
    }

    async fn rollback(&self) -> DbResult<()> {
        self.run(|conn| execute_batch_sync(conn, "ROLLBACK"))
            .await
            .map_err(|e| DbError::TransactionError(format!("ROLLBACK failed: {e}")))
    }

    fn interrupt(&self) {
        log::debug!("Interrupting running duckdb statement");
        self.interrupt.interrupt();
    }

    fn db_type(&self) -> &'static str {
        "duckdb"
    }
}

#[cfg(test)]
#[path = "duckdb_test.rs"]
mod tests;
