//! Recording database stub for tests.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;
use tm_core::IsolationLevel;
use tm_db::{Database, DbError, DbResult};
use tokio_util::sync::CancellationToken;

/// One call made against a [`RecordingDatabase`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Ping,
    Execute(String),
    ExecuteBatch(String),
    QueryRows(String),
    RelationExists(String),
    CreateSchema(String),
    Begin(IsolationLevel),
    Commit,
    Rollback,
    Interrupt,
}

impl Call {
    /// Whether the call could change database state.
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            Call::Execute(_)
                | Call::ExecuteBatch(_)
                | Call::CreateSchema(_)
                | Call::Begin(_)
                | Call::Commit
        )
    }
}

/// `Database` stub that records every call.
///
/// Statements containing a configured fragment fail with an execution error,
/// and the whole database can be made unreachable. Statements can also be
/// slowed down, and a token cancelled once a given call is seen.
#[derive(Default)]
pub struct RecordingDatabase {
    calls: Mutex<Vec<Call>>,
    fail_fragments: Vec<String>,
    slow: Option<(String, Duration)>,
    cancel_on: Option<(Call, CancellationToken)>,
    relations: HashSet<String>,
    rows: Vec<Vec<Option<String>>>,
    unreachable: bool,
}

impl RecordingDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail any statement containing `fragment`.
    pub fn failing_on(mut self, fragment: impl Into<String>) -> Self {
        self.fail_fragments.push(fragment.into());
        self
    }

    /// Sleep for `delay` before finishing any statement containing `fragment`.
    pub fn slow_on(mut self, fragment: impl Into<String>, delay: Duration) -> Self {
        self.slow = Some((fragment.into(), delay));
        self
    }

    /// Cancel `token` when `call` is recorded.
    pub fn cancelling_on(mut self, call: Call, token: CancellationToken) -> Self {
        self.cancel_on = Some((call, token));
        self
    }

    /// Report `name` as an existing relation.
    pub fn with_relation(mut self, name: impl Into<String>) -> Self {
        self.relations.insert(name.into());
        self
    }

    /// Rows returned from every `query_rows` call.
    pub fn with_rows(mut self, rows: Vec<Vec<Option<String>>>) -> Self {
        self.rows = rows;
        self
    }

    /// Fail every call with a connection error.
    pub fn unreachable() -> Self {
        Self {
            unreachable: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn write_count(&self) -> usize {
        self.calls().iter().filter(|c| c.is_write()).count()
    }

    pub fn begin_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Begin(_)))
            .count()
    }

    /// Statements passed to `execute` or `execute_batch`, in order.
    pub fn statements(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Execute(sql) | Call::ExecuteBatch(sql) => Some(sql),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) -> DbResult<()> {
        if let Some((trigger, token)) = &self.cancel_on {
            if *trigger == call {
                token.cancel();
            }
        }
        self.calls
            .lock()
            .map_err(|e| DbError::MutexPoisoned(e.to_string()))?
            .push(call);
        if self.unreachable {
            return Err(DbError::ConnectionError("stub is unreachable".to_string()));
        }
        Ok(())
    }

    async fn check_statement(&self, sql: &str) -> DbResult<()> {
        if let Some((fragment, delay)) = &self.slow {
            if sql.contains(fragment.as_str()) {
                tokio::time::sleep(*delay).await;
            }
        }
        match self.fail_fragments.iter().find(|f| sql.contains(f.as_str())) {
            Some(fragment) => Err(DbError::ExecutionError(format!(
                "stub failure on '{fragment}'"
            ))),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Database for RecordingDatabase {
    async fn ping(&self) -> DbResult<()> {
        self.record(Call::Ping)
    }

    async fn execute(&self, sql: &str) -> DbResult<usize> {
        self.record(Call::Execute(sql.to_string()))?;
        self.check_statement(sql).await?;
        Ok(1)
    }

    async fn execute_batch(&self, sql: &str) -> DbResult<()> {
        self.record(Call::ExecuteBatch(sql.to_string()))?;
        self.check_statement(sql).await
    }

    async fn query_rows(&self, sql: &str) -> DbResult<Vec<Vec<Option<String>>>> {
        self.record(Call::QueryRows(sql.to_string()))?;
        self.check_statement(sql).await?;
        Ok(self.rows.clone())
    }

    async fn relation_exists(&self, name: &str) -> DbResult<bool> {
        self.record(Call::RelationExists(name.to_string()))?;
        Ok(self.relations.contains(name))
    }

    async fn create_schema_if_not_exists(&self, schema: &str) -> DbResult<()> {
        self.record(Call::CreateSchema(schema.to_string()))
    }

    async fn begin(&self, isolation: IsolationLevel) -> DbResult<()> {
        self.record(Call::Begin(isolation))
    }

    async fn commit(&self) -> DbResult<()> {
        self.record(Call::Commit)
    }

    async fn rollback(&self) -> DbResult<()> {
        self.record(Call::Rollback)
    }

    fn interrupt(&self) {
        let _ = self.record(Call::Interrupt);
    }

    fn db_type(&self) -> &'static str {
        "recording"
    }
}
