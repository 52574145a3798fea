//! Journal tables recording applied scripts.
//!
//! One table per script family. A row exists only after the transaction that
//! applied the script committed.

use crate::error::{EngineError, EngineResult};
use chrono::NaiveDateTime;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use tm_core::sql_utils::{nullable_literal, qualified_relation, string_literal};
use tm_core::{MigrationDescriptor, MigrationSettings, ScriptKind};
use tm_db::{Database, DbError, DbResult};

const TIMESTAMP_WRITE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";
const TIMESTAMP_READ_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// One journal row.
#[derive(Debug, Clone, PartialEq)]
pub struct JournalEntry {
    pub script_name: String,
    pub version: Option<u32>,
    pub checksum: Option<String>,
    pub applied_by: Option<String>,
    pub execution_time: Option<Duration>,
    pub applied_at: Option<NaiveDateTime>,
}

impl JournalEntry {
    /// Build from the text columns selected by [`Journal::applied`].
    fn from_row(row: Vec<Option<String>>) -> Option<Self> {
        let mut cols = row.into_iter();
        let script_name = cols.next().flatten()?;
        let version = cols.next().flatten().and_then(|v| v.parse().ok());
        let checksum = cols.next().flatten();
        let applied_by = cols.next().flatten();
        let execution_time = cols
            .next()
            .flatten()
            .and_then(|ms| ms.parse::<u64>().ok())
            .map(Duration::from_millis);
        let applied_at = cols
            .next()
            .flatten()
            .and_then(|ts| NaiveDateTime::parse_from_str(&ts, TIMESTAMP_READ_FORMAT).ok());
        Some(Self {
            script_name,
            version,
            checksum,
            applied_by,
            execution_time,
            applied_at,
        })
    }
}

/// A journal table location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Journal {
    schema: String,
    table: String,
}

impl Journal {
    pub fn new(schema: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
        }
    }

    /// Journal configured for a script family.
    pub fn for_kind(settings: &MigrationSettings, kind: ScriptKind) -> Self {
        Self::new(
            settings.journal_schema.as_str(),
            settings.journal_table_for(kind),
        )
    }

    /// Quoted `"schema"."table"`.
    pub fn relation(&self) -> String {
        qualified_relation(&self.schema, &self.table)
    }

    /// Create the schema and table when missing.
    pub async fn ensure(&self, db: &dyn Database) -> EngineResult<()> {
        db.create_schema_if_not_exists(&self.schema)
            .await
            .map_err(|e| self.setup_error(e))?;
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} (
                script_name  VARCHAR PRIMARY KEY,
                version      INTEGER NOT NULL,
                checksum     VARCHAR NOT NULL,
                applied_by   VARCHAR,
                execution_ms BIGINT,
                applied_at   TIMESTAMP NOT NULL DEFAULT now()
            )",
            self.relation()
        );
        db.execute_batch(&sql)
            .await
            .map_err(|e| self.setup_error(e))?;
        log::debug!("Journal {self} is ready");
        Ok(())
    }

    /// Applied scripts keyed by lower-cased script name.
    ///
    /// A missing table means nothing has been applied yet.
    pub async fn applied(&self, db: &dyn Database) -> EngineResult<HashMap<String, JournalEntry>> {
        let exists = db
            .relation_exists(&self.to_string())
            .await
            .map_err(|e| self.read_error(e))?;
        if !exists {
            log::debug!("Journal {self} does not exist yet");
            return Ok(HashMap::new());
        }

        let sql = format!(
            "SELECT script_name, CAST(version AS VARCHAR), checksum, applied_by, \
             CAST(execution_ms AS VARCHAR), CAST(applied_at AS VARCHAR) FROM {}",
            self.relation()
        );
        let rows = db.query_rows(&sql).await.map_err(|e| self.read_error(e))?;

        let mut entries = HashMap::with_capacity(rows.len());
        for row in rows {
            match JournalEntry::from_row(row) {
                Some(entry) => {
                    entries.insert(entry.script_name.to_lowercase(), entry);
                }
                None => log::warn!("Ignoring journal row without a script name in {self}"),
            }
        }
        Ok(entries)
    }

    /// Insert a row for `descriptor`. Runs inside the caller's transaction.
    pub async fn record(
        &self,
        db: &dyn Database,
        descriptor: &MigrationDescriptor,
        applied_by: &str,
        execution_time: Duration,
        applied_at: NaiveDateTime,
    ) -> DbResult<()> {
        let sql = format!(
            "INSERT INTO {} (script_name, version, checksum, applied_by, execution_ms, applied_at) \
             VALUES ({}, {}, {}, {}, {}, CAST({} AS TIMESTAMP))",
            self.relation(),
            string_literal(&descriptor.name),
            descriptor.version,
            string_literal(&descriptor.checksum),
            nullable_literal(Some(applied_by).filter(|s| !s.is_empty())),
            execution_time.as_millis(),
            string_literal(&applied_at.format(TIMESTAMP_WRITE_FORMAT).to_string()),
        );
        db.execute(&sql).await?;
        Ok(())
    }

    /// Delete the row for `name`, matched case-insensitively.
    pub async fn remove(&self, db: &dyn Database, name: &str) -> DbResult<usize> {
        let sql = format!(
            "DELETE FROM {} WHERE lower(script_name) = lower({})",
            self.relation(),
            string_literal(name)
        );
        db.execute(&sql).await
    }

    fn read_error(&self, source: DbError) -> EngineError {
        EngineError::JournalRead {
            journal: self.to_string(),
            source,
        }
    }

    fn setup_error(&self, source: DbError) -> EngineError {
        EngineError::JournalSetup {
            journal: self.to_string(),
            source,
        }
    }
}

impl fmt::Display for Journal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.table)
    }
}

#[cfg(test)]
#[path = "journal_test.rs"]
mod tests;
