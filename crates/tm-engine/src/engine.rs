//! Migration engine: validates and applies one script at a time.

use crate::context::{ExecutionContext, Variables};
use crate::error::EngineResult;
use crate::journal::Journal;
use crate::template::render_script;
use chrono::Utc;
use sqlparser::dialect::DuckDbDialect;
use sqlparser::parser::Parser;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tm_core::{
    Config, ExecutionMode, IsolationLevel, MigrationDescriptor, ScriptKind, ValidationResult,
};
use tm_db::{with_transaction, Database, DbError, DbResult};

/// Statement fragments reported as destructive.
const DESTRUCTIVE_PATTERNS: &[&str] = &["DROP DATABASE", "TRUNCATE TABLE"];

/// Outcome of one execution attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationResult {
    Success,
    Failed { error: String },
    Cancelled,
}

impl OperationResult {
    pub fn is_success(&self) -> bool {
        matches!(self, OperationResult::Success)
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            OperationResult::Failed { error } => Some(error),
            _ => None,
        }
    }
}

/// An [`OperationResult`] with the descriptor as it stands afterwards.
#[derive(Debug, Clone)]
pub struct ExecutionReport {
    pub result: OperationResult,
    pub descriptor: MigrationDescriptor,
}

impl ExecutionReport {
    fn success(descriptor: MigrationDescriptor) -> Self {
        Self {
            result: OperationResult::Success,
            descriptor,
        }
    }

    fn failed(descriptor: MigrationDescriptor, error: String) -> Self {
        Self {
            descriptor: descriptor.into_failed(error.clone()),
            result: OperationResult::Failed { error },
        }
    }

    fn cancelled(descriptor: MigrationDescriptor) -> Self {
        Self {
            result: OperationResult::Cancelled,
            descriptor,
        }
    }
}

/// Applies migration and seed scripts against the context's database.
pub struct MigrationEngine {
    ctx: Arc<ExecutionContext>,
    migration_journal: Journal,
    seed_journal: Journal,
    isolation: IsolationLevel,
    timeout: Option<Duration>,
    transaction_per_script: bool,
    create_journal_table: bool,
}

impl MigrationEngine {
    pub fn new(ctx: Arc<ExecutionContext>, config: &Config) -> Self {
        let settings = &config.migrations;
        if !settings.transaction_per_script {
            log::warn!(
                "transaction_per_script is disabled: a failing script may leave partial changes"
            );
        }
        Self {
            ctx,
            migration_journal: Journal::for_kind(settings, ScriptKind::Migration),
            seed_journal: Journal::for_kind(settings, ScriptKind::Seed),
            isolation: config.database.isolation_level,
            timeout: Some(Duration::from_secs(settings.command_timeout_secs))
                .filter(|limit| !limit.is_zero()),
            transaction_per_script: settings.transaction_per_script,
            create_journal_table: settings.create_journal_table,
        }
    }

    pub fn context(&self) -> &ExecutionContext {
        &self.ctx
    }

    fn journal(&self, kind: ScriptKind) -> &Journal {
        match kind {
            ScriptKind::Migration => &self.migration_journal,
            ScriptKind::Seed => &self.seed_journal,
        }
    }

    /// Create the journal for `kind` unless journal creation is turned off.
    pub async fn ensure_journal(&self, kind: ScriptKind) -> EngineResult<()> {
        if !self.create_journal_table {
            return Ok(());
        }
        self.journal(kind).ensure(self.ctx.db.as_ref()).await
    }

    fn render(&self, descriptor: &MigrationDescriptor) -> EngineResult<String> {
        render_descriptor(descriptor, self.ctx.variables.as_ref())
    }

    /// Static checks on a script with this engine's template variables.
    pub fn validate_migration(&self, descriptor: &MigrationDescriptor) -> ValidationResult {
        validate_script(descriptor, self.ctx.variables.as_ref())
    }

    /// Apply a migration and record it in the migration journal.
    pub async fn execute_migration(
        &self,
        descriptor: &MigrationDescriptor,
        mode: ExecutionMode,
    ) -> ExecutionReport {
        self.execute_script(descriptor, &self.migration_journal, mode)
            .await
    }

    /// Apply a seed and record it in the seed journal.
    pub async fn execute_seed(
        &self,
        descriptor: &MigrationDescriptor,
        mode: ExecutionMode,
    ) -> ExecutionReport {
        self.execute_script(descriptor, &self.seed_journal, mode)
            .await
    }

    /// Dispatch on the descriptor's kind.
    pub async fn execute(
        &self,
        descriptor: &MigrationDescriptor,
        mode: ExecutionMode,
    ) -> ExecutionReport {
        match descriptor.kind {
            ScriptKind::Migration => self.execute_migration(descriptor, mode).await,
            ScriptKind::Seed => self.execute_seed(descriptor, mode).await,
        }
    }

    async fn execute_script(
        &self,
        descriptor: &MigrationDescriptor,
        journal: &Journal,
        mode: ExecutionMode,
    ) -> ExecutionReport {
        if mode.is_dry_run() {
            log::info!("[dry run] Would apply {} {}", descriptor.kind, descriptor.name);
            return ExecutionReport::success(descriptor.clone());
        }

        if self.ctx.is_cancelled() {
            log::warn!("Cancelled before applying {}", descriptor.name);
            return ExecutionReport::cancelled(descriptor.clone());
        }

        let sql = match self.render(descriptor) {
            Ok(sql) => sql,
            Err(e) => return ExecutionReport::failed(descriptor.clone(), e.to_string()),
        };

        log::info!("Applying {} {}", descriptor.kind, descriptor.name);
        let db = self.ctx.db.as_ref();
        let applied_by = self.ctx.executed_by.as_str();
        let started = Instant::now();

        let result = if self.transaction_per_script {
            with_transaction(db, self.isolation, self.timeout, |tx| {
                apply_script(tx, &sql, journal, descriptor, applied_by, started)
            })
            .await
        } else {
            let unit = apply_script(db, &sql, journal, descriptor, applied_by, started);
            match self.timeout {
                Some(limit) => match tokio::time::timeout(limit, unit).await {
                    Ok(result) => result,
                    Err(_) => {
                        db.interrupt();
                        Err(DbError::Timeout(limit))
                    }
                },
                None => unit.await,
            }
        };
        let elapsed = started.elapsed();

        match result {
            Ok(()) => {
                log::info!("Applied {} in {}ms", descriptor.name, elapsed.as_millis());
                ExecutionReport::success(descriptor.clone().into_executed(
                    Some(Utc::now().naive_utc()),
                    Some(applied_by.to_string()),
                    Some(elapsed),
                ))
            }
            Err(e) => {
                log::error!("Failed to apply {}: {e}", descriptor.name);
                ExecutionReport::failed(descriptor.clone(), e.to_string())
            }
        }
    }
}

/// Script text as it will be sent to the database.
fn render_descriptor(
    descriptor: &MigrationDescriptor,
    variables: Option<&Variables>,
) -> EngineResult<String> {
    match variables {
        Some(variables) => render_script(&descriptor.name, &descriptor.content, variables),
        None => Ok(descriptor.content.clone()),
    }
}

/// Static checks on a script. Never touches the database.
///
/// Empty content and template failures are errors. Destructive statements
/// and SQL the parser does not understand are warnings.
pub fn validate_script(
    descriptor: &MigrationDescriptor,
    variables: Option<&Variables>,
) -> ValidationResult {
    if descriptor.is_empty() {
        return ValidationResult::invalid("Script has empty content");
    }

    let sql = match render_descriptor(descriptor, variables) {
        Ok(sql) => sql,
        Err(e) => return ValidationResult::invalid(e.to_string()),
    };

    let mut result = ValidationResult::valid();
    let upper = sql.to_uppercase();
    for pattern in DESTRUCTIVE_PATTERNS {
        if upper.contains(pattern) {
            result.add_warning(format!("Contains {pattern} statement"));
        }
    }

    if let Err(e) = Parser::parse_sql(&DuckDbDialect {}, &sql) {
        result.add_warning(format!("Could not parse SQL: {e}"));
    }

    log::debug!(
        "Validated {}: {} errors, {} warnings",
        descriptor.name,
        result.errors().len(),
        result.warnings().len()
    );
    result
}

/// Run the script body, then write its journal row.
async fn apply_script(
    db: &dyn Database,
    sql: &str,
    journal: &Journal,
    descriptor: &MigrationDescriptor,
    applied_by: &str,
    started: Instant,
) -> DbResult<()> {
    db.execute_batch(sql).await?;
    journal
        .record(
            db,
            descriptor,
            applied_by,
            started.elapsed(),
            Utc::now().naive_utc(),
        )
        .await
}

#[cfg(test)]
#[path = "engine_test.rs"]
mod tests;
