//! Status command implementation

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use serde::Serialize;
use tm_core::{MigrationDescriptor, ScriptKind};
use tm_engine::MigrationCatalog;
use tokio_util::sync::CancellationToken;

use crate::cli::{GlobalArgs, StatusArgs};
use crate::commands::common::{
    engine_failure, finish, load_config, open_existing_database, run_command, script_source,
    CommandResult,
};

/// Machine-readable status report.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StatusReport {
    pub(crate) database_status: &'static str,
    pub(crate) executed_migrations: usize,
    pub(crate) pending_migrations: usize,
    pub(crate) total_migrations: usize,
    pub(crate) executed_migration_details: Vec<ExecutedDetail>,
    pub(crate) pending_migration_details: Vec<PendingDetail>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ExecutedDetail {
    pub(crate) file_name: String,
    pub(crate) version: u32,
    pub(crate) description: Option<String>,
    pub(crate) executed_at: Option<NaiveDateTime>,
    pub(crate) execution_time_ms: Option<u64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PendingDetail {
    pub(crate) file_name: String,
    pub(crate) version: u32,
    pub(crate) description: Option<String>,
}

impl StatusReport {
    pub(crate) fn new(executed: &[MigrationDescriptor], pending: &[MigrationDescriptor]) -> Self {
        Self {
            database_status: if pending.is_empty() {
                "Up to Date"
            } else {
                "Pending Migrations"
            },
            executed_migrations: executed.len(),
            pending_migrations: pending.len(),
            total_migrations: executed.len() + pending.len(),
            executed_migration_details: executed
                .iter()
                .map(|d| ExecutedDetail {
                    file_name: d.file_name.clone(),
                    version: d.version,
                    description: d.description.clone(),
                    executed_at: d.executed_at,
                    execution_time_ms: d
                        .execution_time
                        .map(|t| u64::try_from(t.as_millis()).unwrap_or(u64::MAX)),
                })
                .collect(),
            pending_migration_details: pending
                .iter()
                .map(|d| PendingDetail {
                    file_name: d.file_name.clone(),
                    version: d.version,
                    description: d.description.clone(),
                })
                .collect(),
        }
    }

    pub(crate) fn is_up_to_date(&self) -> bool {
        self.pending_migrations == 0
    }
}

/// Execute the status command
pub(crate) async fn execute(
    args: &StatusArgs,
    global: &GlobalArgs,
    cancel: &CancellationToken,
) -> Result<()> {
    finish(run_command("status", cancel, || run(args, global)).await)
}

pub(crate) async fn run(args: &StatusArgs, global: &GlobalArgs) -> Result<CommandResult> {
    let config = load_config(global)?;
    let db = open_existing_database(&config).await?;
    let catalog = MigrationCatalog::new(
        script_source(global),
        db,
        &config.migrations,
        ScriptKind::Migration,
    );

    log::info!("Retrieving database migration status...");
    let executed = catalog
        .get_executed_migrations()
        .await
        .map_err(|e| engine_failure("Failed to read executed migrations", e))?;
    let pending = catalog
        .get_pending_migrations()
        .await
        .map_err(|e| engine_failure("Failed to read pending migrations", e))?;

    let report = StatusReport::new(&executed, &pending);
    if args.json {
        let json =
            serde_json::to_string_pretty(&report).context("Failed to serialize status report")?;
        println!("{json}");
    } else {
        print_console(&report, &executed, &pending, global.verbose);
    }

    Ok(CommandResult::success("Status retrieved successfully")
        .with_data("executedCount", report.executed_migrations)
        .with_data("pendingCount", report.pending_migrations)
        .with_data("totalCount", report.total_migrations)
        .with_data("isUpToDate", report.is_up_to_date()))
}

fn print_console(
    report: &StatusReport,
    executed: &[MigrationDescriptor],
    pending: &[MigrationDescriptor],
    verbose: bool,
) {
    println!("📊 Database Migration Status");
    println!("═══════════════════════════");
    println!();
    let status = if report.is_up_to_date() {
        "✅ Up to Date"
    } else {
        "⏳ Pending Migrations"
    };
    println!("Status: {status}");
    println!("Executed migrations: {}", report.executed_migrations);
    println!("Pending migrations: {}", report.pending_migrations);
    println!("Total migrations: {}", report.total_migrations);
    println!();

    if !executed.is_empty() {
        println!("✅ Executed Migrations:");
        for d in executed {
            let when = d
                .executed_at
                .map(|at| format!(" (executed {})", at.format("%Y-%m-%d %H:%M:%S")))
                .unwrap_or_default();
            println!("  ✓ {}{when}", d.file_name);
            print_description(d, verbose);
        }
        println!();
    }

    if pending.is_empty() {
        println!("✅ Database is up to date - no pending migrations");
    } else {
        println!("⏳ Pending Migrations:");
        for d in pending {
            println!("  ⏳ {}", d.file_name);
            print_description(d, verbose);
        }
    }
    println!();
}

fn print_description(descriptor: &MigrationDescriptor, verbose: bool) {
    if let Some(description) = descriptor.description.as_deref().filter(|_| verbose) {
        println!("    {description}");
    }
}

#[cfg(test)]
#[path = "status_test.rs"]
mod tests;
