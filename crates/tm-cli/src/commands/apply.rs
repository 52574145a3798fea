//! Shared flow for applying pending migrations or seeds

use anyhow::Result;
use std::sync::Arc;
use tm_core::{Config, ExecutionMode, ScriptKind};
use tm_engine::{run_pending, MigrationCatalog, MigrationEngine, RunOutcome, RunReport};
use tokio_util::sync::CancellationToken;

use crate::cli::GlobalArgs;
use crate::commands::common::{
    engine_failure, execution_context, exit_codes, kind_title, open_database,
    open_existing_database, script_source, CommandResult,
};

/// What to apply and how.
pub(crate) struct ApplyRequest {
    pub(crate) kind: ScriptKind,
    pub(crate) mode: ExecutionMode,
    pub(crate) target_version: Option<u32>,
}

/// Plan and apply pending scripts of one kind, printing progress.
pub(crate) async fn apply_pending(
    request: ApplyRequest,
    config: &Config,
    global: &GlobalArgs,
    cancel: &CancellationToken,
) -> Result<CommandResult> {
    let db = if request.mode.is_dry_run() {
        open_existing_database(config).await?
    } else {
        open_database(config).await?
    };
    let ctx = execution_context(db.clone(), config, request.mode, global, cancel)
        .with_target_version(request.target_version);
    let engine = MigrationEngine::new(Arc::new(ctx), config);
    let catalog = MigrationCatalog::new(
        script_source(global),
        db,
        &config.migrations,
        request.kind,
    );

    let report = run_pending(&catalog, &engine)
        .await
        .map_err(|e| engine_failure(&format!("Failed to read pending {}s", request.kind), e))?;

    print_report(&report, global.verbose);
    Ok(report_result(&report))
}

fn print_report(report: &RunReport, verbose: bool) {
    let kind = report.kind;
    match &report.outcome {
        RunOutcome::NoChanges => {
            println!("✅ No pending {kind}s - database is up to date");
            return;
        }
        RunOutcome::Planned => {
            println!("Dry run - {} pending {kind}(s) would be applied:", report.total_count());
            for planned in &report.plan {
                println!("  ⏳ {}", planned.descriptor.file_name);
                if verbose {
                    if let Some(description) = &planned.descriptor.description {
                        println!("     {description}");
                    }
                }
                if let Some(validation) = &planned.validation {
                    for error in validation.errors() {
                        println!("     ✗ {error}");
                    }
                    for warning in validation.warnings() {
                        println!("     ⚠ {warning}");
                    }
                }
            }
            return;
        }
        _ => {}
    }

    println!("Applying {} pending {kind}(s)", report.total_count());
    for executed in &report.executed {
        let ms = executed
            .execution_time
            .map(|t| t.as_millis())
            .unwrap_or_default();
        println!("  ✓ {} ({ms}ms)", executed.file_name);
    }
    for warning in report.warnings() {
        println!("  ⚠ {warning}");
    }
    match &report.outcome {
        RunOutcome::ValidationFailed { name, errors } => {
            println!("  ✗ {name}: validation failed: {errors}");
        }
        RunOutcome::ExecutionFailed { name, error } => {
            println!("  ✗ {name}: {error}");
        }
        RunOutcome::Cancelled => println!("  Cancelled"),
        _ => {}
    }
}

/// Map a run report to the command result and exit code.
pub(crate) fn report_result(report: &RunReport) -> CommandResult {
    let kind = report.kind;
    let executed = report.executed_count();
    let total = report.total_count();
    match &report.outcome {
        RunOutcome::NoChanges => CommandResult::no_changes(format!("No pending {kind}s")),
        RunOutcome::Planned => {
            CommandResult::success(format!("Dry run completed: {total} {kind}(s) pending"))
                .with_data("plannedCount", total)
        }
        RunOutcome::Completed => {
            CommandResult::success(format!("Successfully executed {executed} {kind}(s)"))
                .with_data("executedCount", executed)
                .with_data("totalCount", total)
        }
        RunOutcome::ValidationFailed { name, errors } => CommandResult::failed(
            format!("Validation failed for {name}"),
            exit_codes::VALIDATION_ERROR,
        )
        .with_error(errors)
        .with_data("executedCount", executed),
        RunOutcome::ExecutionFailed { name, error } => CommandResult::failed(
            format!("{} failed: {name}", kind_title(kind)),
            exit_codes::MIGRATION_ERROR,
        )
        .with_error(error)
        .with_data("executedCount", executed)
        .with_data("failedMigration", name.as_str()),
        RunOutcome::Cancelled => CommandResult::cancelled(format!(
            "Cancelled after {executed} of {total} {kind}(s)"
        ))
        .with_data("executedCount", executed),
    }
}

#[cfg(test)]
#[path = "apply_test.rs"]
mod tests;
