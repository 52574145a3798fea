//! Planning and fail-fast application of pending scripts.
//!
//! A run is one linear pass: plan, then either report the plan (dry run) or
//! apply candidates in version order, stopping at the first validation error
//! or execution failure.

use crate::catalog::MigrationCatalog;
use crate::engine::{MigrationEngine, OperationResult};
use crate::error::EngineResult;
use tm_core::{MigrationDescriptor, ScriptKind, ValidationResult};

/// One candidate script and, when it was validated, the result.
#[derive(Debug, Clone)]
pub struct PlannedScript {
    pub descriptor: MigrationDescriptor,
    pub validation: Option<ValidationResult>,
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Nothing pending under the target
    NoChanges,
    /// Dry run listed the plan
    Planned,
    /// Every candidate was applied
    Completed,
    /// A candidate failed validation; it and later candidates were not run
    ValidationFailed { name: String, errors: String },
    /// A candidate failed to apply; later candidates were not run
    ExecutionFailed { name: String, error: String },
    Cancelled,
}

/// Result of [`run_pending`].
#[derive(Debug, Clone)]
pub struct RunReport {
    pub kind: ScriptKind,
    pub outcome: RunOutcome,
    pub plan: Vec<PlannedScript>,
    pub executed: Vec<MigrationDescriptor>,
}

impl RunReport {
    fn new(kind: ScriptKind, outcome: RunOutcome, plan: Vec<PlannedScript>) -> Self {
        Self {
            kind,
            outcome,
            plan,
            executed: Vec::new(),
        }
    }

    pub fn executed_count(&self) -> usize {
        self.executed.len()
    }

    pub fn total_count(&self) -> usize {
        self.plan.len()
    }

    /// Warnings from every validated candidate, prefixed by file name.
    pub fn warnings(&self) -> Vec<String> {
        self.plan
            .iter()
            .filter_map(|p| p.validation.as_ref().map(|v| (&p.descriptor, v)))
            .flat_map(|(d, v)| {
                v.warnings()
                    .iter()
                    .map(move |w| format!("{}: {w}", d.file_name))
            })
            .collect()
    }
}

/// Plan the catalog's pending scripts and apply them with `engine`.
///
/// Mode, target version and cancellation come from the engine's context.
/// Errors reading the catalog or preparing the journal are returned; script
/// failures are reported through [`RunOutcome`].
pub async fn run_pending(
    catalog: &MigrationCatalog,
    engine: &MigrationEngine,
) -> EngineResult<RunReport> {
    let ctx = engine.context();
    let kind = catalog.kind();

    if ctx.is_cancelled() {
        return Ok(RunReport::new(kind, RunOutcome::Cancelled, Vec::new()));
    }

    let mut candidates = catalog.get_pending_migrations().await?;
    candidates.sort_by_key(|d| d.version);
    candidates.retain(|d| ctx.within_target(d.version));

    let mut plan: Vec<PlannedScript> = candidates
        .into_iter()
        .map(|descriptor| PlannedScript {
            descriptor,
            validation: None,
        })
        .collect();

    if ctx.is_cancelled() {
        log::warn!("Cancellation requested while reading the {kind} journal");
        return Ok(RunReport::new(kind, RunOutcome::Cancelled, plan));
    }

    if plan.is_empty() {
        log::info!("No pending {kind} scripts");
        return Ok(RunReport::new(kind, RunOutcome::NoChanges, plan));
    }

    if ctx.mode.is_dry_run() {
        if ctx.verbose {
            for planned in &mut plan {
                planned.validation = Some(engine.validate_migration(&planned.descriptor));
            }
        }
        log::info!("[dry run] {} {kind} scripts would be applied", plan.len());
        return Ok(RunReport::new(kind, RunOutcome::Planned, plan));
    }

    engine.ensure_journal(kind).await?;

    let mut report = RunReport::new(kind, RunOutcome::Completed, Vec::new());
    for planned in plan.iter_mut() {
        if ctx.is_cancelled() {
            log::warn!("Cancellation requested, stopping before {}", planned.descriptor.name);
            report.outcome = RunOutcome::Cancelled;
            break;
        }

        if ctx.mode.validates() {
            let validation = engine.validate_migration(&planned.descriptor);
            for warning in validation.warnings() {
                log::warn!("{}: {warning}", planned.descriptor.file_name);
            }
            let failed = (!validation.is_valid()).then(|| validation.error_summary());
            planned.validation = Some(validation);
            if let Some(errors) = failed {
                report.outcome = RunOutcome::ValidationFailed {
                    name: planned.descriptor.name.clone(),
                    errors,
                };
                break;
            }
        }

        let execution = engine.execute(&planned.descriptor, ctx.mode).await;
        match execution.result {
            OperationResult::Success => report.executed.push(execution.descriptor),
            OperationResult::Failed { error } => {
                report.outcome = RunOutcome::ExecutionFailed {
                    name: execution.descriptor.name,
                    error,
                };
                break;
            }
            OperationResult::Cancelled => {
                report.outcome = RunOutcome::Cancelled;
                break;
            }
        }
    }

    report.plan = plan;
    Ok(report)
}

#[cfg(test)]
#[path = "runner_test.rs"]
mod tests;
