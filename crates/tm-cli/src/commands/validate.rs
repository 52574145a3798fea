//! Validate command implementation

use anyhow::Result;
use std::collections::HashMap;
use tm_core::{Config, MigrationDescriptor, ScriptKind, ScriptSource};
use tm_engine::{discover_scripts, validate_script};
use tokio_util::sync::CancellationToken;

use crate::cli::{GlobalArgs, ValidateArgs};
use crate::commands::common::{
    engine_failure, exit_codes, finish, kind_title, read_config, run_command, script_source,
    CommandResult,
};

/// Issues found across every script.
#[derive(Debug, Default)]
pub(crate) struct ValidationSummary {
    pub(crate) checked: usize,
    pub(crate) errors: Vec<String>,
    pub(crate) warnings: Vec<String>,
}

impl ValidationSummary {
    fn passed(&self, strict: bool) -> bool {
        self.errors.is_empty() && (!strict || self.warnings.is_empty())
    }
}

/// Execute the validate command
pub(crate) async fn execute(
    args: &ValidateArgs,
    global: &GlobalArgs,
    cancel: &CancellationToken,
) -> Result<()> {
    finish(run_command("validate", cancel, || async { run(args, global) }).await)
}

pub(crate) fn run(args: &ValidateArgs, global: &GlobalArgs) -> Result<CommandResult> {
    // The connection string is not needed here.
    let config = read_config(global)?;
    let source = script_source(global);
    println!("Validating scripts from {}\n", source.describe());

    let summary = validate_scripts(source.as_ref(), &config)?;

    println!();
    for error in &summary.errors {
        println!("[ERROR] {error}");
    }
    for warning in &summary.warnings {
        println!("[WARNING] {warning}");
    }
    if !summary.errors.is_empty() || !summary.warnings.is_empty() {
        println!();
    }

    let counts = format!(
        "{} errors, {} warnings",
        summary.errors.len(),
        summary.warnings.len()
    );
    let result = if summary.passed(args.strict) {
        println!("Validation passed: {counts}");
        CommandResult::success(format!("Validated {} script(s)", summary.checked))
    } else {
        let mode = if args.strict { " (strict mode)" } else { "" };
        println!("Validation failed{mode}: {counts}");
        CommandResult::failed(
            format!("Validation failed{mode}: {counts}"),
            exit_codes::VALIDATION_ERROR,
        )
    };
    Ok(result
        .with_data("checkedCount", summary.checked)
        .with_data("errorCount", summary.errors.len())
        .with_data("warningCount", summary.warnings.len()))
}

/// Validate every migration and seed script, printing one line per script.
pub(crate) fn validate_scripts(
    source: &dyn ScriptSource,
    config: &Config,
) -> Result<ValidationSummary> {
    let settings = &config.migrations;
    let variables = settings
        .variables_enabled
        .then_some(&settings.variables);

    let mut summary = ValidationSummary::default();
    for kind in [ScriptKind::Migration, ScriptKind::Seed] {
        let scripts = discover_scripts(source, kind, settings.pattern_for(kind))
            .map_err(|e| engine_failure(&format!("Failed to read {kind} scripts"), e))?;
        if scripts.is_empty() {
            continue;
        }

        println!("{}s:", kind_title(kind));
        for descriptor in &scripts {
            let result = validate_script(descriptor, variables);
            if result.is_valid() {
                println!("  ✓ {}", descriptor.file_name);
            } else {
                println!(
                    "  ✗ {} ({} errors)",
                    descriptor.file_name,
                    result.errors().len()
                );
            }
            summary.errors.extend(
                result
                    .errors()
                    .iter()
                    .map(|e| format!("{}: {e}", descriptor.file_name)),
            );
            summary.warnings.extend(
                result
                    .warnings()
                    .iter()
                    .map(|w| format!("{}: {w}", descriptor.file_name)),
            );
        }
        summary.warnings.extend(duplicate_versions(kind, &scripts));
        summary.checked += scripts.len();
    }
    Ok(summary)
}

/// Versions claimed by more than one script. Both still run, in source order.
fn duplicate_versions(kind: ScriptKind, scripts: &[MigrationDescriptor]) -> Vec<String> {
    let mut by_version: HashMap<u32, Vec<&str>> = HashMap::new();
    for descriptor in scripts.iter().filter(|d| d.version > 0) {
        by_version
            .entry(descriptor.version)
            .or_default()
            .push(descriptor.file_name.as_str());
    }

    let mut duplicates: Vec<_> = by_version
        .into_iter()
        .filter(|(_, names)| names.len() > 1)
        .collect();
    duplicates.sort_by_key(|(version, _)| *version);
    duplicates
        .into_iter()
        .map(|(version, names)| {
            format!(
                "{kind} version {version} is used by {}",
                names.join(", ")
            )
        })
        .collect()
}

#[cfg(test)]
#[path = "validate_test.rs"]
mod tests;
