//! Migrate command implementation

use anyhow::Result;
use tm_core::{parse_target_version, ExecutionMode, ScriptKind};
use tokio_util::sync::CancellationToken;

use crate::cli::{GlobalArgs, MigrateArgs};
use crate::commands::apply::{apply_pending, ApplyRequest};
use crate::commands::common::{finish, invalid_arguments, load_config, run_command, CommandResult};

/// Execute the migrate command
pub(crate) async fn execute(
    args: &MigrateArgs,
    global: &GlobalArgs,
    cancel: &CancellationToken,
) -> Result<()> {
    finish(run_command("migrate", cancel, || run(args, global, cancel)).await)
}

pub(crate) async fn run(
    args: &MigrateArgs,
    global: &GlobalArgs,
    cancel: &CancellationToken,
) -> Result<CommandResult> {
    // A bad target aborts before the database is opened.
    let target_version = args
        .target
        .as_deref()
        .map(parse_target_version)
        .transpose()
        .map_err(|e| invalid_arguments("Invalid target version", e))?;

    let config = load_config(global)?;

    if args.backup {
        log::warn!("Backup is not implemented; continuing without a backup");
    }

    let mode = ExecutionMode::from_flags(args.dry_run, args.force, global.verbose);
    log::debug!("Migrating in {mode} mode, target {target_version:?}");

    apply_pending(
        ApplyRequest {
            kind: ScriptKind::Migration,
            mode,
            target_version,
        },
        &config,
        global,
        cancel,
    )
    .await
}

#[cfg(test)]
#[path = "migrate_test.rs"]
mod tests;
