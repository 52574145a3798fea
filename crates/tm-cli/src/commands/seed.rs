//! Seed command implementation

use anyhow::Result;
use tm_core::{ExecutionMode, ScriptKind};
use tokio_util::sync::CancellationToken;

use crate::cli::{GlobalArgs, SeedArgs};
use crate::commands::apply::{apply_pending, ApplyRequest};
use crate::commands::common::{finish, load_config, run_command, CommandResult};

/// Execute the seed command
pub(crate) async fn execute(
    args: &SeedArgs,
    global: &GlobalArgs,
    cancel: &CancellationToken,
) -> Result<()> {
    finish(run_command("seed", cancel, || run(args, global, cancel)).await)
}

pub(crate) async fn run(
    args: &SeedArgs,
    global: &GlobalArgs,
    cancel: &CancellationToken,
) -> Result<CommandResult> {
    let config = load_config(global)?;
    let mode = ExecutionMode::from_flags(args.dry_run, args.force, global.verbose);
    apply_pending(
        ApplyRequest {
            kind: ScriptKind::Seed,
            mode,
            target_version: None,
        },
        &config,
        global,
        cancel,
    )
    .await
}
