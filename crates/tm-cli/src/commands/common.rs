//! Shared utilities for CLI commands

use anyhow::Result;
use rust_embed::Embed;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tm_core::{
    Config, DirectorySource, EmbeddedSource, ExecutionMode, ScriptKind, ScriptSource,
};
use tm_db::{Database, DuckDbBackend};
use tm_engine::{EngineError, ExecutionContext};
use tokio_util::sync::CancellationToken;

use crate::cli::GlobalArgs;

/// Process exit codes.
pub(crate) mod exit_codes {
    pub(crate) const SUCCESS: i32 = 0;
    pub(crate) const ERROR: i32 = 1;
    pub(crate) const INVALID_ARGUMENTS: i32 = 2;
    pub(crate) const DATABASE_CONNECTION_ERROR: i32 = 3;
    pub(crate) const MIGRATION_ERROR: i32 = 4;
    pub(crate) const VALIDATION_ERROR: i32 = 5;
}

/// Scripts compiled into the binary.
#[derive(Embed)]
#[folder = "scripts/"]
pub(crate) struct BundledScripts;

/// Error type representing a non-zero process exit code.
///
/// Use `return Err(ExitCode(N).into())` instead of `std::process::exit(N)`
/// so that RAII destructors run and cleanup happens properly.
#[derive(Debug)]
pub(crate) struct ExitCode(pub(crate) i32);

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Control flow only; nothing user-facing.
        write!(f, "")
    }
}

impl std::error::Error for ExitCode {}

/// How a command ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub(crate) enum Outcome {
    Success,
    NoChanges,
    Failed,
    Cancelled,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Success => write!(f, "success"),
            Outcome::NoChanges => write!(f, "no changes"),
            Outcome::Failed => write!(f, "failed"),
            Outcome::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Result of one command.
///
/// `exit_code` is 0 exactly when the outcome is `Success` or `NoChanges`.
#[derive(Debug, Clone)]
pub(crate) struct CommandResult {
    pub(crate) outcome: Outcome,
    pub(crate) message: String,
    pub(crate) error: Option<String>,
    pub(crate) exit_code: i32,
    pub(crate) data: Map<String, Value>,
    pub(crate) elapsed: Duration,
}

impl CommandResult {
    fn new(outcome: Outcome, message: impl Into<String>, exit_code: i32) -> Self {
        Self {
            outcome,
            message: message.into(),
            error: None,
            exit_code,
            data: Map::new(),
            elapsed: Duration::ZERO,
        }
    }

    pub(crate) fn success(message: impl Into<String>) -> Self {
        Self::new(Outcome::Success, message, exit_codes::SUCCESS)
    }

    pub(crate) fn no_changes(message: impl Into<String>) -> Self {
        Self::new(Outcome::NoChanges, message, exit_codes::SUCCESS)
    }

    /// A failure; a zero `exit_code` is replaced by the generic error code.
    pub(crate) fn failed(message: impl Into<String>, exit_code: i32) -> Self {
        let code = if exit_code == exit_codes::SUCCESS {
            exit_codes::ERROR
        } else {
            exit_code
        };
        Self::new(Outcome::Failed, message, code)
    }

    pub(crate) fn cancelled(message: impl Into<String>) -> Self {
        Self::new(Outcome::Cancelled, message, exit_codes::ERROR)
    }

    pub(crate) fn with_error(mut self, error: impl fmt::Display) -> Self {
        self.error = Some(error.to_string());
        self
    }

    pub(crate) fn with_data(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.data.insert(key.to_string(), value.into());
        self
    }

    pub(crate) fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Success | Outcome::NoChanges)
    }
}

/// An expected failure that ends a command early with a prepared result.
#[derive(Debug)]
pub(crate) struct Abort(pub(crate) CommandResult);

impl fmt::Display for Abort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.message)
    }
}

impl std::error::Error for Abort {}

/// Abort with exit code 2.
pub(crate) fn invalid_arguments(message: &str, error: impl fmt::Display) -> anyhow::Error {
    Abort(CommandResult::failed(message, exit_codes::INVALID_ARGUMENTS).with_error(error)).into()
}

/// Abort for an engine error: connectivity problems exit 3, anything else 1.
pub(crate) fn engine_failure(message: &str, error: EngineError) -> anyhow::Error {
    let code = if error.is_connectivity() {
        exit_codes::DATABASE_CONNECTION_ERROR
    } else {
        exit_codes::ERROR
    };
    Abort(CommandResult::failed(message, code).with_error(error)).into()
}

/// Run a command body with timing, logging and error-to-result conversion.
///
/// `Abort` errors become their prepared result. Any other error becomes a
/// generic failure with exit code 1, or `Cancelled` when cancellation was
/// requested.
pub(crate) async fn run_command<F, Fut>(
    name: &str,
    cancel: &CancellationToken,
    body: F,
) -> CommandResult
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<CommandResult>>,
{
    log::info!("Starting {name}");
    let started = Instant::now();

    let mut result = match body().await {
        Ok(result) => result,
        Err(err) => match err.downcast::<Abort>() {
            Ok(abort) => abort.0,
            Err(err) if cancel.is_cancelled() => {
                log::warn!("{name} cancelled: {err:#}");
                CommandResult::cancelled(format!("{name} cancelled"))
            }
            Err(err) => {
                log::error!("Unexpected error during {name}: {err:?}");
                CommandResult::failed("Unexpected error occurred", exit_codes::ERROR)
                    .with_error(format!("{err:#}"))
            }
        },
    };
    result.elapsed = started.elapsed();

    match result.outcome {
        Outcome::Success | Outcome::NoChanges => log::info!(
            "{name} completed ({}) in {}ms",
            result.outcome,
            result.elapsed.as_millis()
        ),
        Outcome::Cancelled => log::warn!("{name} was cancelled"),
        Outcome::Failed => log::error!("{name} failed: {}", result.message),
    }
    result
}

/// Report a finished command and turn a failure into an [`ExitCode`].
pub(crate) fn finish(result: CommandResult) -> Result<()> {
    if !result.is_success() {
        eprintln!("✗ {}", result.message);
        if let Some(error) = &result.error {
            eprintln!("  {error}");
        }
    }
    if result.exit_code != exit_codes::SUCCESS {
        return Err(ExitCode(result.exit_code).into());
    }
    Ok(())
}

/// Load configuration and apply CLI overrides without validating it.
pub(crate) fn read_config(global: &GlobalArgs) -> Result<Config> {
    let loaded = match &global.config {
        Some(path) => Config::load(path),
        None => Config::load_or_default(Path::new(".")),
    };
    let mut config = loaded.map_err(|e| invalid_arguments("Failed to load configuration", e))?;

    if let Some(connection_string) = &global.connection_string {
        config.database.connection_string = connection_string.clone();
    }
    Ok(config)
}

/// Load configuration and apply CLI overrides, then validate it.
pub(crate) fn load_config(global: &GlobalArgs) -> Result<Config> {
    let config = read_config(global)?;
    config
        .validate()
        .map_err(|e| invalid_arguments("Invalid configuration", e))?;
    Ok(config)
}

/// Open the configured database and check it answers.
///
/// A database file that does not exist yet is created.
pub(crate) async fn open_database(config: &Config) -> Result<Arc<dyn Database>> {
    connect(config, DuckDbBackend::new).await
}

/// Open the configured database without creating it.
///
/// Used by verbs that only read, so a mistyped path is reported as a
/// connection failure instead of leaving an empty database file behind.
pub(crate) async fn open_existing_database(config: &Config) -> Result<Arc<dyn Database>> {
    connect(config, DuckDbBackend::open_existing).await
}

async fn connect(
    config: &Config,
    open: fn(&str) -> tm_db::DbResult<DuckDbBackend>,
) -> Result<Arc<dyn Database>> {
    let connect_failed = |e: tm_db::DbError| -> anyhow::Error {
        Abort(
            CommandResult::failed(
                "Cannot connect to database",
                exit_codes::DATABASE_CONNECTION_ERROR,
            )
            .with_error(e),
        )
        .into()
    };

    let db: Arc<dyn Database> =
        Arc::new(open(&config.database.connection_string).map_err(connect_failed)?);
    db.ping().await.map_err(connect_failed)?;
    log::debug!(
        "Connected to {} at {}",
        db.db_type(),
        config.database.connection_string
    );
    Ok(db)
}

/// Bundled scripts, or `--scripts-dir` when given.
pub(crate) fn script_source(global: &GlobalArgs) -> Arc<dyn ScriptSource> {
    match &global.scripts_dir {
        Some(dir) => Arc::new(DirectorySource::new(dir)),
        None => Arc::new(EmbeddedSource::<BundledScripts>::new()),
    }
}

/// Capitalized script kind for headings and messages.
pub(crate) fn kind_title(kind: ScriptKind) -> &'static str {
    match kind {
        ScriptKind::Migration => "Migration",
        ScriptKind::Seed => "Seed",
    }
}

/// Execution context for one command.
pub(crate) fn execution_context(
    db: Arc<dyn Database>,
    config: &Config,
    mode: ExecutionMode,
    global: &GlobalArgs,
    cancel: &CancellationToken,
) -> ExecutionContext {
    let settings = &config.migrations;
    ExecutionContext::new(db)
        .with_mode(mode)
        .with_verbose(global.verbose)
        .with_variables(
            settings
                .variables_enabled
                .then(|| settings.variables.clone()),
        )
        .with_cancel(cancel.clone())
}

#[cfg(test)]
#[path = "common_test.rs"]
mod tests;
