use super::*;
use std::fs;
use tempfile::tempdir;

fn global_with(connection_string: Option<&str>) -> GlobalArgs {
    GlobalArgs {
        connection_string: connection_string.map(String::from),
        ..GlobalArgs::default()
    }
}

fn abort_code(err: anyhow::Error) -> i32 {
    err.downcast::<Abort>().unwrap().0.exit_code
}

#[test]
fn test_exit_code_matches_outcome() {
    assert_eq!(CommandResult::success("ok").exit_code, 0);
    assert_eq!(CommandResult::no_changes("nothing").exit_code, 0);
    assert_eq!(CommandResult::cancelled("stop").exit_code, 1);
    assert_eq!(CommandResult::failed("bad", 0).exit_code, 1);
    assert_eq!(CommandResult::failed("bad", 4).exit_code, 4);
    assert!(CommandResult::no_changes("nothing").is_success());
    assert!(!CommandResult::cancelled("stop").is_success());
}

#[tokio::test]
async fn test_run_command_measures_and_passes_result_through() {
    let cancel = CancellationToken::new();
    let result = run_command("noop", &cancel, || async {
        Ok(CommandResult::success("done").with_data("count", 2))
    })
    .await;
    assert_eq!(result.outcome, Outcome::Success);
    assert_eq!(result.data["count"], 2);
}

#[tokio::test]
async fn test_run_command_unwraps_abort() {
    let cancel = CancellationToken::new();
    let result = run_command("cfg", &cancel, || async {
        Err(invalid_arguments("Invalid configuration", "missing connection"))
    })
    .await;
    assert_eq!(result.outcome, Outcome::Failed);
    assert_eq!(result.exit_code, exit_codes::INVALID_ARGUMENTS);
    assert_eq!(result.error.as_deref(), Some("missing connection"));
}

#[tokio::test]
async fn test_run_command_converts_unexpected_errors() {
    let cancel = CancellationToken::new();
    let result = run_command("boom", &cancel, || async {
        Err(anyhow::anyhow!("disk on fire"))
    })
    .await;
    assert_eq!(result.exit_code, exit_codes::ERROR);
    assert_eq!(result.message, "Unexpected error occurred");
    assert!(result.error.unwrap().contains("disk on fire"));
}

#[tokio::test]
async fn test_run_command_reports_cancellation() {
    let cancel = CancellationToken::new();
    cancel.cancel();
    let result = run_command("slow", &cancel, || async {
        Err(anyhow::anyhow!("interrupted"))
    })
    .await;
    assert_eq!(result.outcome, Outcome::Cancelled);
    assert_eq!(result.exit_code, exit_codes::ERROR);
}

#[test]
fn test_finish_returns_exit_code() {
    assert!(finish(CommandResult::no_changes("up to date")).is_ok());
    let err = finish(CommandResult::failed("broken", exit_codes::MIGRATION_ERROR)).unwrap_err();
    assert_eq!(err.downcast_ref::<ExitCode>().map(|c| c.0), Some(4));
}

#[test]
fn test_load_config_requires_connection_string() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("tidemark.yml");
    fs::write(&path, "migrations:\n  journal_table: history\n").unwrap();

    let mut global = global_with(None);
    global.config = Some(path.clone());
    assert_eq!(abort_code(load_config(&global).unwrap_err()), 2);

    global.connection_string = Some(":memory:".to_string());
    let config = load_config(&global).unwrap();
    assert_eq!(config.database.connection_string, ":memory:");
    assert_eq!(config.migrations.journal_table, "history");
}

#[test]
fn test_load_config_missing_file_is_invalid_arguments() {
    let dir = tempdir().unwrap();
    let mut global = global_with(Some(":memory:"));
    global.config = Some(dir.path().join("nope.yml"));
    assert_eq!(abort_code(load_config(&global).unwrap_err()), 2);
}

#[tokio::test]
async fn test_open_database_unreachable_is_connection_error() {
    let dir = tempdir().unwrap();
    let mut config = Config::default();
    config.database.connection_string = dir
        .path()
        .join("missing")
        .join("app.duckdb")
        .display()
        .to_string();
    let err = open_database(&config).await.err().unwrap();
    assert_eq!(abort_code(err), exit_codes::DATABASE_CONNECTION_ERROR);
}

#[tokio::test]
async fn test_open_existing_database_never_creates_the_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("app.duckdb");
    let mut config = Config::default();
    config.database.connection_string = path.display().to_string();

    let err = open_existing_database(&config).await.err().unwrap();
    assert_eq!(abort_code(err), exit_codes::DATABASE_CONNECTION_ERROR);
    assert!(!path.exists());

    open_database(&config).await.unwrap();
    assert!(path.exists());
    open_existing_database(&config).await.unwrap();
}

#[test]
fn test_bundled_scripts_are_discoverable() {
    let source = script_source(&GlobalArgs::default());
    let names = source.list().unwrap();
    assert!(names.iter().any(|n| n == "migrations/V001__create_members.sql"));
    assert!(names.iter().any(|n| n.starts_with("seeds/S001__")));
}
