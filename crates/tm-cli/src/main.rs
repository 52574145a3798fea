//! Tidemark CLI - versioned SQL migrations for DuckDB

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::Cli;
use commands::common::ExitCode;
use commands::{migrate, seed, status, test, validate};

/// `RUST_LOG` wins; otherwise `--verbose` selects debug and the default is warn.
fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "warn" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    init_logging(cli.global.verbose);

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupt received, stopping after the current script");
            on_interrupt.cancel();
        }
    });

    let global = &cli.global;
    let result = match &cli.command {
        cli::Commands::Migrate(args) => migrate::execute(args, global, &cancel).await,
        cli::Commands::Status(args) => status::execute(args, global, &cancel).await,
        cli::Commands::Test(args) => test::execute(args, global, &cancel).await,
        cli::Commands::Seed(args) => seed::execute(args, global, &cancel).await,
        cli::Commands::Validate(args) => validate::execute(args, global, &cancel).await,
    };

    match result {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(err) => match err.downcast_ref::<ExitCode>() {
            Some(ExitCode(code)) => {
                std::process::ExitCode::from(u8::try_from(*code).unwrap_or(1))
            }
            None => {
                eprintln!("Error: {err:#}");
                std::process::ExitCode::FAILURE
            }
        },
    }
}
