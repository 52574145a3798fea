//! CLI argument definitions using clap derive API

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Tidemark - versioned SQL migrations for DuckDB
#[derive(Parser, Debug)]
#[command(name = "tidemark")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all commands
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to tidemark.yml (default: ./tidemark.yml when present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Database connection string (DuckDB file path or :memory:)
    #[arg(
        short = 's',
        long,
        global = true,
        env = "TIDEMARK_CONNECTION_STRING"
    )]
    pub connection_string: Option<String>,

    /// Read scripts from this directory instead of the bundled set
    #[arg(long, global = true)]
    pub scripts_dir: Option<PathBuf>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Apply pending migrations
    Migrate(MigrateArgs),

    /// Show executed and pending migrations
    Status(StatusArgs),

    /// Test the database connection
    Test(TestArgs),

    /// Apply pending seed scripts
    Seed(SeedArgs),

    /// Validate every migration and seed script without touching the database
    Validate(ValidateArgs),
}

/// Arguments for the migrate command
#[derive(Args, Debug, Default)]
pub struct MigrateArgs {
    /// Show what would be applied without executing anything
    #[arg(short = 'd', long = "dryrun")]
    pub dry_run: bool,

    /// Skip validation and execute
    #[arg(short, long)]
    pub force: bool,

    /// Stop at this version (e.g. V003 or 3)
    #[arg(short, long)]
    pub target: Option<String>,

    /// Back up the database first (not implemented)
    #[arg(short, long)]
    pub backup: bool,
}

/// Arguments for the status command
#[derive(Args, Debug, Default)]
pub struct StatusArgs {
    /// Print status as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Arguments for the test command
#[derive(Args, Debug, Default)]
pub struct TestArgs {}

/// Arguments for the seed command
#[derive(Args, Debug, Default)]
pub struct SeedArgs {
    /// Show what would be applied without executing anything
    #[arg(short = 'd', long = "dryrun")]
    pub dry_run: bool,

    /// Skip validation and execute
    #[arg(short, long)]
    pub force: bool,
}

/// Arguments for the validate command
#[derive(Args, Debug, Default)]
pub struct ValidateArgs {
    /// Treat warnings as errors
    #[arg(long)]
    pub strict: bool,
}

#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;
