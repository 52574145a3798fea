//! tm-engine - Migration catalog and execution engine for Tidemark
//!
//! Discovers scripts from a [`tm_core::ScriptSource`], partitions them against
//! a journal table, and applies pending scripts one transaction at a time.

pub mod catalog;
pub mod context;
pub mod engine;
pub mod error;
pub mod journal;
pub mod runner;
pub mod template;

#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;

pub use catalog::{discover_scripts, JournalWrite, MigrationCatalog};
pub use context::{ExecutionContext, Variables};
pub use engine::{validate_script, ExecutionReport, MigrationEngine, OperationResult};
pub use error::{EngineError, EngineResult};
pub use journal::{Journal, JournalEntry};
pub use runner::{run_pending, PlannedScript, RunOutcome, RunReport};
