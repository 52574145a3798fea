//! tm-core - Core library for Tidemark
//!
//! This crate provides the migration descriptor model, file name parsing,
//! checksums, validation result types, configuration, and the script source
//! abstraction used across all Tidemark components.

pub mod checksum;
pub mod config;
pub mod error;
pub mod migration;
pub mod mode;
pub mod source;
pub mod sql_utils;
pub mod validation;

pub use checksum::compute_checksum;
pub use config::{Config, DatabaseConfig, IsolationLevel, MigrationSettings};
pub use error::{CoreError, CoreResult};
pub use migration::{
    parse_file_name, parse_target_version, MigrationDescriptor, MigrationState, ScriptKind,
};
pub use mode::ExecutionMode;
pub use source::{DirectorySource, EmbeddedSource, MemorySource, ScriptSource};
pub use validation::{ValidationError, ValidationResult, ValidationWarning};
