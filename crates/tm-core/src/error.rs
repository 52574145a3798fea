//! Error types for tm-core

use thiserror::Error;

/// Core error type for Tidemark
#[derive(Error, Debug)]
pub enum CoreError {
    /// C001: Configuration file not found
    #[error("[C001] Config file not found: {path}")]
    ConfigNotFound { path: String },

    /// C002: Failed to parse configuration file
    #[error("[C002] Failed to parse config: {message}")]
    ConfigParseError { message: String },

    /// C003: Invalid configuration value
    #[error("[C003] Invalid config: {message}")]
    ConfigInvalid { message: String },

    /// C004: Script source directory not found
    #[error("[C004] Script directory not found: {path}")]
    ScriptDirNotFound { path: String },

    /// C005: Script listed by a source but not readable
    #[error("[C005] Script '{name}' could not be read: {reason}")]
    ScriptUnreadable { name: String, reason: String },

    /// C006: Target version could not be parsed
    #[error("[C006] Invalid target version format: '{value}' (expected 'V001' or '001')")]
    InvalidTargetVersion { value: String },

    /// C007: IO error with file path context
    #[error("[C007] Failed to read '{path}': {source}")]
    IoWithPath {
        path: String,
        source: std::io::Error,
    },
}

/// Result type alias for CoreError
pub type CoreResult<T> = Result<T, CoreError>;
