//! Error types for the migration engine.

use thiserror::Error;
use tm_core::CoreError;
use tm_db::DbError;

/// Engine and catalog errors.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Script source could not be listed (E001).
    #[error("[E001] Script source unavailable: {0}")]
    Source(#[from] CoreError),

    /// Journal could not be read (E002).
    #[error("[E002] Failed to read journal {journal}: {source}")]
    JournalRead {
        journal: String,
        #[source]
        source: DbError,
    },

    /// Journal table could not be created (E003).
    #[error("[E003] Failed to create journal {journal}: {source}")]
    JournalSetup {
        journal: String,
        #[source]
        source: DbError,
    },

    /// Script template failed to render (E004).
    #[error("[E004] Failed to render script '{name}': {reason}")]
    Render { name: String, reason: String },

    /// Database error outside the journal (E005).
    #[error("[E005] {0}")]
    Db(#[from] DbError),
}

/// Result type alias for [`EngineError`].
pub type EngineResult<T> = Result<T, EngineError>;

impl EngineError {
    /// Whether the underlying cause is an unreachable database.
    pub fn is_connectivity(&self) -> bool {
        match self {
            EngineError::JournalRead { source, .. }
            | EngineError::JournalSetup { source, .. }
            | EngineError::Db(source) => source.is_connectivity(),
            _ => false,
        }
    }
}
