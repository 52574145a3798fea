//! Migration descriptor model and script file name parsing.
//!
//! A [`MigrationDescriptor`] is an immutable snapshot of one bundled script.
//! Descriptors are rebuilt from the script source on every run; the journal
//! in the target database is the only record of what has been applied.

use crate::checksum::compute_checksum;
use crate::error::{CoreError, CoreResult};
use chrono::NaiveDateTime;
use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// Separator between the version token and the description in a file name.
pub const NAME_SEPARATOR: &str = "__";

/// Extension every script must carry.
pub const SQL_EXTENSION: &str = ".sql";

/// The two script families, tracked in separate journals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScriptKind {
    /// Schema migration (`V<ddd>__<description>.sql`)
    Migration,
    /// Data seed (`S<ddd>__<description>.sql`)
    Seed,
}

impl ScriptKind {
    /// Leading letter of the version token.
    pub fn prefix(self) -> char {
        match self {
            ScriptKind::Migration => 'V',
            ScriptKind::Seed => 'S',
        }
    }
}

impl fmt::Display for ScriptKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptKind::Migration => write!(f, "migration"),
            ScriptKind::Seed => write!(f, "seed"),
        }
    }
}

/// Lifecycle state of a descriptor.
///
/// `RolledBack` and `Skipped` are only produced by operator repair workflows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MigrationState {
    #[default]
    Pending,
    Executed,
    Failed,
    RolledBack,
    Skipped,
    Unknown,
}

impl fmt::Display for MigrationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MigrationState::Pending => "pending",
            MigrationState::Executed => "executed",
            MigrationState::Failed => "failed",
            MigrationState::RolledBack => "rolled_back",
            MigrationState::Skipped => "skipped",
            MigrationState::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// One discovered migration or seed script.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MigrationDescriptor {
    /// Canonical identifier, unique within a script source
    pub name: String,

    /// Display name (`V<version>__<description>.sql`)
    pub file_name: String,

    /// Raw script body
    #[serde(skip)]
    pub content: String,

    /// Version parsed from the file name, `0` when the name does not conform
    pub version: u32,

    /// Human description derived from the file name
    pub description: Option<String>,

    /// Hex SHA-256 of `content`
    pub checksum: String,

    /// Which journal this script belongs to
    pub kind: ScriptKind,

    /// Execution state
    pub state: MigrationState,

    /// When the script was applied
    pub executed_at: Option<NaiveDateTime>,

    /// Who applied the script
    pub executed_by: Option<String>,

    /// How long the transactional unit took
    pub execution_time: Option<Duration>,

    /// Error text of the last failed attempt
    pub error_message: Option<String>,
}

impl MigrationDescriptor {
    /// Build a pending descriptor from a source name and its content.
    ///
    /// Never fails: non-conforming names fall back to version `0` with no
    /// description so that discovery of other scripts is not blocked.
    pub fn from_source(kind: ScriptKind, name: &str, content: String) -> Self {
        let file_name = file_name_from_name(name).to_string();
        let (version, description) = parse_file_name(&file_name, kind.prefix());
        let checksum = compute_checksum(&content);
        Self {
            name: name.to_string(),
            file_name,
            content,
            version,
            description,
            checksum,
            kind,
            state: MigrationState::Pending,
            executed_at: None,
            executed_by: None,
            execution_time: None,
            error_message: None,
        }
    }

    /// Copy of this descriptor marked as successfully executed.
    pub fn into_executed(
        self,
        executed_at: Option<NaiveDateTime>,
        executed_by: Option<String>,
        execution_time: Option<Duration>,
    ) -> Self {
        Self {
            state: MigrationState::Executed,
            executed_at,
            executed_by,
            execution_time,
            error_message: None,
            ..self
        }
    }

    /// Copy of this descriptor marked as failed with `message`.
    pub fn into_failed(self, message: impl Into<String>) -> Self {
        Self {
            state: MigrationState::Failed,
            error_message: Some(message.into()),
            ..self
        }
    }

    /// Whether the script body is blank.
    pub fn is_empty(&self) -> bool {
        self.content.trim().is_empty()
    }
}

/// Last `/`-separated segment of a source name.
pub fn file_name_from_name(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}

/// Parse `V<digits>__<description>.sql` into `(version, description)`.
///
/// The stem is split on the first `__`. The left part must start with
/// `prefix` followed by a non-negative integer; otherwise the result is
/// `(0, None)`. Underscores in the description become spaces.
pub fn parse_file_name(file_name: &str, prefix: char) -> (u32, Option<String>) {
    let stem = Path::new(file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(file_name);

    let Some((left, right)) = stem.split_once(NAME_SEPARATOR) else {
        return (0, None);
    };

    let Some(digits) = left.strip_prefix(prefix) else {
        return (0, None);
    };

    let Ok(version) = digits.parse::<u32>() else {
        return (0, None);
    };

    let description = right.replace('_', " ");
    if description.trim().is_empty() {
        (version, None)
    } else {
        (version, Some(description))
    }
}

/// Parse a `--target` value such as `V002`, `v2` or `002`.
pub fn parse_target_version(value: &str) -> CoreResult<u32> {
    let trimmed = value.trim();
    let digits = trimmed
        .strip_prefix('V')
        .or_else(|| trimmed.strip_prefix('v'))
        .unwrap_or(trimmed);
    digits
        .parse::<u32>()
        .map_err(|_| CoreError::InvalidTargetVersion {
            value: value.to_string(),
        })
}

#[cfg(test)]
#[path = "migration_test.rs"]
mod tests;
