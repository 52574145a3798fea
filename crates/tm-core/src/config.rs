//! Configuration types and parsing for tidemark.yml

use crate::error::{CoreError, CoreResult};
use crate::migration::ScriptKind;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

/// Default configuration file name
pub const CONFIG_FILE_NAME: &str = "tidemark.yml";

/// Main configuration from tidemark.yml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Target database connection
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Journal and script discovery settings
    #[serde(default)]
    pub migrations: MigrationSettings,
}

/// Transaction isolation requested for each migration unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum IsolationLevel {
    ReadUncommitted,
    #[default]
    ReadCommitted,
    RepeatableRead,
    Serializable,
    Snapshot,
}

impl fmt::Display for IsolationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IsolationLevel::ReadUncommitted => write!(f, "read uncommitted"),
            IsolationLevel::ReadCommitted => write!(f, "read committed"),
            IsolationLevel::RepeatableRead => write!(f, "repeatable read"),
            IsolationLevel::Serializable => write!(f, "serializable"),
            IsolationLevel::Snapshot => write!(f, "snapshot"),
        }
    }
}

/// Database connection configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// DuckDB database path, or `:memory:`
    #[serde(default)]
    pub connection_string: String,

    /// Isolation level for migration transactions
    #[serde(default)]
    pub isolation_level: IsolationLevel,
}

/// Journal, transaction, and discovery settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MigrationSettings {
    /// Table recording applied migrations
    #[serde(default = "default_journal_table")]
    pub journal_table: String,

    /// Schema holding both journal tables
    #[serde(default = "default_journal_schema")]
    pub journal_schema: String,

    /// Table recording applied seeds
    #[serde(default = "default_seed_journal_table")]
    pub seed_journal_table: String,

    /// Create journal schema/tables when missing
    #[serde(default = "default_true")]
    pub create_journal_table: bool,

    /// Wrap script + journal write in one transaction
    #[serde(default = "default_true")]
    pub transaction_per_script: bool,

    /// Upper bound for one migration unit, in seconds
    #[serde(default = "default_command_timeout")]
    pub command_timeout_secs: u64,

    /// Name prefix selecting migration scripts in the script source
    #[serde(default = "default_migration_pattern")]
    pub migration_pattern: String,

    /// Name prefix selecting seed scripts in the script source
    #[serde(default = "default_seed_pattern")]
    pub seed_pattern: String,

    /// Render scripts as templates before execution
    #[serde(default)]
    pub variables_enabled: bool,

    /// Template variables
    #[serde(default)]
    pub variables: HashMap<String, serde_yaml::Value>,
}

fn default_true() -> bool {
    true
}

fn default_journal_table() -> String {
    "schema_versions".to_string()
}

fn default_journal_schema() -> String {
    "main".to_string()
}

fn default_seed_journal_table() -> String {
    "seed_versions".to_string()
}

fn default_command_timeout() -> u64 {
    30
}

fn default_migration_pattern() -> String {
    "migrations/V".to_string()
}

fn default_seed_pattern() -> String {
    "seeds/S".to_string()
}

impl Default for MigrationSettings {
    fn default() -> Self {
        Self {
            journal_table: default_journal_table(),
            journal_schema: default_journal_schema(),
            seed_journal_table: default_seed_journal_table(),
            create_journal_table: true,
            transaction_per_script: true,
            command_timeout_secs: default_command_timeout(),
            migration_pattern: default_migration_pattern(),
            seed_pattern: default_seed_pattern(),
            variables_enabled: false,
            variables: HashMap::new(),
        }
    }
}

impl MigrationSettings {
    /// Journal table name for a script family
    pub fn journal_table_for(&self, kind: ScriptKind) -> &str {
        match kind {
            ScriptKind::Migration => &self.journal_table,
            ScriptKind::Seed => &self.seed_journal_table,
        }
    }

    /// Name prefix for a script family
    pub fn pattern_for(&self, kind: ScriptKind) -> &str {
        match kind {
            ScriptKind::Migration => &self.migration_pattern,
            ScriptKind::Seed => &self.seed_pattern,
        }
    }
}

impl Config {
    /// Load configuration from a file path
    ///
    /// Connection settings may still be overridden afterwards, so callers
    /// run [`Config::validate`] once all overrides are applied.
    pub fn load(path: &Path) -> CoreResult<Self> {
        if !path.exists() {
            return Err(CoreError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| CoreError::IoWithPath {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML text
    pub fn from_yaml(content: &str) -> CoreResult<Self> {
        serde_yaml::from_str(content).map_err(|e| CoreError::ConfigParseError {
            message: e.to_string(),
        })
    }

    /// Load `tidemark.yml` from `dir` if it exists, otherwise defaults
    pub fn load_or_default(dir: &Path) -> CoreResult<Self> {
        let path = dir.join(CONFIG_FILE_NAME);
        if path.exists() {
            log::debug!("Loading config from {}", path.display());
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> CoreResult<()> {
        if self.database.connection_string.trim().is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "Connection string is required (set database.connection_string or pass --connection-string)".to_string(),
            });
        }

        let m = &self.migrations;
        for (field, value) in [
            ("journal_table", &m.journal_table),
            ("journal_schema", &m.journal_schema),
            ("seed_journal_table", &m.seed_journal_table),
        ] {
            if !is_identifier(value) {
                return Err(CoreError::ConfigInvalid {
                    message: format!(
                        "{field} '{value}' must be non-empty and contain only alphanumeric characters and underscores"
                    ),
                });
            }
        }

        if m.journal_table.eq_ignore_ascii_case(&m.seed_journal_table) {
            return Err(CoreError::ConfigInvalid {
                message: "journal_table and seed_journal_table must differ".to_string(),
            });
        }

        if m.command_timeout_secs == 0 {
            return Err(CoreError::ConfigInvalid {
                message: "command_timeout_secs must be greater than zero".to_string(),
            });
        }

        if m.migration_pattern.is_empty() || m.seed_pattern.is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "migration_pattern and seed_pattern cannot be empty".to_string(),
            });
        }

        Ok(())
    }
}

fn is_identifier(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
