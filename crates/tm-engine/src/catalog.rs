//! Migration catalog: discovery and the executed/pending partition.

use crate::error::EngineResult;
use crate::journal::Journal;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tm_core::migration::SQL_EXTENSION;
use tm_core::{MigrationDescriptor, MigrationSettings, ScriptKind, ScriptSource};
use tm_db::Database;

/// Result of a best-effort journal mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JournalWrite {
    Written,
    Failed(String),
}

impl JournalWrite {
    pub fn is_written(&self) -> bool {
        matches!(self, JournalWrite::Written)
    }
}

/// Enumerates the scripts of one family and partitions them against its
/// journal.
///
/// Descriptors are rebuilt from the source on every call; the journal is the
/// only record of what has been applied.
pub struct MigrationCatalog {
    source: Arc<dyn ScriptSource>,
    db: Arc<dyn Database>,
    journal: Journal,
    kind: ScriptKind,
    pattern: String,
    create_journal_table: bool,
}

impl MigrationCatalog {
    pub fn new(
        source: Arc<dyn ScriptSource>,
        db: Arc<dyn Database>,
        settings: &MigrationSettings,
        kind: ScriptKind,
    ) -> Self {
        Self {
            source,
            db,
            journal: Journal::for_kind(settings, kind),
            kind,
            pattern: settings.pattern_for(kind).to_string(),
            create_journal_table: settings.create_journal_table,
        }
    }

    pub fn kind(&self) -> ScriptKind {
        self.kind
    }

    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    /// Every script matching the family's pattern, ascending by version.
    pub fn get_all_migrations(&self) -> EngineResult<Vec<MigrationDescriptor>> {
        discover_scripts(self.source.as_ref(), self.kind, &self.pattern)
    }

    /// Split all scripts into `(executed, pending)` by journal name lookup.
    async fn partition(&self) -> EngineResult<(Vec<MigrationDescriptor>, Vec<MigrationDescriptor>)> {
        let all = self.get_all_migrations()?;
        let applied = self.journal.applied(self.db.as_ref()).await?;

        let mut executed = Vec::new();
        let mut pending = Vec::new();
        for descriptor in all {
            match applied.get(&descriptor.name.to_lowercase()) {
                Some(entry) => executed.push(descriptor.into_executed(
                    entry.applied_at,
                    entry.applied_by.clone(),
                    entry.execution_time,
                )),
                None => pending.push(descriptor),
            }
        }
        Ok((executed, pending))
    }

    /// Scripts whose name is recorded in the journal.
    pub async fn get_executed_migrations(&self) -> EngineResult<Vec<MigrationDescriptor>> {
        let (executed, _) = self.partition().await?;
        Ok(executed)
    }

    /// Scripts whose name is not recorded in the journal.
    pub async fn get_pending_migrations(&self) -> EngineResult<Vec<MigrationDescriptor>> {
        let (_, pending) = self.partition().await?;
        Ok(pending)
    }

    /// Case-insensitive lookup by name or file name.
    pub fn get_migration_by_name(&self, name: &str) -> EngineResult<Option<MigrationDescriptor>> {
        Ok(self.get_all_migrations()?.into_iter().find(|d| {
            d.name.eq_ignore_ascii_case(name) || d.file_name.eq_ignore_ascii_case(name)
        }))
    }

    /// Record `descriptor` as applied without running it.
    ///
    /// The journal table is only created when `create_journal_table` is set.
    pub async fn mark_migration_as_executed(
        &self,
        descriptor: &MigrationDescriptor,
        executed_by: &str,
    ) -> JournalWrite {
        let db = self.db.as_ref();
        let ensured = if self.create_journal_table {
            self.journal.ensure(db).await
        } else {
            Ok(())
        };
        let result = match ensured {
            Ok(()) => self
                .journal
                .record(db, descriptor, executed_by, Duration::ZERO, Utc::now().naive_utc())
                .await
                .map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };
        match result {
            Ok(()) => {
                log::info!("Marked {} as executed in {}", descriptor.name, self.journal);
                JournalWrite::Written
            }
            Err(e) => {
                log::error!("Failed to mark {} as executed: {e}", descriptor.name);
                JournalWrite::Failed(e)
            }
        }
    }

    /// Delete the journal row for `name`.
    pub async fn remove_migration_from_journal(&self, name: &str) -> JournalWrite {
        match self.journal.remove(self.db.as_ref(), name).await {
            Ok(0) => {
                let message = format!("'{name}' is not recorded in {}", self.journal);
                log::warn!("{message}");
                JournalWrite::Failed(message)
            }
            Ok(_) => {
                log::info!("Removed {name} from {}", self.journal);
                JournalWrite::Written
            }
            Err(e) => {
                log::error!("Failed to remove {name} from {}: {e}", self.journal);
                JournalWrite::Failed(e.to_string())
            }
        }
    }
}

/// Scripts of `kind` whose names start with `pattern` and end in `.sql`,
/// ascending by version.
///
/// Unreadable scripts are logged and left out. Names that do not follow the
/// `V<digits>__<description>.sql` convention are kept as version 0. Equal
/// versions keep source order.
pub fn discover_scripts(
    source: &dyn ScriptSource,
    kind: ScriptKind,
    pattern: &str,
) -> EngineResult<Vec<MigrationDescriptor>> {
    let mut descriptors: Vec<MigrationDescriptor> = source
        .list()?
        .into_iter()
        .filter(|name| name.starts_with(pattern) && name.ends_with(SQL_EXTENSION))
        .filter_map(|name| match source.read(&name) {
            Ok(content) => Some(MigrationDescriptor::from_source(kind, &name, content)),
            Err(e) => {
                log::warn!("Skipping {kind} script '{name}': {e}");
                None
            }
        })
        .collect();
    descriptors.sort_by_key(|d| d.version);
    log::debug!(
        "Discovered {} {kind} scripts in {}",
        descriptors.len(),
        source.describe()
    );
    Ok(descriptors)
}

#[cfg(test)]
#[path = "catalog_test.rs"]
mod tests;
