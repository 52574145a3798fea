use super::*;
use crate::test_utils::RecordingDatabase;
use tm_core::{MemorySource, MigrationState};
use tm_db::DuckDbBackend;

fn source() -> MemorySource {
    MemorySource::new()
        .with_script("migrations/V003__add_index.sql", "CREATE INDEX i ON m (id);")
        .with_script("migrations/V001__create_members.sql", "CREATE TABLE m (id INT);")
        .with_script("migrations/V002__add_email.sql", "ALTER TABLE m ADD COLUMN email VARCHAR;")
        .with_script("seeds/S001__roles.sql", "INSERT INTO roles VALUES (1);")
        .with_script("migrations/README.md", "not a script")
}

fn catalog(source: MemorySource, db: Arc<dyn Database>, kind: ScriptKind) -> MigrationCatalog {
    MigrationCatalog::new(Arc::new(source), db, &MigrationSettings::default(), kind)
}

fn names(descriptors: &[MigrationDescriptor]) -> Vec<&str> {
    descriptors.iter().map(|d| d.file_name.as_str()).collect()
}

#[test]
fn test_get_all_filters_by_pattern_and_sorts() {
    let cat = catalog(source(), Arc::new(RecordingDatabase::new()), ScriptKind::Migration);
    let all = cat.get_all_migrations().unwrap();
    assert_eq!(
        names(&all),
        vec![
            "V001__create_members.sql",
            "V002__add_email.sql",
            "V003__add_index.sql"
        ]
    );
    assert!(all.iter().all(|d| d.state == MigrationState::Pending));
}

#[test]
fn test_seed_catalog_uses_seed_pattern() {
    let cat = catalog(source(), Arc::new(RecordingDatabase::new()), ScriptKind::Seed);
    let all = cat.get_all_migrations().unwrap();
    assert_eq!(names(&all), vec!["S001__roles.sql"]);
    assert_eq!(all[0].version, 1);
    assert_eq!(cat.journal().to_string(), "main.seed_versions");
}

#[test]
fn test_discover_scripts_with_custom_pattern() {
    let source = MemorySource::new()
        .with_script("db/up/V002__b.sql", "SELECT 2;")
        .with_script("db/up/V001__a.sql", "SELECT 1;")
        .with_script("migrations/V001__other.sql", "SELECT 3;");
    let found = discover_scripts(&source, ScriptKind::Migration, "db/up/V").unwrap();
    assert_eq!(names(&found), vec!["V001__a.sql", "V002__b.sql"]);
}

#[test]
fn test_unreadable_script_is_skipped() {
    let src = source().with_unreadable("migrations/V004__broken.sql");
    let cat = catalog(src, Arc::new(RecordingDatabase::new()), ScriptKind::Migration);
    let all = cat.get_all_migrations().unwrap();
    assert_eq!(all.len(), 3);
    assert!(all.iter().all(|d| d.version != 4));
}

#[test]
fn test_nonconforming_name_kept_as_version_zero() {
    let src = source().with_script("migrations/Vbaseline.sql", "SELECT 1;");
    let cat = catalog(src, Arc::new(RecordingDatabase::new()), ScriptKind::Migration);
    let all = cat.get_all_migrations().unwrap();
    assert_eq!(all.len(), 4);
    assert_eq!(all[0].file_name, "Vbaseline.sql");
    assert_eq!(all[0].version, 0);
    assert_eq!(all[0].description, None);
}

#[test]
fn test_get_migration_by_name() {
    let cat = catalog(source(), Arc::new(RecordingDatabase::new()), ScriptKind::Migration);
    let found = cat
        .get_migration_by_name("MIGRATIONS/v002__ADD_EMAIL.SQL")
        .unwrap()
        .unwrap();
    assert_eq!(found.version, 2);

    let by_file = cat.get_migration_by_name("v001__create_members.sql").unwrap();
    assert_eq!(by_file.map(|d| d.version), Some(1));

    assert!(cat.get_migration_by_name("V999__nope.sql").unwrap().is_none());
}

#[tokio::test]
async fn test_fresh_database_has_everything_pending() {
    let db: Arc<dyn Database> = Arc::new(DuckDbBackend::in_memory().unwrap());
    let cat = catalog(source(), db, ScriptKind::Migration);
    assert!(cat.get_executed_migrations().await.unwrap().is_empty());
    assert_eq!(cat.get_pending_migrations().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_partition_by_journal_name() {
    let db: Arc<dyn Database> = Arc::new(DuckDbBackend::in_memory().unwrap());
    let cat = catalog(source(), db, ScriptKind::Migration);
    let v001 = cat
        .get_migration_by_name("V001__create_members.sql")
        .unwrap()
        .unwrap();

    assert!(cat.mark_migration_as_executed(&v001, "ops").await.is_written());

    let executed = cat.get_executed_migrations().await.unwrap();
    let pending = cat.get_pending_migrations().await.unwrap();
    assert_eq!(names(&executed), vec!["V001__create_members.sql"]);
    assert_eq!(executed[0].state, MigrationState::Executed);
    assert_eq!(executed[0].executed_by.as_deref(), Some("ops"));
    assert!(executed[0].executed_at.is_some());
    assert_eq!(
        names(&pending),
        vec!["V002__add_email.sql", "V003__add_index.sql"]
    );
}

#[tokio::test]
async fn test_remove_migration_from_journal() {
    let db: Arc<dyn Database> = Arc::new(DuckDbBackend::in_memory().unwrap());
    let cat = catalog(source(), db, ScriptKind::Migration);
    let v002 = cat
        .get_migration_by_name("V002__add_email.sql")
        .unwrap()
        .unwrap();
    assert!(cat.mark_migration_as_executed(&v002, "ops").await.is_written());

    assert!(cat
        .remove_migration_from_journal(&v002.name.to_uppercase())
        .await
        .is_written());
    assert_eq!(cat.get_pending_migrations().await.unwrap().len(), 3);

    let again = cat.remove_migration_from_journal(&v002.name).await;
    assert!(matches!(again, JournalWrite::Failed(_)));
}

#[tokio::test]
async fn test_journal_write_failure_is_reported_not_raised() {
    let db: Arc<dyn Database> = Arc::new(RecordingDatabase::new().failing_on("INSERT INTO"));
    let cat = catalog(source(), db, ScriptKind::Migration);
    let v001 = cat.get_all_migrations().unwrap().remove(0);
    match cat.mark_migration_as_executed(&v001, "ops").await {
        JournalWrite::Failed(message) => assert!(message.contains("stub failure")),
        JournalWrite::Written => panic!("expected a failed journal write"),
    }
}

#[tokio::test]
async fn test_mark_leaves_journal_creation_to_the_operator_when_disabled() {
    let db = Arc::new(RecordingDatabase::new());
    let settings = MigrationSettings {
        create_journal_table: false,
        ..MigrationSettings::default()
    };
    let cat = MigrationCatalog::new(
        Arc::new(source()),
        db.clone(),
        &settings,
        ScriptKind::Migration,
    );
    let v001 = cat.get_all_migrations().unwrap().remove(0);

    assert!(cat.mark_migration_as_executed(&v001, "ops").await.is_written());
    assert!(!db
        .calls()
        .iter()
        .any(|c| matches!(c, crate::test_utils::Call::CreateSchema(_))));
    let statements = db.statements();
    assert_eq!(statements.len(), 1);
    assert!(statements[0].starts_with("INSERT INTO"));
}

#[tokio::test]
async fn test_mark_against_missing_journal_fails_when_creation_disabled() {
    let db: Arc<dyn Database> = Arc::new(DuckDbBackend::in_memory().unwrap());
    let settings = MigrationSettings {
        create_journal_table: false,
        ..MigrationSettings::default()
    };
    let cat = MigrationCatalog::new(
        Arc::new(source()),
        db.clone(),
        &settings,
        ScriptKind::Migration,
    );
    let v001 = cat.get_all_migrations().unwrap().remove(0);

    assert!(!cat.mark_migration_as_executed(&v001, "ops").await.is_written());
    assert!(!db.relation_exists("main.schema_versions").await.unwrap());
}

#[tokio::test]
async fn test_missing_directory_is_source_error() {
    let dir = tempfile::tempdir().unwrap();
    let cat = MigrationCatalog::new(
        Arc::new(tm_core::DirectorySource::new(dir.path().join("missing"))),
        Arc::new(RecordingDatabase::new()),
        &MigrationSettings::default(),
        ScriptKind::Migration,
    );
    let err = cat.get_pending_migrations().await.unwrap_err();
    assert!(matches!(err, crate::EngineError::Source(_)));
}
