use super::*;

#[tokio::test]
async fn test_in_memory() {
    let db = DuckDbBackend::in_memory().unwrap();
    assert_eq!(db.db_type(), "duckdb");
    db.ping().await.unwrap();
}

#[tokio::test]
async fn test_new_handles_memory_and_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("target.duckdb");
    let db = DuckDbBackend::new(path.to_str().unwrap()).unwrap();
    db.execute_batch("CREATE TABLE t (id INT)").await.unwrap();
    assert!(path.exists());

    let mem = DuckDbBackend::new(":memory:").unwrap();
    assert!(!mem.relation_exists("t").await.unwrap());
}

#[tokio::test]
async fn test_open_unreachable_path_is_connection_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("no_such_dir").join("db.duckdb");
    let err = DuckDbBackend::from_path(&path).err().unwrap();
    assert!(err.is_connectivity());
}

#[tokio::test]
async fn test_execute_batch() {
    let db = DuckDbBackend::in_memory().unwrap();
    db.execute_batch(
        "CREATE TABLE t1 (id INT); CREATE TABLE t2 (id INT); INSERT INTO t1 VALUES (1);",
    )
    .await
    .unwrap();

    assert!(db.relation_exists("t1").await.unwrap());
    assert!(db.relation_exists("t2").await.unwrap());
}

#[tokio::test]
async fn test_execute_returns_affected_rows() {
    let db = DuckDbBackend::in_memory().unwrap();
    db.execute_batch("CREATE TABLE t (id INT)").await.unwrap();
    let affected = db
        .execute("INSERT INTO t VALUES (1), (2), (3)")
        .await
        .unwrap();
    assert_eq!(affected, 3);
}

#[tokio::test]
async fn test_execute_error_keeps_database_message() {
    let db = DuckDbBackend::in_memory().unwrap();
    let err = db.execute_batch("SELEC 1").await.unwrap_err();
    assert!(matches!(err, DbError::ExecutionError(_)));
    assert!(err.to_string().contains("[D002]"));
}

#[tokio::test]
async fn test_query_rows_returns_text_and_nulls() {
    let db = DuckDbBackend::in_memory().unwrap();
    db.execute_batch(
        "CREATE TABLE people (name VARCHAR, nick VARCHAR);
         INSERT INTO people VALUES ('ada', NULL), ('grace', 'amazing');",
    )
    .await
    .unwrap();

    let rows = db
        .query_rows("SELECT name, nick FROM people ORDER BY name")
        .await
        .unwrap();
    assert_eq!(
        rows,
        vec![
            vec![Some("ada".to_string()), None],
            vec![Some("grace".to_string()), Some("amazing".to_string())],
        ]
    );
}

#[tokio::test]
async fn test_relation_not_exists() {
    let db = DuckDbBackend::in_memory().unwrap();
    assert!(!db.relation_exists("nonexistent").await.unwrap());
}

#[tokio::test]
async fn test_create_schema_if_not_exists() {
    let db = DuckDbBackend::in_memory().unwrap();

    db.create_schema_if_not_exists("ops").await.unwrap();
    db.execute_batch("CREATE TABLE ops.journal (id INT)")
        .await
        .unwrap();
    assert!(db.relation_exists("ops.journal").await.unwrap());

    // Creating the same schema again should not fail (IF NOT EXISTS)
    db.create_schema_if_not_exists("ops").await.unwrap();
}

#[tokio::test]
async fn test_rollback_discards_changes() {
    let db = DuckDbBackend::in_memory().unwrap();
    db.execute_batch("CREATE TABLE t (id INT)").await.unwrap();

    db.begin(IsolationLevel::ReadCommitted).await.unwrap();
    db.execute_batch("INSERT INTO t VALUES (1)").await.unwrap();
    db.rollback().await.unwrap();

    let rows = db
        .query_rows("SELECT CAST(COUNT(*) AS VARCHAR) FROM t")
        .await
        .unwrap();
    assert_eq!(rows[0][0].as_deref(), Some("0"));
}

#[tokio::test]
async fn test_commit_without_begin_fails() {
    let db = DuckDbBackend::in_memory().unwrap();
    let err = db.commit().await.unwrap_err();
    assert!(matches!(err, DbError::TransactionError(_)));
}

#[tokio::test]
async fn test_open_existing_rejects_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.duckdb");
    let err = DuckDbBackend::open_existing(path.to_str().unwrap())
        .err()
        .unwrap();
    assert!(err.is_connectivity());
    assert!(!path.exists());

    DuckDbBackend::new(path.to_str().unwrap()).unwrap();
    DuckDbBackend::open_existing(path.to_str().unwrap()).unwrap();
    DuckDbBackend::open_existing(":memory:").unwrap();
}

#[tokio::test]
async fn test_interrupt_aborts_running_statement() {
    let db = std::sync::Arc::new(DuckDbBackend::in_memory().unwrap());
    let started = std::time::Instant::now();

    let mut running = {
        let db = std::sync::Arc::clone(&db);
        tokio::spawn(async move {
            db.execute_batch("SELECT count(*) FROM range(10000000) t1, range(1000000) t2")
                .await
        })
    };
    // Keep interrupting until the statement gives up.
    let result = loop {
        tokio::select! {
            joined = &mut running => break joined.unwrap(),
            _ = tokio::time::sleep(std::time::Duration::from_millis(100)) => db.interrupt(),
        }
    };

    let err = result.unwrap_err();
    assert!(err.to_string().contains("INTERRUPT"), "{err}");
    assert!(started.elapsed() < std::time::Duration::from_secs(10));
    db.ping().await.unwrap();
}
