//! Transaction scope helper.

use crate::error::{DbError, DbResult};
use crate::traits::Database;
use std::future::Future;
use std::time::Duration;
use tm_core::IsolationLevel;

/// Execute `body` between `BEGIN` and `COMMIT`, rolling back on error.
///
/// When `timeout` is set and the body has not finished by then, the body is
/// dropped and the running statement interrupted. The transaction is then
/// rolled back and [`DbError::Timeout`] is returned. The body's own error is returned unchanged so the database
/// message reaches the caller.
pub async fn with_transaction<'a, T, F, Fut>(
    db: &'a dyn Database,
    isolation: IsolationLevel,
    timeout: Option<Duration>,
    body: F,
) -> DbResult<T>
where
    F: FnOnce(&'a dyn Database) -> Fut,
    Fut: Future<Output = DbResult<T>> + 'a,
{
    db.begin(isolation).await?;

    let result = match timeout {
        Some(limit) => match tokio::time::timeout(limit, body(db)).await {
            Ok(result) => result,
            Err(_) => {
                log::warn!("Transaction exceeded {}ms, interrupting", limit.as_millis());
                db.interrupt();
                Err(DbError::Timeout(limit))
            }
        },
        None => body(db).await,
    };

    match result {
        Ok(value) => {
            if let Err(commit_err) = db.commit().await {
                rollback_quietly(db).await;
                return Err(commit_err);
            }
            log::debug!("Transaction committed");
            Ok(value)
        }
        Err(err) => {
            log::debug!("Transaction failed, rolling back: {err}");
            rollback_quietly(db).await;
            Err(err)
        }
    }
}

async fn rollback_quietly(db: &dyn Database) {
    if let Err(e) = db.rollback().await {
        log::error!("Rollback failed: {e}");
    }
}
