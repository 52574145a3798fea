//! Per-run execution context.

use std::collections::HashMap;
use std::sync::Arc;
use tm_core::ExecutionMode;
use tm_db::Database;
use tokio_util::sync::CancellationToken;

/// Named values substituted into scripts when templating is enabled.
pub type Variables = HashMap<String, serde_yaml::Value>;

/// Everything one invocation needs to plan and apply scripts.
///
/// Built once per command and never persisted.
pub struct ExecutionContext {
    /// Target connection
    pub db: Arc<dyn Database>,

    /// How scripts are applied
    pub mode: ExecutionMode,

    /// Extra reporting, e.g. validating scripts during a dry run
    pub verbose: bool,

    /// Highest version to consider, inclusive
    pub target_version: Option<u32>,

    /// Template variables; `None` disables templating
    pub variables: Option<Variables>,

    /// Recorded in the journal as `applied_by`
    pub executed_by: String,

    /// Cooperative cancellation shared with the caller
    pub cancel: CancellationToken,
}

impl ExecutionContext {
    /// Context in `Normal` mode with no target, no templating and a fresh token.
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self {
            db,
            mode: ExecutionMode::Normal,
            verbose: false,
            target_version: None,
            variables: None,
            executed_by: default_executed_by(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_target_version(mut self, target: Option<u32>) -> Self {
        self.target_version = target;
        self
    }

    pub fn with_variables(mut self, variables: Option<Variables>) -> Self {
        self.variables = variables;
        self
    }

    pub fn with_executed_by(mut self, executed_by: impl Into<String>) -> Self {
        self.executed_by = executed_by.into();
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Whether `version` falls under the target ceiling.
    pub fn within_target(&self, version: u32) -> bool {
        self.target_version.is_none_or(|target| version <= target)
    }
}

/// Operating system user, falling back to `tidemark`.
pub fn default_executed_by() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "tidemark".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::RecordingDatabase;

    #[test]
    fn test_within_target() {
        let ctx = ExecutionContext::new(Arc::new(RecordingDatabase::new()));
        assert!(ctx.within_target(999));

        let ctx = ctx.with_target_version(Some(2));
        assert!(ctx.within_target(1));
        assert!(ctx.within_target(2));
        assert!(!ctx.within_target(3));
    }

    #[test]
    fn test_cancel_token_is_shared() {
        let token = CancellationToken::new();
        let ctx =
            ExecutionContext::new(Arc::new(RecordingDatabase::new())).with_cancel(token.clone());
        assert!(!ctx.is_cancelled());
        token.cancel();
        assert!(ctx.is_cancelled());
    }
}
