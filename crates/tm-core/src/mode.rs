//! Execution mode selection.

use serde::Serialize;
use std::fmt;

/// How a run treats validation and the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// Validate, then execute
    #[default]
    Normal,
    /// Plan only; never touches the database
    DryRun,
    /// Skip validation and execute
    Force,
    /// Like `Normal` with extra reporting
    Verbose,
}

impl ExecutionMode {
    /// Pick a mode from CLI flags. Dry run wins over force, force over verbose.
    pub fn from_flags(dry_run: bool, force: bool, verbose: bool) -> Self {
        if dry_run {
            ExecutionMode::DryRun
        } else if force {
            ExecutionMode::Force
        } else if verbose {
            ExecutionMode::Verbose
        } else {
            ExecutionMode::Normal
        }
    }

    pub fn is_dry_run(self) -> bool {
        self == ExecutionMode::DryRun
    }

    /// Whether validation errors block execution.
    pub fn validates(self) -> bool {
        self != ExecutionMode::Force
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionMode::Normal => write!(f, "normal"),
            ExecutionMode::DryRun => write!(f, "dry-run"),
            ExecutionMode::Force => write!(f, "force"),
            ExecutionMode::Verbose => write!(f, "verbose"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_flags_precedence() {
        assert_eq!(
            ExecutionMode::from_flags(true, true, true),
            ExecutionMode::DryRun
        );
        assert_eq!(
            ExecutionMode::from_flags(false, true, true),
            ExecutionMode::Force
        );
        assert_eq!(
            ExecutionMode::from_flags(false, false, true),
            ExecutionMode::Verbose
        );
        assert_eq!(
            ExecutionMode::from_flags(false, false, false),
            ExecutionMode::Normal
        );
    }

    #[test]
    fn test_only_force_skips_validation() {
        assert!(ExecutionMode::Normal.validates());
        assert!(ExecutionMode::Verbose.validates());
        assert!(ExecutionMode::DryRun.validates());
        assert!(!ExecutionMode::Force.validates());
    }
}
