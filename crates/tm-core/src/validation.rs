//! Validation outcome types shared by the engine and the CLI.

use serde::Serialize;
use std::fmt;

/// A blocking validation problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    pub message: String,
}

/// A non-blocking validation finding (e.g. a destructive statement).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationWarning {
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Result of validating one script.
///
/// Fields are private so that `is_valid()` can never disagree with the
/// error list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    errors: Vec<ValidationError>,
    warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    /// An empty, valid result.
    pub fn valid() -> Self {
        Self::default()
    }

    /// A result holding a single error.
    pub fn invalid(message: impl Into<String>) -> Self {
        let mut result = Self::default();
        result.add_error(message);
        result
    }

    pub fn add_error(&mut self, message: impl Into<String>) {
        self.errors.push(ValidationError {
            message: message.into(),
        });
    }

    pub fn add_warning(&mut self, message: impl Into<String>) {
        self.warnings.push(ValidationWarning {
            message: message.into(),
        });
    }

    /// `true` exactly when there are no errors.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    pub fn warnings(&self) -> &[ValidationWarning] {
        &self.warnings
    }

    /// All error messages joined with `"; "`.
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.message.as_str())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validity_tracks_errors() {
        let mut result = ValidationResult::valid();
        assert!(result.is_valid());

        result.add_warning("Migration contains TRUNCATE TABLE statement");
        assert!(result.is_valid());
        assert_eq!(result.warnings().len(), 1);

        result.add_error("Migration content is empty");
        assert!(!result.is_valid());
        assert_eq!(result.error_summary(), "Migration content is empty");
    }

    #[test]
    fn test_invalid_constructor() {
        let result = ValidationResult::invalid("Validation error: boom");
        assert!(!result.is_valid());
        assert_eq!(result.errors()[0].to_string(), "Validation error: boom");
    }
}
