//! Error types for pipeline runs.
//!
//! Only two conditions are fatal to a run: input that cannot be coerced into
//! the typed record set, and a blocking quality verdict at the input stage.
//! Advisory violations are never errors; they travel in
//! [`CheckResult`](crate::quality::CheckResult) sequences instead.

use thiserror::Error;
use uuid::Uuid;

use crate::pipeline::RunState;
use crate::quality::{CheckResult, CheckStage};

/// Main error type for epiwatch operations.
#[derive(Debug, Error)]
pub enum EpiwatchError {
    /// A field could not be coerced into its canonical type
    #[error("Malformed input at row {row}, field '{field}': {reason}")]
    MalformedInput {
        /// Zero-based row index in the loaded record set
        row: usize,
        /// Canonical field name
        field: String,
        /// What made the value uncoercible
        reason: String,
    },

    /// A required column is absent from every row
    #[error("Malformed input: required column '{field}' not found (accepted names: {accepted:?})")]
    MissingColumn {
        /// Canonical field name
        field: String,
        /// Header names that would have been accepted
        accepted: Vec<String>,
    },

    /// A blocking rule failed and the run was aborted
    #[error(
        "Blocking quality violation: rule '{rule}' failed for {affected_rows} row(s) at {stage} stage"
    )]
    BlockingQualityViolation {
        /// Name of the rule that triggered the abort
        rule: String,
        /// Number of rows the rule flagged
        affected_rows: u64,
        /// Stage the rule ran in
        stage: CheckStage,
        /// Every check result of the stage, for the report
        checks: Vec<CheckResult>,
        /// Identifier of the aborted run
        run_id: Uuid,
        /// States visited by the run, ending in `Aborted`
        state_trail: Vec<RunState>,
    },

    /// The run state machine was driven out of order
    #[error("Invalid pipeline transition from {from} to {to}")]
    InvalidTransition {
        /// Current state
        from: RunState,
        /// Requested state
        to: RunState,
    },

    /// Integer overflow while aggregating a window
    #[error("Arithmetic overflow: {context}")]
    Arithmetic { context: String },

    /// Configuration or validation error
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Serialization or deserialization failed
    #[error("Serialization failed: {context}")]
    Serialization {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Convenience type alias for Results with EpiwatchError
pub type Result<T> = std::result::Result<T, EpiwatchError>;

impl EpiwatchError {
    /// Creates a malformed input error for a single field.
    pub fn malformed(row: usize, field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedInput {
            row,
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Creates a missing column error
    pub fn missing_column(field: impl Into<String>, accepted: &[String]) -> Self {
        Self::MissingColumn {
            field: field.into(),
            accepted: accepted.to_vec(),
        }
    }

    /// Creates an arithmetic overflow error
    pub fn overflow(context: impl Into<String>) -> Self {
        Self::Arithmetic {
            context: context.into(),
        }
    }

    /// Creates a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates a serialization error with context
    pub fn serialization(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Serialization {
            context: context.into(),
            source,
        }
    }

    /// Returns true for errors that represent a quality abort rather than a
    /// structural problem with the input or the caller.
    pub fn is_quality_abort(&self) -> bool {
        matches!(self, Self::BlockingQualityViolation { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_message_names_row_and_field() {
        let error = EpiwatchError::malformed(4, "date", "cannot parse '2021-13-45' as a date");
        let message = error.to_string();

        assert!(message.contains("row 4"));
        assert!(message.contains("'date'"));
        assert!(message.contains("2021-13-45"));
        assert!(!error.is_quality_abort());
    }

    #[test]
    fn test_missing_column_lists_aliases() {
        let accepted = vec!["population".to_string(), "pop".to_string()];
        let error = EpiwatchError::missing_column("population", &accepted);

        assert!(error.to_string().contains("pop"));
    }

    #[test]
    fn test_blocking_violation_is_quality_abort() {
        let error = EpiwatchError::BlockingQualityViolation {
            rule: "population_positive".to_string(),
            affected_rows: 3,
            stage: CheckStage::Input,
            checks: vec![],
            run_id: Uuid::nil(),
            state_trail: vec![RunState::Loaded, RunState::InputChecked, RunState::Aborted],
        };

        assert!(error.is_quality_abort());
        assert!(error.to_string().contains("population_positive"));
        assert!(error.to_string().contains("3 row(s)"));
    }

    #[test]
    fn test_error_creation() {
        let error = EpiwatchError::configuration("incidence_upper_bound must be positive");
        assert!(error.to_string().contains("incidence_upper_bound"));

        let error = EpiwatchError::overflow("weekly case sum for 'Ecuador'");
        assert!(error.to_string().contains("Ecuador"));
    }
}
