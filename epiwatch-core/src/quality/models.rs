//! Check result models.
//!
//! A check result carries counts and a short note, never row contents, so it
//! can be handed to a report as-is.

use serde::{Deserialize, Serialize};

/// Verdict of a rule, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// No violations
    Pass,
    /// Advisory violation, recorded but never blocking
    Warn,
    /// Blocking violation
    Fail,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Pass => write!(f, "pass"),
            Severity::Warn => write!(f, "warn"),
            Severity::Fail => write!(f, "fail"),
        }
    }
}

/// Pipeline stage a rule belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStage {
    /// Rules over the loaded observations
    Input,
    /// Rules over computed metrics
    Output,
}

impl std::fmt::Display for CheckStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CheckStage::Input => write!(f, "input"),
            CheckStage::Output => write!(f, "output"),
        }
    }
}

/// A single row flagged by a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Violation {
    /// Index of the offending row in the rule's subject
    pub row: usize,
    /// Severity assigned by the rule's policy
    pub severity: Severity,
}

impl Violation {
    /// Creates a violation for a row.
    pub fn new(row: usize, severity: Severity) -> Self {
        Self { row, severity }
    }
}

/// Aggregated verdict of one rule for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    /// Rule name as reported
    pub rule_name: String,
    /// Stage the rule ran in
    pub stage: CheckStage,
    /// Worst severity among the rule's violations
    pub severity: Severity,
    /// Number of rows the rule flagged
    pub affected_row_count: u64,
    /// Human-readable summary
    pub note: String,
}

impl CheckResult {
    /// Aggregates row-level violations into a check result.
    ///
    /// The verdict is the worst severity among the violations, or `Pass`
    /// when there are none.
    pub fn from_violations(
        rule_name: impl Into<String>,
        stage: CheckStage,
        violations: &[Violation],
        note: impl Into<String>,
    ) -> Self {
        let severity = violations
            .iter()
            .map(|v| v.severity)
            .max()
            .unwrap_or(Severity::Pass);

        Self {
            rule_name: rule_name.into(),
            stage,
            severity,
            affected_row_count: violations.len() as u64,
            note: note.into(),
        }
    }

    /// Returns true if this result blocks downstream stages.
    pub fn is_blocking(&self) -> bool {
        self.severity == Severity::Fail
    }

    /// Returns true if this result is an advisory violation.
    pub fn is_advisory(&self) -> bool {
        self.severity == Severity::Warn
    }
}
