//! Rule engine facade.
//!
//! The engine runs every rule of a rule set against a read-only subject and
//! aggregates each rule's violations into exactly one [`CheckResult`]. Rules
//! never short-circuit one another, so a single run surfaces every violation.

use super::models::{CheckResult, CheckStage, Severity, Violation};
use crate::parallel::map_ordered;

/// A named data-quality rule over a subject `S`.
///
/// The rule's predicate and severity policy are both expressed by
/// [`Rule::violations`]: each returned [`Violation`] names a row and the
/// severity the policy assigns to it.
pub trait Rule<S: ?Sized>: Send + Sync {
    /// Name reported in the check result.
    fn name(&self) -> &'static str;

    /// Stage the rule belongs to.
    fn stage(&self) -> CheckStage;

    /// Rows of `subject` that violate the rule.
    fn violations(&self, subject: &S) -> Vec<Violation>;

    /// Summary note for the check result.
    fn note(&self, subject: &S, violations: &[Violation]) -> String;
}

/// Evaluates rule sets and aggregates their verdicts.
#[derive(Debug, Clone, Copy)]
pub struct RuleEngine {
    parallel: bool,
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self { parallel: true }
    }
}

impl RuleEngine {
    /// Creates a rule engine.
    ///
    /// With `parallel` set, independent rules are evaluated concurrently;
    /// results are identical either way.
    pub fn new(parallel: bool) -> Self {
        Self { parallel }
    }

    /// Runs every rule against the subject.
    ///
    /// Returns one check result per rule, in rule-set order.
    pub fn evaluate<S, R>(&self, subject: &S, rules: &[R]) -> Vec<CheckResult>
    where
        S: Sync + ?Sized,
        R: Rule<S>,
    {
        let results = map_ordered(rules, self.parallel, |rule| Self::check(subject, rule));

        for result in &results {
            match result.severity {
                Severity::Pass => tracing::debug!(
                    rule = %result.rule_name,
                    stage = %result.stage,
                    "Check passed: {}",
                    result.note
                ),
                Severity::Warn => tracing::warn!(
                    rule = %result.rule_name,
                    stage = %result.stage,
                    affected_rows = result.affected_row_count,
                    "Advisory violation: {}",
                    result.note
                ),
                Severity::Fail => tracing::error!(
                    rule = %result.rule_name,
                    stage = %result.stage,
                    affected_rows = result.affected_row_count,
                    "Blocking violation: {}",
                    result.note
                ),
            }
        }

        results
    }

    fn check<S, R>(subject: &S, rule: &R) -> CheckResult
    where
        S: ?Sized,
        R: Rule<S>,
    {
        let violations = rule.violations(subject);
        let note = rule.note(subject, &violations);
        CheckResult::from_violations(rule.name(), rule.stage(), &violations, note)
    }
}
