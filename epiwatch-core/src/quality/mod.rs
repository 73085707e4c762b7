//! Data quality gate.
//!
//! This module provides the rule engine and the two rule sets it runs:
//! - **Input rules**: key nulls, duplicate `(location, date)` pairs,
//!   non-positive population, negative case counts, future dates
//! - **Output rules**: incidence range and growth-factor validity
//!
//! Every rule yields exactly one [`CheckResult`] per run. Only
//! `population_positive` can block a run; everything else is advisory or,
//! at the output stage, informational for the report.
//!
//! # Example
//! ```rust,ignore
//! use epiwatch_core::quality::{InputRule, InputView, RuleEngine};
//!
//! let view = InputView::build(&raw, &aliases);
//! let results = RuleEngine::default().evaluate(&view, &InputRule::standard(reference_date));
//! ```

mod engine;
mod input_rules;
mod models;
mod output_rules;

// Re-export public API
pub use engine::{Rule, RuleEngine};
pub use input_rules::{InputRule, InputView, RowView};
pub use models::{CheckResult, CheckStage, Severity, Violation};
pub use output_rules::{MetricOutputs, OutputRule};
