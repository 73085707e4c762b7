//! Core validation and metric pipeline for epidemiological time series.
//!
//! This crate takes a loaded table of daily per-location observations,
//! checks it against input quality rules, normalizes it, derives weekly
//! surveillance metrics and checks those against output rules. The result
//! is a [`Handoff`] carrying the metrics plus every check verdict for a
//! downstream report.
//!
//! # Quality Guarantees
//! - Every rule yields exactly one verdict per run, even when nothing is flagged
//! - Only a non-positive population aborts a run; all other findings travel
//!   with the data
//! - The cleaner never drops or deduplicates rows
//! - Undefined growth factors are an explicit sentinel, never NaN or infinity
//!
//! # Architecture
//! - [`quality`]: rule engine and the input/output rule sets
//! - [`cleaner`]: header aliasing and type coercion
//! - [`profile`]: descriptive summary of the cleaned rows
//! - [`metrics`]: 7-day incidence and weekly growth factor
//! - [`validator`]: output rules over computed metrics
//! - [`pipeline`]: run state machine tying the stages together

pub mod cleaner;
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod profile;
pub mod quality;
pub mod schema;
pub mod validator;

mod parallel;

// Re-export commonly used types
pub use cleaner::Cleaner;
pub use config::{ConfigValidationError, PipelineConfig};
pub use error::{EpiwatchError, Result};
pub use logging::{LogFormat, LoggingConfig};
pub use metrics::{GrowthFactor, GrowthRecord, IncidenceRecord, MetricEngine};
pub use models::{Observation, RawRecordSet, RecordSet};
pub use pipeline::{Handoff, Pipeline, PipelineRun, RunState};
pub use profile::{ColumnProfile, DatasetProfile};
pub use quality::{CheckResult, CheckStage, InputRule, OutputRule, RuleEngine, Severity};
pub use schema::{ColumnAliases, Field};
pub use validator::OutputValidator;
