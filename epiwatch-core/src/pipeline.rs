//! Pipeline run state machine.
//!
//! A run walks a fixed, linear stage order:
//!
//! ```text
//! Loaded → InputChecked → Cleaned → MetricsComputed → OutputChecked → Handoff
//!              ↓
//!           Aborted   (population_positive failed)
//! ```
//!
//! Each stage is a pure function of the previous stage's output plus the
//! configuration. The only abort is a blocking verdict at the input stage;
//! output verdicts are handed to the report whatever they are.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cleaner::Cleaner;
use crate::config::PipelineConfig;
use crate::error::{EpiwatchError, Result};
use crate::metrics::{GrowthRecord, IncidenceRecord, MetricEngine};
use crate::models::RawRecordSet;
use crate::profile::DatasetProfile;
use crate::quality::{CheckResult, CheckStage, InputRule, InputView, RuleEngine};
use crate::schema::ColumnMap;
use crate::validator::OutputValidator;

/// State of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Loaded,
    InputChecked,
    Cleaned,
    MetricsComputed,
    OutputChecked,
    Handoff,
    Aborted,
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunState::Loaded => write!(f, "Loaded"),
            RunState::InputChecked => write!(f, "InputChecked"),
            RunState::Cleaned => write!(f, "Cleaned"),
            RunState::MetricsComputed => write!(f, "MetricsComputed"),
            RunState::OutputChecked => write!(f, "OutputChecked"),
            RunState::Handoff => write!(f, "Handoff"),
            RunState::Aborted => write!(f, "Aborted"),
        }
    }
}

impl RunState {
    /// Whether the state machine allows moving from `self` to `next`.
    pub fn can_transition_to(&self, next: RunState) -> bool {
        matches!(
            (self, next),
            (RunState::Loaded, RunState::InputChecked)
                | (RunState::InputChecked, RunState::Cleaned)
                | (RunState::InputChecked, RunState::Aborted)
                | (RunState::Cleaned, RunState::MetricsComputed)
                | (RunState::MetricsComputed, RunState::OutputChecked)
                | (RunState::OutputChecked, RunState::Handoff)
        )
    }

    /// True for `Handoff` and `Aborted`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Handoff | RunState::Aborted)
    }
}

/// Tracks the state of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineRun {
    run_id: Uuid,
    state: RunState,
    trail: Vec<RunState>,
}

impl Default for PipelineRun {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineRun {
    /// Starts a run in the `Loaded` state with a fresh id.
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            state: RunState::Loaded,
            trail: vec![RunState::Loaded],
        }
    }

    /// Run identifier.
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Current state.
    pub fn state(&self) -> RunState {
        self.state
    }

    /// Every state visited so far, in order.
    pub fn trail(&self) -> &[RunState] {
        &self.trail
    }

    /// Moves to `next`, rejecting transitions the state machine does not allow.
    pub fn advance(&mut self, next: RunState) -> Result<()> {
        if !self.state.can_transition_to(next) {
            return Err(EpiwatchError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        tracing::info!(run_id = %self.run_id, "Pipeline {} -> {}", self.state, next);
        self.state = next;
        self.trail.push(next);
        Ok(())
    }
}

/// Everything a run hands to the report assembler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Handoff {
    pub run_id: Uuid,
    /// Source description of the loaded rows
    pub source: String,
    pub reference_date: NaiveDate,
    pub input_checks: Vec<CheckResult>,
    /// Descriptive profile of the cleaned rows
    pub profile: DatasetProfile,
    pub incidence: Vec<IncidenceRecord>,
    pub growth: Vec<GrowthRecord>,
    pub output_checks: Vec<CheckResult>,
    /// States visited by the run, ending in `Handoff`
    pub state_trail: Vec<RunState>,
}

impl Handoff {
    /// Advisory (`warn`) results from both stages.
    pub fn advisories(&self) -> impl Iterator<Item = &CheckResult> {
        self.input_checks
            .iter()
            .chain(&self.output_checks)
            .filter(|c| c.is_advisory())
    }

    /// Output results with a `fail` verdict.
    pub fn output_failures(&self) -> impl Iterator<Item = &CheckResult> {
        self.output_checks.iter().filter(|c| c.is_blocking())
    }

    /// Serializes the handoff for the report assembler.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| EpiwatchError::serialization("serializing pipeline handoff", e))
    }
}

/// Name of the only input rule whose failure aborts a run.
pub const BLOCKING_RULE: &str = "population_positive";

/// The validation-and-metric pipeline.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
    rule_engine: RuleEngine,
    cleaner: Cleaner,
    metric_engine: MetricEngine,
    output_validator: OutputValidator,
}

impl Pipeline {
    /// Creates a pipeline after validating the configuration.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            rule_engine: RuleEngine::new(config.parallel),
            cleaner: Cleaner::new(config.aliases.clone()),
            metric_engine: MetricEngine::from_config(&config),
            output_validator: OutputValidator::from_config(&config),
            config,
        })
    }

    /// Returns a reference to the pipeline configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Runs the input rules against loaded rows.
    pub fn check_input(&self, records: &RawRecordSet) -> Vec<CheckResult> {
        let view = InputView::build(records, &self.config.aliases);
        self.rule_engine
            .evaluate(&view, &InputRule::standard(self.config.reference_date))
    }

    /// Runs every stage and returns the handoff.
    ///
    /// # Errors
    /// - `BlockingQualityViolation` when `population_positive` fails; no
    ///   metrics are computed
    /// - `MalformedInput` / `MissingColumn` when the cleaner cannot coerce
    ///   the rows
    pub fn run(&self, records: &RawRecordSet) -> Result<Handoff> {
        let mut run = PipelineRun::new();
        let span = tracing::info_span!("pipeline_run", run_id = %run.run_id());
        let _guard = span.enter();

        tracing::info!(
            "Starting run over '{}' ({} rows, reference date {})",
            records.source,
            records.len(),
            self.config.reference_date
        );

        let input_checks = self.check_input(records);
        run.advance(RunState::InputChecked)?;

        if let Some(blocking) = input_checks
            .iter()
            .find(|c| c.rule_name == BLOCKING_RULE && c.is_blocking())
        {
            run.advance(RunState::Aborted)?;
            tracing::error!(
                rule = %blocking.rule_name,
                affected_rows = blocking.affected_row_count,
                "Run aborted at input stage"
            );
            return Err(EpiwatchError::BlockingQualityViolation {
                rule: blocking.rule_name.clone(),
                affected_rows: blocking.affected_row_count,
                stage: CheckStage::Input,
                checks: input_checks.clone(),
                run_id: run.run_id(),
                state_trail: run.trail().to_vec(),
            });
        }

        let cleaned = self.cleaner.clean(records, &input_checks)?;
        let profile = DatasetProfile::build(
            &cleaned,
            &ColumnMap::resolve(records, &self.config.aliases),
        );
        run.advance(RunState::Cleaned)?;

        let incidence = self.metric_engine.compute_incidence(&cleaned)?;
        let growth = self.metric_engine.compute_growth(&cleaned)?;
        run.advance(RunState::MetricsComputed)?;

        let output_checks = self.output_validator.validate(&incidence, &growth);
        run.advance(RunState::OutputChecked)?;

        run.advance(RunState::Handoff)?;
        tracing::info!(
            incidence = incidence.len(),
            growth = growth.len(),
            "Run complete"
        );

        Ok(Handoff {
            run_id: run.run_id(),
            source: records.source.clone(),
            reference_date: self.config.reference_date,
            input_checks,
            profile,
            incidence,
            growth,
            output_checks,
            state_trail: run.trail().to_vec(),
        })
    }
}
