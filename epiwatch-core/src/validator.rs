//! Output validation of computed metrics.

use crate::config::PipelineConfig;
use crate::metrics::{GrowthRecord, IncidenceRecord};
use crate::quality::{CheckResult, MetricOutputs, OutputRule, RuleEngine};

/// Runs the output rules against the metric engine's results.
///
/// Its verdicts are informational for the report: an output `fail` never
/// aborts a run.
#[derive(Debug, Clone)]
pub struct OutputValidator {
    engine: RuleEngine,
    rules: Vec<OutputRule>,
}

impl OutputValidator {
    /// Creates a validator with the given bounds.
    pub fn new(incidence_upper_bound: f64, growth_warmup_records: usize) -> Self {
        Self {
            engine: RuleEngine::default(),
            rules: OutputRule::standard(incidence_upper_bound, growth_warmup_records),
        }
    }

    /// Creates a validator from pipeline configuration.
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            engine: RuleEngine::new(config.parallel),
            rules: OutputRule::standard(config.incidence_upper_bound, config.growth_warmup_records),
        }
    }

    /// Applies `incidencia_en_rango` and `factor_crec_valido`.
    pub fn validate(
        &self,
        incidence: &[IncidenceRecord],
        growth: &[GrowthRecord],
    ) -> Vec<CheckResult> {
        let outputs = MetricOutputs { incidence, growth };
        self.engine.evaluate(&outputs, &self.rules)
    }
}
