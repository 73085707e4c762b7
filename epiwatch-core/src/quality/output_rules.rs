//! Rules over computed metrics.

use std::collections::HashMap;

use super::engine::Rule;
use super::models::{CheckStage, Severity, Violation};
use crate::metrics::{GrowthRecord, IncidenceRecord, WINDOW_DAYS};

/// Borrowed metric sequences checked by the output rules.
#[derive(Debug, Clone, Copy)]
pub struct MetricOutputs<'a> {
    pub incidence: &'a [IncidenceRecord],
    pub growth: &'a [GrowthRecord],
}

/// The closed set of output rules.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputRule {
    /// Incidence outside `[0, upper_bound]` or non-finite
    IncidenciaEnRango { upper_bound: f64 },
    /// Growth factor undefined, non-positive, infinite or NaN
    FactorCrecValido { warmup_records: usize },
}

impl OutputRule {
    /// The standard output rule set, in reporting order.
    pub fn standard(upper_bound: f64, warmup_records: usize) -> Vec<OutputRule> {
        vec![
            OutputRule::IncidenciaEnRango { upper_bound },
            OutputRule::FactorCrecValido { warmup_records },
        ]
    }
}

/// Position of each growth record within its location, by week.
fn growth_ordinals(growth: &[GrowthRecord]) -> Vec<usize> {
    let mut by_location: HashMap<&str, Vec<usize>> = HashMap::new();
    for (index, record) in growth.iter().enumerate() {
        by_location
            .entry(record.location.as_str())
            .or_default()
            .push(index);
    }

    let mut ordinals = vec![0; growth.len()];
    for mut indices in by_location.into_values() {
        indices.sort_by_key(|&i| (growth[i].week_ending_date, i));
        for (ordinal, index) in indices.into_iter().enumerate() {
            ordinals[index] = ordinal;
        }
    }
    ordinals
}

fn incidence_in_range(value: f64, upper_bound: f64) -> bool {
    value.is_finite() && (0.0..=upper_bound).contains(&value)
}

impl Rule<MetricOutputs<'_>> for OutputRule {
    fn name(&self) -> &'static str {
        match self {
            OutputRule::IncidenciaEnRango { .. } => "incidencia_en_rango",
            OutputRule::FactorCrecValido { .. } => "factor_crec_valido",
        }
    }

    fn stage(&self) -> CheckStage {
        CheckStage::Output
    }

    fn violations(&self, outputs: &MetricOutputs<'_>) -> Vec<Violation> {
        match self {
            OutputRule::IncidenciaEnRango { upper_bound } => outputs
                .incidence
                .iter()
                .enumerate()
                .filter(|(_, r)| r.window_days >= WINDOW_DAYS)
                .filter(|(_, r)| !incidence_in_range(r.incidence_7d, *upper_bound))
                .map(|(index, _)| Violation::new(index, Severity::Fail))
                .collect(),
            OutputRule::FactorCrecValido { warmup_records } => {
                let ordinals = growth_ordinals(outputs.growth);
                outputs
                    .growth
                    .iter()
                    .enumerate()
                    .filter(|(_, r)| !r.growth_factor_7d.is_valid())
                    .map(|(index, _)| {
                        let severity = if ordinals[index] < *warmup_records {
                            Severity::Warn
                        } else {
                            Severity::Fail
                        };
                        Violation::new(index, severity)
                    })
                    .collect()
            }
        }
    }

    fn note(&self, outputs: &MetricOutputs<'_>, violations: &[Violation]) -> String {
        match self {
            OutputRule::IncidenciaEnRango { upper_bound } => {
                let excluded = outputs
                    .incidence
                    .iter()
                    .filter(|r| r.window_days < WINDOW_DAYS)
                    .count();
                let mut note = format!(
                    "values outside [0, {}]: {}",
                    upper_bound,
                    violations.len()
                );
                if excluded > 0 {
                    note.push_str(&format!(
                        " ({} early-window record(s) excluded)",
                        excluded
                    ));
                }
                note
            }
            OutputRule::FactorCrecValido { .. } => {
                let warm = violations
                    .iter()
                    .filter(|v| v.severity == Severity::Warn)
                    .count();
                format!(
                    "invalid growth factors (undefined/NaN/inf/<=0): {} ({} in warm-up weeks)",
                    violations.len(),
                    warm
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::GrowthFactor;
    use crate::quality::RuleEngine;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn incidence(value: f64, window_days: u32) -> IncidenceRecord {
        IncidenceRecord {
            location: "Ecuador".to_string(),
            week_ending_date: date(2021, 7, 1),
            incidence_7d: value,
            window_days,
        }
    }

    fn growth(location: &str, day: u32, factor: GrowthFactor) -> GrowthRecord {
        GrowthRecord {
            location: location.to_string(),
            week_ending_date: date(2021, 7, day),
            cases_this_week: 10,
            cases_previous_week: 10,
            growth_factor_7d: factor,
        }
    }

    fn check(incidence: &[IncidenceRecord], growth: &[GrowthRecord]) -> Vec<crate::quality::CheckResult> {
        let outputs = MetricOutputs { incidence, growth };
        RuleEngine::new(false).evaluate(&outputs, &OutputRule::standard(2000.0, 2))
    }

    #[test]
    fn test_incidence_in_range_passes() {
        let results = check(&[incidence(0.0, 7), incidence(10.6, 7), incidence(2000.0, 7)], &[]);

        assert_eq!(results[0].rule_name, "incidencia_en_rango");
        assert_eq!(results[0].severity, Severity::Pass);
    }

    #[test]
    fn test_incidence_out_of_range_fails() {
        let results = check(
            &[
                incidence(-0.5, 7),
                incidence(2500.0, 7),
                incidence(f64::NAN, 7),
                incidence(12.0, 7),
            ],
            &[],
        );

        assert_eq!(results[0].severity, Severity::Fail);
        assert_eq!(results[0].affected_row_count, 3);
    }

    #[test]
    fn test_incidence_early_window_excluded() {
        let results = check(&[incidence(-3.0, 4), incidence(50.0, 7)], &[]);

        assert_eq!(results[0].severity, Severity::Pass);
        assert!(results[0].note.contains("1 early-window record(s) excluded"));
    }

    #[test]
    fn test_growth_warmup_warns_then_fails() {
        let records = [
            growth("Ecuador", 11, GrowthFactor::Undefined),
            growth("Ecuador", 18, GrowthFactor::Value(0.0)),
            growth("Ecuador", 25, GrowthFactor::Value(1.2)),
            growth("Peru", 11, GrowthFactor::Value(0.9)),
        ];

        let results = check(&[], &records[..2]);
        assert_eq!(results[1].severity, Severity::Warn);
        assert_eq!(results[1].affected_row_count, 2);

        let mut late = records.to_vec();
        late.push(growth("Ecuador", 4, GrowthFactor::Value(1.0)));
        // Now the undefined week is the second record and 2021-07-18 the third.
        let results = check(&[], &late);
        assert_eq!(results[1].severity, Severity::Fail);
        assert_eq!(results[1].affected_row_count, 2);
        assert!(results[1].note.contains("(1 in warm-up weeks)"));
    }

    #[test]
    fn test_growth_non_finite_fails_after_warmup() {
        let records = [
            growth("Peru", 4, GrowthFactor::Value(1.0)),
            growth("Peru", 11, GrowthFactor::Value(1.0)),
            growth("Peru", 18, GrowthFactor::Value(f64::INFINITY)),
            growth("Peru", 25, GrowthFactor::Value(f64::NAN)),
        ];

        let results = check(&[], &records);

        assert_eq!(results[1].severity, Severity::Fail);
        assert_eq!(results[1].affected_row_count, 2);
    }

    #[test]
    fn test_warmup_counted_per_location() {
        let records = [
            growth("Ecuador", 4, GrowthFactor::Value(1.0)),
            growth("Ecuador", 11, GrowthFactor::Value(1.0)),
            growth("Peru", 18, GrowthFactor::Undefined),
        ];

        let results = check(&[], &records);

        assert_eq!(results[1].severity, Severity::Warn);
    }

    #[test]
    fn test_empty_outputs_pass() {
        let results = check(&[], &[]);

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.severity == Severity::Pass));
    }
}
