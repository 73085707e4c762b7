//! Pipeline configuration.
//!
//! The reference date is mandatory: the pipeline never reads the wall clock,
//! so every run is reproducible from its configuration and input.

use chrono::{NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{EpiwatchError, Result};
use crate::logging::LoggingConfig;
use crate::schema::{ColumnAliases, Field};

/// Default upper bound for a plausible 7-day incidence.
pub const DEFAULT_INCIDENCE_UPPER_BOUND: f64 = 2000.0;

/// Default number of growth records per location treated as warm-up.
pub const DEFAULT_GROWTH_WARMUP_RECORDS: usize = 2;

fn default_upper_bound() -> f64 {
    DEFAULT_INCIDENCE_UPPER_BOUND
}

fn default_week_ending() -> Weekday {
    Weekday::Sun
}

fn default_warmup() -> usize {
    DEFAULT_GROWTH_WARMUP_RECORDS
}

fn default_parallel() -> bool {
    true
}

/// Configuration for one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// "Today" for the `max_date_not_future` rule
    pub reference_date: NaiveDate,
    /// Upper bound of the plausible incidence range `[0, bound]`
    #[serde(default = "default_upper_bound")]
    pub incidence_upper_bound: f64,
    /// Weekday on which growth weeks end
    #[serde(default = "default_week_ending")]
    pub week_ending: Weekday,
    /// Growth records per location whose invalid factors only warn
    #[serde(default = "default_warmup")]
    pub growth_warmup_records: usize,
    /// Locations to compute metrics for; empty means all
    #[serde(default)]
    pub locations: Vec<String>,
    /// Accepted column names
    #[serde(default)]
    pub aliases: ColumnAliases,
    /// Evaluate rules and locations on the rayon pool
    #[serde(default = "default_parallel")]
    pub parallel: bool,
    /// Subscriber options for the embedding application
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Validation errors for pipeline configuration.
#[derive(Debug, Error)]
pub enum ConfigValidationError {
    #[error("incidence_upper_bound must be a finite positive number, got {0}")]
    InvalidUpperBound(f64),
    #[error("no accepted column names configured for '{0}'")]
    EmptyAliases(Field),
    #[error("location scope contains a blank entry")]
    BlankLocation,
}

impl From<ConfigValidationError> for EpiwatchError {
    fn from(error: ConfigValidationError) -> Self {
        EpiwatchError::configuration(error.to_string())
    }
}

impl PipelineConfig {
    /// Creates a config with defaults for the given reference date.
    pub fn new(reference_date: NaiveDate) -> Self {
        Self {
            reference_date,
            incidence_upper_bound: DEFAULT_INCIDENCE_UPPER_BOUND,
            week_ending: default_week_ending(),
            growth_warmup_records: DEFAULT_GROWTH_WARMUP_RECORDS,
            locations: Vec::new(),
            aliases: ColumnAliases::default(),
            parallel: true,
            logging: LoggingConfig::default(),
        }
    }

    /// Parses a JSON config document and validates it.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| EpiwatchError::serialization("parsing pipeline configuration", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Builder method to set the incidence upper bound.
    pub fn with_incidence_upper_bound(mut self, bound: f64) -> Self {
        self.incidence_upper_bound = bound;
        self
    }

    /// Builder method to set the weekday growth weeks end on.
    pub fn with_week_ending(mut self, week_ending: Weekday) -> Self {
        self.week_ending = week_ending;
        self
    }

    /// Builder method to set the growth warm-up length.
    pub fn with_growth_warmup_records(mut self, records: usize) -> Self {
        self.growth_warmup_records = records;
        self
    }

    /// Builder method to restrict metrics to the given locations.
    pub fn with_locations<I, S>(mut self, locations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.locations = locations.into_iter().map(Into::into).collect();
        self
    }

    /// Builder method to replace the column aliases.
    pub fn with_aliases(mut self, aliases: ColumnAliases) -> Self {
        self.aliases = aliases;
        self
    }

    /// Builder method to enable/disable parallel evaluation.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Builder method to set the logging options.
    pub fn with_logging(mut self, logging: LoggingConfig) -> Self {
        self.logging = logging;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> std::result::Result<(), ConfigValidationError> {
        if !self.incidence_upper_bound.is_finite() || self.incidence_upper_bound <= 0.0 {
            return Err(ConfigValidationError::InvalidUpperBound(
                self.incidence_upper_bound,
            ));
        }
        for field in Field::ALL {
            if self.aliases.candidates(field).is_empty() {
                return Err(ConfigValidationError::EmptyAliases(field));
            }
        }
        if self.locations.iter().any(|l| l.trim().is_empty()) {
            return Err(ConfigValidationError::BlankLocation);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    #[test]
    fn test_config_defaults() {
        let config = PipelineConfig::new(reference());

        assert_eq!(config.reference_date, reference());
        assert_eq!(config.incidence_upper_bound, 2000.0);
        assert_eq!(config.week_ending, Weekday::Sun);
        assert_eq!(config.growth_warmup_records, 2);
        assert!(config.locations.is_empty());
        assert!(config.parallel);
        assert_eq!(config.logging, LoggingConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = PipelineConfig::new(reference())
            .with_incidence_upper_bound(1500.0)
            .with_week_ending(Weekday::Mon)
            .with_growth_warmup_records(3)
            .with_locations(["Ecuador", "Peru"])
            .with_parallel(false);

        assert_eq!(config.incidence_upper_bound, 1500.0);
        assert_eq!(config.week_ending, Weekday::Mon);
        assert_eq!(config.growth_warmup_records, 3);
        assert_eq!(config.locations, vec!["Ecuador", "Peru"]);
        assert!(!config.parallel);
    }

    #[test]
    fn test_config_validate_invalid_bound() {
        for bound in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let config = PipelineConfig::new(reference()).with_incidence_upper_bound(bound);
            assert!(matches!(
                config.validate(),
                Err(ConfigValidationError::InvalidUpperBound(_))
            ));
        }
    }

    #[test]
    fn test_config_validate_empty_aliases() {
        let mut aliases = ColumnAliases::default();
        aliases.date.clear();
        let config = PipelineConfig::new(reference()).with_aliases(aliases);

        assert!(matches!(
            config.validate(),
            Err(ConfigValidationError::EmptyAliases(Field::Date))
        ));
    }

    #[test]
    fn test_config_validate_blank_location() {
        let config = PipelineConfig::new(reference()).with_locations(["Ecuador", " "]);
        assert!(matches!(
            config.validate(),
            Err(ConfigValidationError::BlankLocation)
        ));
    }

    #[test]
    fn test_config_from_json_uses_defaults() {
        let config = PipelineConfig::from_json_str(
            r#"{"reference_date": "2024-01-01", "locations": ["Ecuador", "Peru"]}"#,
        )
        .unwrap();

        assert_eq!(config.reference_date, reference());
        assert_eq!(config.incidence_upper_bound, 2000.0);
        assert_eq!(config.aliases, ColumnAliases::default());
        assert_eq!(config.locations.len(), 2);
    }

    #[test]
    fn test_config_from_json_requires_reference_date() {
        let error = PipelineConfig::from_json_str(r#"{"locations": []}"#).unwrap_err();
        assert!(matches!(error, EpiwatchError::Serialization { .. }));
    }

    #[test]
    fn test_config_from_json_rejects_invalid() {
        let error = PipelineConfig::from_json_str(
            r#"{"reference_date": "2024-01-01", "incidence_upper_bound": -5}"#,
        )
        .unwrap_err();
        assert!(matches!(error, EpiwatchError::Configuration { .. }));
    }

    #[test]
    fn test_config_serde_roundtrip() {
        let config = PipelineConfig::new(reference())
            .with_week_ending(Weekday::Sat)
            .with_locations(["Ecuador"]);

        let json = serde_json::to_string(&config).unwrap();
        let deserialized = PipelineConfig::from_json_str(&json).unwrap();

        assert_eq!(config, deserialized);
    }
}
