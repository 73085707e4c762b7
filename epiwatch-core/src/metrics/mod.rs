//! Windowed metrics over cleaned observations.
//!
//! Both metrics are computed independently per location, over that
//! location's rows sorted by date. Locations are independent partitions and
//! may be computed in parallel; output is ordered by location, then date.
//!
//! - **Incidence**: trailing 7-day case sum per 100,000 inhabitants
//! - **Growth**: ratio of a week's cases to the preceding week's
//!
//! # Example
//! ```rust,ignore
//! use epiwatch_core::metrics::MetricEngine;
//!
//! let engine = MetricEngine::new(chrono::Weekday::Sun);
//! let incidence = engine.compute_incidence(&records)?;
//! let growth = engine.compute_growth(&records)?;
//! ```

mod growth;
mod incidence;
mod models;

use std::collections::BTreeMap;

use chrono::Weekday;

pub use growth::week_ending_date;
pub use models::{
    GrowthFactor, GrowthRecord, IncidenceRecord, PER_INHABITANTS, WINDOW_DAYS,
};

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::models::{Observation, RecordSet};
use crate::parallel::map_ordered;

/// One location's rows, sorted by date.
type Partition<'a> = (&'a str, Vec<&'a Observation>);

/// Computes incidence and growth records from a cleaned record set.
#[derive(Debug, Clone)]
pub struct MetricEngine {
    week_ending: Weekday,
    locations: Vec<String>,
    parallel: bool,
}

impl MetricEngine {
    /// Creates an engine with weeks ending on `week_ending`, covering every
    /// location, computing locations in parallel.
    pub fn new(week_ending: Weekday) -> Self {
        Self {
            week_ending,
            locations: Vec::new(),
            parallel: true,
        }
    }

    /// Creates an engine from pipeline configuration.
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            week_ending: config.week_ending,
            locations: config.locations.clone(),
            parallel: config.parallel,
        }
    }

    /// Builder method to restrict metrics to the given locations.
    pub fn with_locations(mut self, locations: Vec<String>) -> Self {
        self.locations = locations;
        self
    }

    /// Builder method to enable/disable per-location parallelism.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Computes trailing 7-day incidence for every location in scope.
    pub fn compute_incidence(&self, records: &RecordSet) -> Result<Vec<IncidenceRecord>> {
        let partitions = self.partition(records);
        let per_location = map_ordered(&partitions, self.parallel, |(location, rows)| {
            incidence::location_incidence(location, rows)
        });

        let records = flatten(per_location)?;
        tracing::debug!(
            "Computed {} incidence record(s) for {} location(s)",
            records.len(),
            partitions.len()
        );
        Ok(records)
    }

    /// Computes week-over-week growth for every location in scope.
    pub fn compute_growth(&self, records: &RecordSet) -> Result<Vec<GrowthRecord>> {
        let partitions = self.partition(records);
        let week_ending = self.week_ending;
        let per_location = map_ordered(&partitions, self.parallel, |(location, rows)| {
            growth::location_growth(location, rows, week_ending)
        });

        let records = flatten(per_location)?;
        tracing::debug!(
            "Computed {} growth record(s) for {} location(s)",
            records.len(),
            partitions.len()
        );
        Ok(records)
    }

    fn in_scope(&self, location: &str) -> bool {
        self.locations.is_empty() || self.locations.iter().any(|l| l == location)
    }

    /// Groups rows by location, sorted by date.
    ///
    /// The sort is stable so duplicate dates keep load order. Rows without a
    /// location or date cannot be placed in a window and are skipped.
    fn partition<'a>(&self, records: &'a RecordSet) -> Vec<Partition<'a>> {
        let mut by_location: BTreeMap<&'a str, Vec<&'a Observation>> = BTreeMap::new();
        let mut unplaced: usize = 0;

        for row in &records.rows {
            match (row.location.as_deref(), row.date) {
                (Some(location), Some(_)) => {
                    if self.in_scope(location) {
                        by_location.entry(location).or_default().push(row);
                    }
                }
                _ => unplaced = unplaced.saturating_add(1),
            }
        }

        if unplaced > 0 {
            tracing::debug!(
                "Skipped {} row(s) without location or date for metric computation",
                unplaced
            );
        }

        for location in &self.locations {
            if !by_location.contains_key(location.as_str()) {
                tracing::warn!("Location '{}' in scope has no observations", location);
            }
        }

        by_location
            .into_iter()
            .map(|(location, mut rows)| {
                rows.sort_by_key(|row| row.date);
                (location, rows)
            })
            .collect()
    }
}

fn flatten<T>(per_location: Vec<Result<Vec<T>>>) -> Result<Vec<T>> {
    let mut out = Vec::new();
    for records in per_location {
        out.extend(records?);
    }
    Ok(out)
}
