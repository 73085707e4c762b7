//! Descriptive profile of a cleaned dataset.
//!
//! The profile summarizes what was loaded: which source headers fed each
//! canonical column, the range of daily case counts, how much of the case
//! and vaccination columns is null, and the covered date range. It is
//! descriptive only and never changes a verdict.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::RecordSet;
use crate::schema::{ColumnMap, Field};

/// Canonical type a column is coerced into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Text,
    Integer,
    Date,
}

impl From<Field> for ValueKind {
    fn from(field: Field) -> Self {
        match field {
            Field::Location => ValueKind::Text,
            Field::Date => ValueKind::Date,
            Field::NewCases | Field::PeopleVaccinated | Field::Population => ValueKind::Integer,
        }
    }
}

/// One canonical column and where it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnProfile {
    pub field: Field,
    pub kind: ValueKind,
    /// Source headers read for this column, in lookup order
    pub source_headers: Vec<String>,
}

/// Summary statistics of a cleaned record set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatasetProfile {
    pub row_count: u64,
    /// Distinct non-null locations
    pub location_count: u64,
    pub columns: Vec<ColumnProfile>,
    pub new_cases_min: Option<i64>,
    pub new_cases_max: Option<i64>,
    /// Share of rows with null `new_cases`, in percent; `None` for an empty set
    pub pct_null_new_cases: Option<f64>,
    /// Share of rows with null `people_vaccinated`, in percent; `None` for an empty set
    pub pct_null_people_vaccinated: Option<f64>,
    pub date_min: Option<NaiveDate>,
    pub date_max: Option<NaiveDate>,
}

#[allow(clippy::cast_precision_loss)]
fn percent(count: usize, total: usize) -> Option<f64> {
    if total == 0 {
        None
    } else {
        Some(count as f64 / total as f64 * 100.0)
    }
}

impl DatasetProfile {
    /// Profiles `records`, naming the source headers resolved in `columns`.
    pub fn build(records: &RecordSet, columns: &ColumnMap) -> Self {
        let rows = &records.rows;
        let null_cases = rows.iter().filter(|r| r.new_cases.is_none()).count();
        let null_vaccinated = rows.iter().filter(|r| r.people_vaccinated.is_none()).count();

        let profile = Self {
            row_count: rows.len() as u64,
            location_count: records.locations().len() as u64,
            columns: Field::ALL
                .into_iter()
                .map(|field| ColumnProfile {
                    field,
                    kind: field.into(),
                    source_headers: columns.columns_for(field).to_vec(),
                })
                .collect(),
            new_cases_min: rows.iter().filter_map(|r| r.new_cases).min(),
            new_cases_max: rows.iter().filter_map(|r| r.new_cases).max(),
            pct_null_new_cases: percent(null_cases, rows.len()),
            pct_null_people_vaccinated: percent(null_vaccinated, rows.len()),
            date_min: rows.iter().filter_map(|r| r.date).min(),
            date_max: records.max_date(),
        };

        tracing::debug!(
            rows = profile.row_count,
            locations = profile.location_count,
            "Profiled '{}': dates {:?}..{:?}",
            records.source,
            profile.date_min,
            profile.date_max
        );
        profile
    }

    /// Profile entry for a canonical column.
    pub fn column(&self, field: Field) -> Option<&ColumnProfile> {
        self.columns.iter().find(|c| c.field == field)
    }
}
