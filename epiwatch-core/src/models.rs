//! Core data models for daily observations.
//!
//! A run starts from a [`RawRecordSet`] handed over by an external loader and
//! is turned into a typed [`RecordSet`] by the cleaner. Neither is ever
//! mutated once built; every stage produces a new value.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{EpiwatchError, Result};

/// Untyped rows exactly as the external loader produced them.
///
/// Each row is expected to be a JSON object. Column names are whatever the
/// source used; they are resolved through
/// [`ColumnAliases`](crate::schema::ColumnAliases).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRecordSet {
    /// Free-form description of where the rows came from
    pub source: String,
    /// Row objects in load order
    pub rows: Vec<Value>,
}

impl RawRecordSet {
    /// Creates a raw record set from loaded rows.
    pub fn new(source: impl Into<String>, rows: Vec<Value>) -> Self {
        Self {
            source: source.into(),
            rows,
        }
    }

    /// Parses a JSON array of row objects.
    pub fn from_json_str(source: impl Into<String>, json: &str) -> Result<Self> {
        let rows: Vec<Value> = serde_json::from_str(json)
            .map_err(|e| EpiwatchError::serialization("parsing raw observation rows", e))?;
        Ok(Self::new(source, rows))
    }

    /// Number of loaded rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if no rows were loaded.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// One daily observation for one location.
///
/// Key fields are optional because nulls are reported by the quality gate
/// and carried through, not dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    pub location: Option<String>,
    pub date: Option<NaiveDate>,
    /// Daily new cases; negative values are source-side revisions
    pub new_cases: Option<i64>,
    pub population: Option<i64>,
    pub people_vaccinated: Option<i64>,
}

impl Observation {
    /// Creates a fully populated observation without vaccination data.
    pub fn new(
        location: impl Into<String>,
        date: NaiveDate,
        new_cases: i64,
        population: i64,
    ) -> Self {
        Self {
            location: Some(location.into()),
            date: Some(date),
            new_cases: Some(new_cases),
            population: Some(population),
            people_vaccinated: None,
        }
    }

    /// Builder method to set the vaccination count.
    pub fn with_people_vaccinated(mut self, people_vaccinated: i64) -> Self {
        self.people_vaccinated = Some(people_vaccinated);
        self
    }

    /// Location and date, when both are known.
    pub fn key(&self) -> Option<(&str, NaiveDate)> {
        match (&self.location, self.date) {
            (Some(location), Some(date)) => Some((location.as_str(), date)),
            _ => None,
        }
    }
}

/// The canonical typed table of observations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSet {
    /// Carried over from the raw record set
    pub source: String,
    /// Observations in load order
    pub rows: Vec<Observation>,
}

impl RecordSet {
    /// Creates a record set from typed rows.
    pub fn new(source: impl Into<String>, rows: Vec<Observation>) -> Self {
        Self {
            source: source.into(),
            rows,
        }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if the record set has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Distinct non-null locations, sorted.
    pub fn locations(&self) -> BTreeSet<&str> {
        self.rows
            .iter()
            .filter_map(|row| row.location.as_deref())
            .collect()
    }

    /// Latest non-null date in the record set.
    pub fn max_date(&self) -> Option<NaiveDate> {
        self.rows.iter().filter_map(|row| row.date).max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_raw_record_set_from_json() {
        let raw = RawRecordSet::from_json_str(
            "inline",
            r#"[{"location": "Ecuador", "date": "2021-07-01"}, {"location": "Peru"}]"#,
        )
        .unwrap();

        assert_eq!(raw.source, "inline");
        assert_eq!(raw.len(), 2);
        assert!(!raw.is_empty());
        assert_eq!(raw.rows[1], json!({"location": "Peru"}));
    }

    #[test]
    fn test_raw_record_set_invalid_json() {
        let error = RawRecordSet::from_json_str("inline", "{not json").unwrap_err();
        assert!(matches!(error, EpiwatchError::Serialization { .. }));
    }

    #[test]
    fn test_observation_key() {
        let obs = Observation::new("Ecuador", date(2021, 7, 1), 10, 17_000_000);
        assert_eq!(obs.key(), Some(("Ecuador", date(2021, 7, 1))));

        let missing_date = Observation {
            date: None,
            ..obs.clone()
        };
        assert_eq!(missing_date.key(), None);
    }

    #[test]
    fn test_record_set_locations_and_max_date() {
        let rows = vec![
            Observation::new("Peru", date(2021, 7, 2), 1, 33_000_000),
            Observation::new("Ecuador", date(2021, 7, 5), 1, 17_000_000)
                .with_people_vaccinated(100),
            Observation::new("Peru", date(2021, 7, 3), 1, 33_000_000),
            Observation {
                location: None,
                date: None,
                new_cases: None,
                population: None,
                people_vaccinated: None,
            },
        ];
        let records = RecordSet::new("test", rows);

        assert_eq!(records.len(), 4);
        assert_eq!(
            records.locations().into_iter().collect::<Vec<_>>(),
            vec!["Ecuador", "Peru"]
        );
        assert_eq!(records.max_date(), Some(date(2021, 7, 5)));
        assert_eq!(records.rows[1].people_vaccinated, Some(100));
    }
}
