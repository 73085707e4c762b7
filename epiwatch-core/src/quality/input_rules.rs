//! Rules over the loaded observations.
//!
//! Input rules run before any coercion, on a lenient [`InputView`] of the raw
//! rows. Values that cannot be read are ignored here; rejecting them is the
//! cleaner's job.

use std::collections::HashSet;

use chrono::NaiveDate;

use super::engine::Rule;
use super::models::{CheckStage, Severity, Violation};
use crate::models::RawRecordSet;
use crate::schema::{Cell, ColumnAliases, ColumnMap, Field, read_date, read_integer, read_text};

/// Leniently read key fields of one raw row.
#[derive(Debug, Clone, PartialEq)]
pub struct RowView {
    pub location: Cell<String>,
    pub date: Cell<NaiveDate>,
    pub new_cases: Cell<i64>,
    pub population: Cell<i64>,
}

/// Read-only view of a raw record set shared by all input rules.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputView {
    /// One view per raw row, in load order
    pub rows: Vec<RowView>,
}

impl InputView {
    /// Reads every raw row through the resolved column mapping.
    pub fn build(records: &RawRecordSet, aliases: &ColumnAliases) -> Self {
        let columns = ColumnMap::resolve(records, aliases);
        let rows = records
            .rows
            .iter()
            .map(|row| RowView {
                location: read_text(columns.get(row, Field::Location)),
                date: read_date(columns.get(row, Field::Date)),
                new_cases: read_integer(columns.get(row, Field::NewCases)),
                population: read_integer(columns.get(row, Field::Population)),
            })
            .collect();

        Self { rows }
    }

    fn flag<P>(&self, severity: Severity, predicate: P) -> Vec<Violation>
    where
        P: Fn(&RowView) -> bool,
    {
        self.rows
            .iter()
            .enumerate()
            .filter(|(_, row)| predicate(row))
            .map(|(index, _)| Violation::new(index, severity))
            .collect()
    }
}

/// The closed set of input rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputRule {
    /// `location`, `date` or `population` is null
    KeysNotNull,
    /// `(location, date)` already seen earlier in the set
    UniqueLocDate,
    /// `population <= 0`; the only blocking input rule
    PopulationPositive,
    /// `new_cases < 0`, usually a source-side revision
    NewCasesNonnegative,
    /// `date` after the run's reference date
    MaxDateNotFuture { reference_date: NaiveDate },
}

impl InputRule {
    /// The standard input rule set, in reporting order.
    pub fn standard(reference_date: NaiveDate) -> Vec<InputRule> {
        vec![
            InputRule::KeysNotNull,
            InputRule::UniqueLocDate,
            InputRule::PopulationPositive,
            InputRule::NewCasesNonnegative,
            InputRule::MaxDateNotFuture { reference_date },
        ]
    }
}

impl Rule<InputView> for InputRule {
    fn name(&self) -> &'static str {
        match self {
            InputRule::KeysNotNull => "keys_not_null",
            InputRule::UniqueLocDate => "unique_loc_date",
            InputRule::PopulationPositive => "population_positive",
            InputRule::NewCasesNonnegative => "new_cases_nonnegative",
            InputRule::MaxDateNotFuture { .. } => "max_date_not_future",
        }
    }

    fn stage(&self) -> CheckStage {
        CheckStage::Input
    }

    fn violations(&self, view: &InputView) -> Vec<Violation> {
        match self {
            InputRule::KeysNotNull => view.flag(Severity::Warn, |row| {
                row.location.is_null() || row.date.is_null() || row.population.is_null()
            }),
            InputRule::UniqueLocDate => {
                let mut seen: HashSet<(&str, NaiveDate)> = HashSet::new();
                let mut violations = Vec::new();
                for (index, row) in view.rows.iter().enumerate() {
                    if let (Cell::Value(location), Cell::Value(date)) = (&row.location, &row.date)
                        && !seen.insert((location.as_str(), *date))
                    {
                        violations.push(Violation::new(index, Severity::Warn));
                    }
                }
                violations
            }
            InputRule::PopulationPositive => view.flag(Severity::Fail, |row| {
                matches!(row.population, Cell::Value(p) if p <= 0)
            }),
            InputRule::NewCasesNonnegative => view.flag(Severity::Warn, |row| {
                matches!(row.new_cases, Cell::Value(c) if c < 0)
            }),
            InputRule::MaxDateNotFuture { reference_date } => view.flag(Severity::Warn, |row| {
                matches!(row.date, Cell::Value(d) if d > *reference_date)
            }),
        }
    }

    fn note(&self, view: &InputView, violations: &[Violation]) -> String {
        let count = violations.len();
        match self {
            InputRule::KeysNotNull => {
                format!("{} row(s) with null keys (location, date, population)", count)
            }
            InputRule::UniqueLocDate => format!("duplicate (location, date): {}", count),
            InputRule::PopulationPositive => format!("population<=0: {}", count),
            InputRule::NewCasesNonnegative => format!("new_cases<0: {}", count),
            InputRule::MaxDateNotFuture { reference_date } => {
                let max_date = view
                    .rows
                    .iter()
                    .filter_map(|row| match row.date {
                        Cell::Value(d) => Some(d),
                        _ => None,
                    })
                    .max();
                match max_date {
                    None => "no readable dates".to_string(),
                    Some(max) if max > *reference_date => format!(
                        "max(date)={} > reference {} ({} row(s))",
                        max, reference_date, count
                    ),
                    Some(max) => format!("max(date)={} ok", max),
                }
            }
        }
    }
}
