//! Non-destructive normalization of loaded rows.
//!
//! The cleaner renames aliased columns onto the canonical fields and coerces
//! values into their types. It never drops or deduplicates rows: duplicates
//! and nulls flagged by the input checks pass through so that they stay
//! visible in the final report.

use crate::error::{EpiwatchError, Result};
use crate::models::{Observation, RawRecordSet, RecordSet};
use crate::quality::CheckResult;
use crate::schema::{Cell, ColumnAliases, ColumnMap, Field, read_date, read_integer, read_text};

/// Turns a raw record set into a typed one.
#[derive(Debug, Clone, Default)]
pub struct Cleaner {
    aliases: ColumnAliases,
}

fn coerce<T>(row: usize, field: Field, cell: Cell<T>) -> Result<Option<T>> {
    match cell {
        Cell::Null => Ok(None),
        Cell::Value(v) => Ok(Some(v)),
        Cell::Invalid(reason) => Err(EpiwatchError::malformed(row, field.name(), reason)),
    }
}

impl Cleaner {
    /// Creates a cleaner that resolves columns through `aliases`.
    pub fn new(aliases: ColumnAliases) -> Self {
        Self { aliases }
    }

    /// Renames and coerces every row.
    ///
    /// `input_checks` are the verdicts of the input stage; they are reported
    /// alongside the cleaned set but never used to filter rows.
    ///
    /// # Errors
    /// - `MalformedInput` for the first row that is not an object, checked
    ///   before any column is resolved
    /// - `MissingColumn` if a required column resolves on no row
    /// - `MalformedInput` for the first row holding an uncoercible value
    pub fn clean(&self, records: &RawRecordSet, input_checks: &[CheckResult]) -> Result<RecordSet> {
        if let Some(index) = records.rows.iter().position(|raw| !raw.is_object()) {
            return Err(EpiwatchError::malformed(
                index,
                "*",
                "row is not a JSON object",
            ));
        }

        let columns = ColumnMap::resolve(records, &self.aliases);

        if !records.is_empty() {
            for field in Field::ALL.into_iter().filter(Field::is_required) {
                if columns.column_for(field).is_none() {
                    return Err(EpiwatchError::missing_column(
                        field.name(),
                        self.aliases.candidates(field),
                    ));
                }
            }
        }

        let mut rows = Vec::with_capacity(records.len());
        for (index, raw) in records.rows.iter().enumerate() {
            rows.push(Observation {
                location: coerce(index, Field::Location, read_text(columns.get(raw, Field::Location)))?,
                date: coerce(index, Field::Date, read_date(columns.get(raw, Field::Date)))?,
                new_cases: coerce(
                    index,
                    Field::NewCases,
                    read_integer(columns.get(raw, Field::NewCases)),
                )?,
                population: coerce(
                    index,
                    Field::Population,
                    read_integer(columns.get(raw, Field::Population)),
                )?,
                people_vaccinated: coerce(
                    index,
                    Field::PeopleVaccinated,
                    read_integer(columns.get(raw, Field::PeopleVaccinated)),
                )?,
            });
        }

        let advisories = input_checks.iter().filter(|c| c.is_advisory()).count();
        tracing::info!(
            rows = rows.len(),
            advisories,
            "Cleaned '{}': rows carried through unchanged",
            records.source
        );

        Ok(RecordSet::new(records.source.clone(), rows))
    }
}
