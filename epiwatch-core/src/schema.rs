//! Column naming and lenient value reading.
//!
//! External sources name their columns inconsistently (`entity`, `country`,
//! `Date`, headers carrying a byte-order mark). This module maps those headers
//! onto the canonical observation fields and reads raw JSON values without
//! failing, so that the input rules can run before anything is coerced.

use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::RawRecordSet;

/// Canonical observation fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Location,
    Date,
    NewCases,
    PeopleVaccinated,
    Population,
}

impl Field {
    /// All fields in canonical column order.
    pub const ALL: [Field; 5] = [
        Field::Location,
        Field::Date,
        Field::NewCases,
        Field::PeopleVaccinated,
        Field::Population,
    ];

    /// Canonical column name.
    pub fn name(&self) -> &'static str {
        match self {
            Field::Location => "location",
            Field::Date => "date",
            Field::NewCases => "new_cases",
            Field::PeopleVaccinated => "people_vaccinated",
            Field::Population => "population",
        }
    }

    /// Whether the column must be present for the record set to be usable.
    pub fn is_required(&self) -> bool {
        !matches!(self, Field::PeopleVaccinated)
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Accepted header names per canonical field, in priority order.
///
/// Candidates are compared against normalized headers, so they should be
/// lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnAliases {
    pub location: Vec<String>,
    pub date: Vec<String>,
    pub new_cases: Vec<String>,
    pub people_vaccinated: Vec<String>,
    pub population: Vec<String>,
}

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| (*s).to_string()).collect()
}

impl Default for ColumnAliases {
    fn default() -> Self {
        Self {
            location: names(&[
                "location",
                "entity",
                "country",
                "country_name",
                "location_name",
                "place",
            ]),
            date: names(&["date", "day"]),
            new_cases: names(&["new_cases", "new_cases_daily"]),
            people_vaccinated: names(&["people_vaccinated", "people_with_at_least_one_dose"]),
            population: names(&["population", "pop"]),
        }
    }
}

impl ColumnAliases {
    /// Returns the accepted header names for a field.
    pub fn candidates(&self, field: Field) -> &[String] {
        match field {
            Field::Location => &self.location,
            Field::Date => &self.date,
            Field::NewCases => &self.new_cases,
            Field::PeopleVaccinated => &self.people_vaccinated,
            Field::Population => &self.population,
        }
    }

    /// Builder method to add an alias for a field.
    pub fn with_alias(mut self, field: Field, alias: impl Into<String>) -> Self {
        let alias = normalize_header(&alias.into());
        let list = match field {
            Field::Location => &mut self.location,
            Field::Date => &mut self.date,
            Field::NewCases => &mut self.new_cases,
            Field::PeopleVaccinated => &mut self.people_vaccinated,
            Field::Population => &mut self.population,
        };
        if !list.contains(&alias) {
            list.push(alias);
        }
        self
    }
}

/// Normalizes a raw header: strips byte-order marks, trims, lowercases.
pub fn normalize_header(header: &str) -> String {
    header.replace('\u{feff}', "").trim().to_lowercase()
}

/// Resolved mapping from canonical fields to the raw keys used by a record set.
///
/// Sources are not required to spell a header the same way on every row, so
/// a field may resolve to several raw keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMap {
    resolved: BTreeMap<Field, Vec<String>>,
}

impl ColumnMap {
    /// Resolves the columns of a raw record set against the aliases.
    ///
    /// Headers are collected from every row in first-seen order. Every raw
    /// header whose normalized name is an accepted alias is kept for its
    /// field, ordered by alias priority and then by first appearance.
    pub fn resolve(records: &RawRecordSet, aliases: &ColumnAliases) -> Self {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut normalized: Vec<(String, &str)> = Vec::new();

        for row in &records.rows {
            if let Some(obj) = row.as_object() {
                for key in obj.keys() {
                    if seen.insert(key.as_str()) {
                        normalized.push((normalize_header(key), key.as_str()));
                    }
                }
            }
        }

        let mut resolved = BTreeMap::new();
        for field in Field::ALL {
            let keys: Vec<String> = aliases
                .candidates(field)
                .iter()
                .flat_map(|candidate| {
                    normalized
                        .iter()
                        .filter(move |(name, _)| name == candidate)
                        .map(|(_, raw)| (*raw).to_string())
                })
                .collect();

            for raw_key in keys.iter().filter(|k| k.as_str() != field.name()) {
                tracing::debug!("Mapping column '{}' onto '{}'", raw_key, field);
            }
            if !keys.is_empty() {
                resolved.insert(field, keys);
            }
        }

        Self { resolved }
    }

    /// Preferred raw key holding the given field, if any row carries it.
    pub fn column_for(&self, field: Field) -> Option<&str> {
        self.columns_for(field).first().map(String::as_str)
    }

    /// Every raw key resolved for the given field, in lookup order.
    pub fn columns_for(&self, field: Field) -> &[String] {
        self.resolved.get(&field).map_or(&[], Vec::as_slice)
    }

    /// Reads the raw value of a field from a row.
    ///
    /// The first resolved key with a non-null value wins; a row holding only
    /// nulls under the resolved keys reads as null.
    pub fn get<'a>(&self, row: &'a Value, field: Field) -> Option<&'a Value> {
        let obj = row.as_object()?;
        let mut present = None;
        for key in self.columns_for(field) {
            match obj.get(key) {
                Some(null @ Value::Null) => {
                    present.get_or_insert(null);
                }
                Some(value) => return Some(value),
                None => {}
            }
        }
        present
    }
}

/// Outcome of reading one raw value.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell<T> {
    /// Absent, JSON null, or an empty/null-token string
    Null,
    /// Successfully read value
    Value(T),
    /// Present but uncoercible, with the reason
    Invalid(String),
}

impl<T> Cell<T> {
    /// Returns the value when one was read.
    pub fn value(self) -> Option<T> {
        match self {
            Cell::Value(v) => Some(v),
            _ => None,
        }
    }

    /// True when the cell holds no value at all.
    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }
}

const NULL_TOKENS: [&str; 4] = ["", "na", "nan", "null"];

fn is_null_token(s: &str) -> bool {
    let lowered = s.trim().to_ascii_lowercase();
    NULL_TOKENS.contains(&lowered.as_str())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Reads a text identifier.
pub fn read_text(value: Option<&Value>) -> Cell<String> {
    match value {
        None | Some(Value::Null) => Cell::Null,
        Some(Value::String(s)) if s.trim().is_empty() => Cell::Null,
        Some(Value::String(s)) => Cell::Value(s.trim().to_string()),
        Some(other) => Cell::Invalid(format!("expected text, found {}", json_kind(other))),
    }
}

fn integral(f: f64) -> Cell<i64> {
    // i64::MAX is not exactly representable; compare against 2^63.
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    if !f.is_finite() {
        return Cell::Invalid(format!("{} is not a finite number", f));
    }
    if f.fract() != 0.0 {
        return Cell::Invalid(format!("{} has a fractional part", f));
    }
    if f >= LIMIT || f < -LIMIT {
        return Cell::Invalid(format!("{} is out of integer range", f));
    }
    #[allow(clippy::cast_possible_truncation)]
    Cell::Value(f as i64)
}

/// Reads an integer from a JSON number or numeric string.
///
/// Integral floats such as `12.0` are accepted since CSV exports commonly
/// render counts that way.
pub fn read_integer(value: Option<&Value>) -> Cell<i64> {
    match value {
        None | Some(Value::Null) => Cell::Null,
        Some(Value::Number(n)) => match n.as_i64() {
            Some(i) => Cell::Value(i),
            None => match n.as_f64() {
                Some(f) => integral(f),
                None => Cell::Invalid(format!("{} is out of integer range", n)),
            },
        },
        Some(Value::String(s)) if is_null_token(s) => Cell::Null,
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if let Ok(i) = trimmed.parse::<i64>() {
                Cell::Value(i)
            } else if let Ok(f) = trimmed.parse::<f64>() {
                integral(f)
            } else {
                Cell::Invalid(format!("'{}' is not a number", s))
            }
        }
        Some(other) => Cell::Invalid(format!("expected a number, found {}", json_kind(other))),
    }
}

/// Reads a calendar date from `YYYY-MM-DD` or an ISO date-time string.
pub fn read_date(value: Option<&Value>) -> Cell<NaiveDate> {
    match value {
        None | Some(Value::Null) => Cell::Null,
        Some(Value::String(s)) if is_null_token(s) => Cell::Null,
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
                return Cell::Value(date);
            }
            let date_part = trimmed.get(..10);
            let separator = trimmed.get(10..11);
            if let (Some(date_part), Some("T" | " ")) = (date_part, separator)
                && let Ok(date) = NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
            {
                return Cell::Value(date);
            }
            Cell::Invalid(format!("cannot parse '{}' as a date", s))
        }
        Some(other) => Cell::Invalid(format!("expected a date string, found {}", json_kind(other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(rows: Vec<Value>) -> RawRecordSet {
        RawRecordSet::new("test", rows)
    }

    #[test]
    fn test_normalize_header() {
        assert_eq!(normalize_header("\u{feff}Location "), "location");
        assert_eq!(normalize_header("  NEW_CASES"), "new_cases");
    }

    #[test]
    fn test_resolve_aliases() {
        let records = raw(vec![json!({
            "\u{feff}Entity": "Ecuador",
            "Day": "2021-07-01",
            "new_cases": 10,
            "pop": 17000000
        })]);

        let map = ColumnMap::resolve(&records, &ColumnAliases::default());

        assert_eq!(map.column_for(Field::Location), Some("\u{feff}Entity"));
        assert_eq!(map.column_for(Field::Date), Some("Day"));
        assert_eq!(map.column_for(Field::NewCases), Some("new_cases"));
        assert_eq!(map.column_for(Field::Population), Some("pop"));
        assert_eq!(map.column_for(Field::PeopleVaccinated), None);
    }

    #[test]
    fn test_resolve_prefers_earlier_candidate() {
        let records = raw(vec![json!({"country": "Peru", "location": "Perú"})]);

        let map = ColumnMap::resolve(&records, &ColumnAliases::default());
        let row = &records.rows[0];

        assert_eq!(map.column_for(Field::Location), Some("location"));
        assert_eq!(read_text(map.get(row, Field::Location)), Cell::Value("Perú".to_string()));
    }

    #[test]
    fn test_resolve_headers_from_later_rows() {
        let records = raw(vec![
            json!({"location": "Ecuador"}),
            json!({"location": "Ecuador", "people_with_at_least_one_dose": 5}),
        ]);

        let map = ColumnMap::resolve(&records, &ColumnAliases::default());

        assert_eq!(
            map.column_for(Field::PeopleVaccinated),
            Some("people_with_at_least_one_dose")
        );
    }

    #[test]
    fn test_resolve_mixed_spellings_across_rows() {
        let records = raw(vec![
            json!({"Location": "A", "DATE": "2021-07-01"}),
            json!({"location": "B", "date": "2021-07-02"}),
        ]);

        let map = ColumnMap::resolve(&records, &ColumnAliases::default());

        assert_eq!(map.columns_for(Field::Location), ["Location", "location"]);
        assert_eq!(read_text(map.get(&records.rows[0], Field::Location)), Cell::Value("A".to_string()));
        assert_eq!(read_text(map.get(&records.rows[1], Field::Location)), Cell::Value("B".to_string()));
        assert_eq!(
            read_date(map.get(&records.rows[1], Field::Date)),
            Cell::Value(NaiveDate::from_ymd_opt(2021, 7, 2).unwrap())
        );
    }

    #[test]
    fn test_get_falls_back_to_lower_priority_alias() {
        let records = raw(vec![
            json!({"location": "Ecuador"}),
            json!({"country": "Peru"}),
            json!({"location": null, "country": "Chile"}),
            json!({"location": null}),
        ]);

        let map = ColumnMap::resolve(&records, &ColumnAliases::default());
        let read = |i: usize| read_text(map.get(&records.rows[i], Field::Location));

        assert_eq!(read(0), Cell::Value("Ecuador".to_string()));
        assert_eq!(read(1), Cell::Value("Peru".to_string()));
        assert_eq!(read(2), Cell::Value("Chile".to_string()));
        assert_eq!(read(3), Cell::Null);
        assert_eq!(map.get(&records.rows[3], Field::Location), Some(&Value::Null));
        assert_eq!(map.get(&records.rows[1], Field::Date), None);
    }

    #[test]
    fn test_custom_alias() {
        let aliases = ColumnAliases::default().with_alias(Field::NewCases, "Cases_Today");
        let records = raw(vec![json!({"cases_today": 3})]);

        let map = ColumnMap::resolve(&records, &aliases);
        assert_eq!(map.column_for(Field::NewCases), Some("cases_today"));
    }

    #[test]
    fn test_read_integer() {
        assert_eq!(read_integer(Some(&json!(42))), Cell::Value(42));
        assert_eq!(read_integer(Some(&json!(-7))), Cell::Value(-7));
        assert_eq!(read_integer(Some(&json!(12.0))), Cell::Value(12));
        assert_eq!(read_integer(Some(&json!(" 1802 "))), Cell::Value(1802));
        assert_eq!(read_integer(Some(&json!("35000.0"))), Cell::Value(35000));
        assert_eq!(read_integer(Some(&json!(null))), Cell::Null);
        assert_eq!(read_integer(Some(&json!("NaN"))), Cell::Null);
        assert_eq!(read_integer(None), Cell::Null);

        assert!(matches!(read_integer(Some(&json!(12.5))), Cell::Invalid(_)));
        assert!(matches!(read_integer(Some(&json!("abc"))), Cell::Invalid(_)));
        assert!(matches!(read_integer(Some(&json!(true))), Cell::Invalid(_)));
        assert!(matches!(read_integer(Some(&json!([1]))), Cell::Invalid(_)));
        assert!(matches!(read_integer(Some(&json!(1e300))), Cell::Invalid(_)));
    }

    #[test]
    fn test_read_date() {
        let expected = NaiveDate::from_ymd_opt(2021, 7, 1).unwrap();

        assert_eq!(read_date(Some(&json!("2021-07-01"))), Cell::Value(expected));
        assert_eq!(read_date(Some(&json!("2021-07-01T00:00:00"))), Cell::Value(expected));
        assert_eq!(read_date(Some(&json!("2021-07-01 12:30:00"))), Cell::Value(expected));
        assert_eq!(read_date(Some(&json!(""))), Cell::Null);

        assert!(matches!(read_date(Some(&json!("2021-13-45"))), Cell::Invalid(_)));
        assert!(matches!(read_date(Some(&json!("01/07/2021"))), Cell::Invalid(_)));
        assert!(matches!(read_date(Some(&json!(20210701))), Cell::Invalid(_)));
    }

    #[test]
    fn test_read_text() {
        assert_eq!(read_text(Some(&json!(" Ecuador "))), Cell::Value("Ecuador".to_string()));
        assert_eq!(read_text(Some(&json!("  "))), Cell::Null);
        assert!(matches!(read_text(Some(&json!(593))), Cell::Invalid(_)));
    }
}
