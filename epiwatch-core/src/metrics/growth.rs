//! Week-over-week growth factor.

use std::collections::BTreeMap;

use chrono::{Datelike, Days, NaiveDate, Weekday};

use super::models::{GrowthFactor, GrowthRecord, WINDOW_DAYS};
use crate::error::{EpiwatchError, Result};
use crate::models::Observation;

/// Last day of the week containing `date`, for weeks ending on `week_ending`.
pub fn week_ending_date(date: NaiveDate, week_ending: Weekday) -> Result<NaiveDate> {
    date.iter_days()
        .take(WINDOW_DAYS as usize)
        .find(|day| day.weekday() == week_ending)
        .ok_or_else(|| EpiwatchError::overflow(format!("week boundary after {}", date)))
}

/// Computes growth records for one location.
///
/// Rows are bucketed into non-overlapping weeks. A week with any null case
/// count is incomplete: it yields no record and cannot serve as the previous
/// week of the next one. Only a week whose immediately preceding calendar
/// week is present and complete yields a record, so the first week never does.
pub(super) fn location_growth(
    location: &str,
    rows: &[&Observation],
    week_ending: Weekday,
) -> Result<Vec<GrowthRecord>> {
    let mut weeks: BTreeMap<NaiveDate, Option<i64>> = BTreeMap::new();

    for row in rows {
        let Some(date) = row.date else { continue };
        let week_end = week_ending_date(date, week_ending)?;
        let entry = weeks.entry(week_end).or_insert(Some(0));
        *entry = match (*entry, row.new_cases) {
            (Some(sum), Some(cases)) => Some(sum.checked_add(cases).ok_or_else(|| {
                EpiwatchError::overflow(format!(
                    "weekly case sum for '{}' ending {}",
                    location, week_end
                ))
            })?),
            _ => None,
        };
    }

    let mut records = Vec::new();
    let mut previous: Option<(NaiveDate, Option<i64>)> = None;

    for (week_end, cases) in weeks {
        let expected_previous = week_end.checked_sub_days(Days::new(u64::from(WINDOW_DAYS)));

        if let (Some(this_week), Some((prev_end, Some(prev_week)))) = (cases, previous)
            && Some(prev_end) == expected_previous
        {
            records.push(GrowthRecord {
                location: location.to_string(),
                week_ending_date: week_end,
                cases_this_week: this_week,
                cases_previous_week: prev_week,
                growth_factor_7d: GrowthFactor::ratio(this_week, prev_week),
            });
        }

        previous = Some((week_end, cases));
    }

    Ok(records)
}
