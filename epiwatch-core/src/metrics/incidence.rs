//! Trailing 7-day incidence.

use chrono::{Days, NaiveDate};

use super::models::{IncidenceRecord, PER_INHABITANTS, WINDOW_DAYS};
use crate::error::{EpiwatchError, Result};
use crate::models::Observation;

/// All rows of one location sharing a date.
#[derive(Debug)]
struct DayBucket {
    date: NaiveDate,
    /// `None` when any row of the day has null cases
    cases: Option<i64>,
    /// Population of the last row of the day, in load order
    population: Option<i64>,
}

fn day_buckets(location: &str, rows: &[&Observation]) -> Result<Vec<DayBucket>> {
    let mut buckets: Vec<DayBucket> = Vec::new();

    for row in rows {
        let Some(date) = row.date else { continue };

        match buckets.last_mut() {
            Some(bucket) if bucket.date == date => {
                bucket.cases = match (bucket.cases, row.new_cases) {
                    (Some(sum), Some(cases)) => Some(sum.checked_add(cases).ok_or_else(|| {
                        EpiwatchError::overflow(format!(
                            "daily case sum for '{}' on {}",
                            location, date
                        ))
                    })?),
                    _ => None,
                };
                bucket.population = row.population;
            }
            _ => buckets.push(DayBucket {
                date,
                cases: row.new_cases,
                population: row.population,
            }),
        }
    }

    Ok(buckets)
}

/// Computes incidence records for one location.
///
/// `rows` must be sorted by date. A record is produced for a date only when
/// all 7 calendar days ending on it carry data and no case count in the window
/// is null; missing history yields no record rather than a zero.
#[allow(clippy::cast_precision_loss)]
pub(super) fn location_incidence(
    location: &str,
    rows: &[&Observation],
) -> Result<Vec<IncidenceRecord>> {
    let buckets = day_buckets(location, rows)?;
    let span = WINDOW_DAYS as usize;
    let mut records = Vec::new();

    if buckets.len() < span {
        return Ok(records);
    }

    for window in buckets.windows(span) {
        let (Some(first), Some(last)) = (window.first(), window.last()) else {
            continue;
        };

        // Distinct sorted dates spanning exactly 6 days means all 7 are present.
        let lookback = Days::new(u64::from(WINDOW_DAYS.saturating_sub(1)));
        if last.date.checked_sub_days(lookback) != Some(first.date) {
            continue;
        }

        let mut sum: Option<i64> = Some(0);
        for bucket in window {
            sum = match (sum, bucket.cases) {
                (Some(acc), Some(cases)) => Some(acc.checked_add(cases).ok_or_else(|| {
                    EpiwatchError::overflow(format!(
                        "7-day case sum for '{}' ending {}",
                        location, last.date
                    ))
                })?),
                _ => None,
            };
        }

        let (Some(sum), Some(population)) = (sum, last.population) else {
            continue;
        };
        if population <= 0 {
            continue;
        }

        records.push(IncidenceRecord {
            location: location.to_string(),
            week_ending_date: last.date,
            incidence_7d: sum as f64 / population as f64 * PER_INHABITANTS,
            window_days: WINDOW_DAYS,
        });
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn series(start: NaiveDate, cases: &[i64], population: i64) -> Vec<Observation> {
        cases
            .iter()
            .enumerate()
            .map(|(offset, c)| {
                Observation::new(
                    "Ecuador",
                    start + Days::new(offset as u64),
                    *c,
                    population,
                )
            })
            .collect()
    }

    #[test]
    fn test_first_record_needs_seven_days() {
        let rows = series(date(2021, 6, 25), &[100, 200, 300, 250, 302, 350, 300], 17_000_000);
        let refs: Vec<&Observation> = rows.iter().collect();

        let records = location_incidence("Ecuador", &refs).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].week_ending_date, date(2021, 7, 1));
        assert!((records[0].incidence_7d - 10.6).abs() < 0.01);
        assert_eq!(records[0].window_days, 7);
    }

    #[test]
    fn test_fewer_than_seven_days_is_absent() {
        let rows = series(date(2021, 7, 1), &[10, 10, 10, 10, 10, 10], 1000);
        let refs: Vec<&Observation> = rows.iter().collect();

        assert!(location_incidence("Ecuador", &refs).unwrap().is_empty());
    }

    #[test]
    fn test_rolling_windows() {
        let rows = series(date(2021, 7, 1), &[1, 1, 1, 1, 1, 1, 1, 8, 1], 100_000);
        let refs: Vec<&Observation> = rows.iter().collect();

        let records = location_incidence("Ecuador", &refs).unwrap();

        assert_eq!(records.len(), 3);
        assert!((records[0].incidence_7d - 7.0).abs() < 1e-9);
        assert!((records[1].incidence_7d - 14.0).abs() < 1e-9);
        assert!((records[2].incidence_7d - 14.0).abs() < 1e-9);
    }

    #[test]
    fn test_calendar_gap_breaks_window() {
        let mut rows = series(date(2021, 7, 1), &[1; 7], 100_000);
        // Move the last day forward, leaving 2021-07-07 empty.
        rows[6].date = Some(date(2021, 7, 8));
        let refs: Vec<&Observation> = rows.iter().collect();

        assert!(location_incidence("Ecuador", &refs).unwrap().is_empty());
    }

    #[test]
    fn test_null_cases_in_window_is_absent() {
        let mut rows = series(date(2021, 7, 1), &[1; 8], 100_000);
        rows[3].new_cases = None;
        let refs: Vec<&Observation> = rows.iter().collect();

        assert!(location_incidence("Ecuador", &refs).unwrap().is_empty());
    }

    #[test]
    fn test_duplicate_rows_all_contribute() {
        let mut rows = series(date(2021, 7, 1), &[10; 7], 100_000);
        rows.push(Observation::new("Ecuador", date(2021, 7, 7), 5, 100_000));
        let mut refs: Vec<&Observation> = rows.iter().collect();
        refs.sort_by_key(|r| r.date);

        let records = location_incidence("Ecuador", &refs).unwrap();

        assert_eq!(records.len(), 1);
        assert!((records[0].incidence_7d - 75.0).abs() < 1e-9);
    }

    #[test]
    fn test_null_population_is_absent() {
        let mut rows = series(date(2021, 7, 1), &[10; 7], 100_000);
        rows[6].population = None;
        let refs: Vec<&Observation> = rows.iter().collect();

        assert!(location_incidence("Ecuador", &refs).unwrap().is_empty());
    }

    #[test]
    fn test_overflow_is_reported() {
        let rows = series(date(2021, 7, 1), &[i64::MAX, 1, 0, 0, 0, 0, 0], 100_000);
        let refs: Vec<&Observation> = rows.iter().collect();

        let error = location_incidence("Ecuador", &refs).unwrap_err();
        assert!(matches!(error, EpiwatchError::Arithmetic { .. }));
    }
}
