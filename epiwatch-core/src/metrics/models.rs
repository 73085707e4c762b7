//! Metric record models.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Number of calendar days in an incidence window and in a growth week.
pub const WINDOW_DAYS: u32 = 7;

/// Incidence scale: cases per this many inhabitants.
pub const PER_INHABITANTS: f64 = 100_000.0;

/// Trailing 7-day incidence for one location and date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidenceRecord {
    pub location: String,
    /// Last day of the trailing window
    pub week_ending_date: NaiveDate,
    /// Cases per 100,000 inhabitants over the window
    pub incidence_7d: f64,
    /// Calendar days with data in the window
    pub window_days: u32,
}

/// Growth factor value for one week.
///
/// A zero previous week has no meaningful ratio; it is represented as
/// `Undefined` rather than NaN or infinity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum GrowthFactor {
    /// `cases_this_week / cases_previous_week`
    Value(f64),
    /// The previous week had zero cases
    Undefined,
}

impl GrowthFactor {
    /// Divides this week's cases by the previous week's, guarding zero.
    #[allow(clippy::cast_precision_loss)]
    pub fn ratio(cases_this_week: i64, cases_previous_week: i64) -> Self {
        if cases_previous_week == 0 {
            GrowthFactor::Undefined
        } else {
            GrowthFactor::Value(cases_this_week as f64 / cases_previous_week as f64)
        }
    }

    /// The ratio, if defined.
    pub fn value(&self) -> Option<f64> {
        match self {
            GrowthFactor::Value(v) => Some(*v),
            GrowthFactor::Undefined => None,
        }
    }

    /// True for a finite, strictly positive ratio.
    pub fn is_valid(&self) -> bool {
        matches!(self, GrowthFactor::Value(v) if v.is_finite() && *v > 0.0)
    }
}

/// Week-over-week growth for one location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrowthRecord {
    pub location: String,
    /// Last day of the week, on the configured boundary weekday
    pub week_ending_date: NaiveDate,
    pub cases_this_week: i64,
    pub cases_previous_week: i64,
    pub growth_factor_7d: GrowthFactor,
}
