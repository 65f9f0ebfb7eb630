//! View analytics derived from access logs.

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::Serialize;
use utoipa::ToSchema;

/// Number of calendar days covered by the daily histogram, today included.
pub const HISTOGRAM_DAYS: u64 = 7;

/// View count for one UTC calendar date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct DailyViews {
    /// Calendar date (UTC).
    pub date: NaiveDate,
    /// Views recorded on that date.
    pub views: u64,
}

/// First date covered by the histogram ending on `today`.
#[must_use]
pub fn histogram_start(today: NaiveDate) -> NaiveDate {
    today
        .checked_sub_days(Days::new(HISTOGRAM_DAYS - 1))
        .unwrap_or(NaiveDate::MIN)
}

/// Instant at which the histogram window opens (midnight UTC of the
/// first covered date).
#[must_use]
pub fn histogram_window_start(now: DateTime<Utc>) -> DateTime<Utc> {
    histogram_start(now.date_naive())
        .and_hms_opt(0, 0, 0)
        .map_or(now, |midnight| midnight.and_utc())
}

/// Builds a zero-filled histogram of exactly [`HISTOGRAM_DAYS`] entries,
/// oldest first, ending on `today`. Counts for dates outside the window
/// are ignored.
#[must_use]
pub fn daily_histogram(today: NaiveDate, counts: &[(NaiveDate, u64)]) -> Vec<DailyViews> {
    histogram_start(today)
        .iter_days()
        .take_while(|date| *date <= today)
        .map(|date| DailyViews {
            date,
            views: counts
                .iter()
                .filter(|(d, _)| *d == date)
                .map(|(_, n)| *n)
                .sum(),
        })
        .collect()
}
