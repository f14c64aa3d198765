use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A calendar month, the accounting period of a resident ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MonthKey {
    pub year: i32,
    pub month: u32,
}

impl MonthKey {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(|_| Self { year, month })
    }

    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    pub fn last_day(&self) -> NaiveDate {
        self.next().first_day().pred_opt().unwrap_or(NaiveDate::MAX)
    }

    /// Number of days in the month.
    pub fn days(&self) -> i64 {
        (self.last_day() - self.first_day()).num_days() + 1
    }

    pub fn previous(&self) -> Self {
        let date = self.first_day() - Months::new(1);
        Self::of(date)
    }

    pub fn next(&self) -> Self {
        let date = self.first_day() + Months::new(1);
        Self::of(date)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        Self::of(date) == *self
    }

    pub fn as_string(&self) -> String {
        format!("{:04}-{:02}", self.year, self.month)
    }

    pub fn parse(s: &str) -> Option<Self> {
        let (year, month) = s.trim().split_once('-')?;
        Self::new(year.parse().ok()?, month.parse().ok()?)
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// A closed date range; `end = None` means open-ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateInterval {
    pub start: NaiveDate,
    pub end: Option<NaiveDate>,
}

impl DateInterval {
    pub fn new(start: NaiveDate, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    pub fn is_valid(&self) -> bool {
        self.end.is_none_or(|end| self.start <= end)
    }

    /// Intersection with another interval, `None` when they do not overlap.
    pub fn intersect(&self, other: &DateInterval) -> Option<DateInterval> {
        let start = self.start.max(other.start);
        let end = match (self.end, other.end) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (Some(a), None) | (None, Some(a)) => Some(a),
            (None, None) => None,
        };
        let interval = DateInterval { start, end };
        interval.is_valid().then_some(interval)
    }

    /// The part of this interval that falls inside `month`.
    pub fn within_month(&self, month: MonthKey) -> Option<DateInterval> {
        self.intersect(&DateInterval::new(month.first_day(), Some(month.last_day())))
    }

    /// Inclusive day count; open-ended intervals have no finite length.
    pub fn days(&self) -> Option<i64> {
        self.end.map(|end| (end - self.start).num_days() + 1)
    }

    pub fn covers_month(&self, month: MonthKey) -> bool {
        self.start <= month.first_day() && self.end.is_none_or(|end| end >= month.last_day())
    }
}

/// Normalize an adjustment range to whole months: start snaps to the first day of its
/// month and end to the last day of its month.
pub fn month_bounds(start: NaiveDate, end: NaiveDate) -> (NaiveDate, NaiveDate) {
    (MonthKey::of(start).first_day(), MonthKey::of(end).last_day())
}
