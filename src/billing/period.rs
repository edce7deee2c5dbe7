use std::fmt;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Billing cadence for invoices and retainers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(from = "String", into = "String")]
pub enum PeriodKind {
    Day,
    Week,
    Fortnight,
    Month,
}

impl PeriodKind {
    /// Parses a stored period string. Unrecognized values fall back to `Week`
    /// so old or hand-edited data files keep loading.
    pub fn parse(s: &str) -> PeriodKind {
        match s.trim().to_lowercase().as_str() {
            "day" | "daily" => PeriodKind::Day,
            "fortnight" | "fortnightly" | "biweekly" => PeriodKind::Fortnight,
            "month" | "monthly" => PeriodKind::Month,
            _ => PeriodKind::Week,
        }
    }
}

impl From<String> for PeriodKind {
    fn from(s: String) -> Self {
        PeriodKind::parse(&s)
    }
}

impl From<PeriodKind> for String {
    fn from(kind: PeriodKind) -> Self {
        kind.to_string()
    }
}

impl fmt::Display for PeriodKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PeriodKind::Day => "day",
            PeriodKind::Week => "week",
            PeriodKind::Fortnight => "fortnight",
            PeriodKind::Month => "month",
        };
        f.write_str(name)
    }
}

/// A billing period as a closed interval of wall-clock time. `end` is the
/// last representable instant of the period, so two adjacent periods never
/// share a timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodRange {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl PeriodRange {
    pub fn contains(&self, t: NaiveDateTime) -> bool {
        self.start <= t && t <= self.end
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start.date()
    }

    pub fn end_date(&self) -> NaiveDate {
        self.end.date()
    }
}

/// Returns the billing period of `kind` that contains `anchor`.
///
/// Weeks start on Monday. Fortnights are aligned to the first Monday of the
/// month that contains the week's Monday, in consecutive 14-day blocks, so
/// the cycle resets at each month boundary instead of drifting forever from
/// a fixed epoch.
pub fn range_for(kind: PeriodKind, anchor: NaiveDate) -> PeriodRange {
    let (start, next) = match kind {
        PeriodKind::Day => (anchor, anchor + Duration::days(1)),
        PeriodKind::Week => {
            let monday = monday_of(anchor);
            (monday, monday + Duration::days(7))
        }
        PeriodKind::Fortnight => {
            let start = fortnight_start(anchor);
            (start, start + Duration::days(14))
        }
        PeriodKind::Month => {
            let first = first_of_month(anchor);
            (first, first_of_month(first + Duration::days(32)))
        }
    };
    PeriodRange {
        start: start.and_time(NaiveTime::MIN),
        end: next.and_time(NaiveTime::MIN) - Duration::nanoseconds(1),
    }
}

fn monday_of(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.day0() as i64)
}

fn fortnight_start(anchor: NaiveDate) -> NaiveDate {
    let week_monday = monday_of(anchor);
    // Anchor the cycle to the month containing the week's Monday, which may
    // be the month before `anchor` when the week straddles a boundary.
    let month_first = first_of_month(week_monday);
    let mut first_monday = monday_of(month_first);
    if first_monday < month_first {
        first_monday += Duration::days(7);
    }
    let block = (week_monday - first_monday).num_days() / 14;
    first_monday + Duration::days(14 * block)
}
