use std::{fmt, str::FromStr};

use chrono::{DateTime, Datelike, Days, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::ArchiveError;

/// The six archive windows published by the station.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum WindowKind {
    /// The previous calendar day.
    Yesterday,
    /// The current ISO week (starting Monday), to date.
    ThisWeek,
    /// The current calendar month, to date.
    ThisMonth,
    /// The previous full calendar month.
    LastMonth,
    /// The current calendar year, to date.
    ThisYear,
    /// Everything up to now.
    AllTime,
}

impl WindowKind {
    pub const ALL: [WindowKind; 6] = [
        WindowKind::Yesterday,
        WindowKind::ThisWeek,
        WindowKind::ThisMonth,
        WindowKind::LastMonth,
        WindowKind::ThisYear,
        WindowKind::AllTime,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            WindowKind::Yesterday => "yesterday",
            WindowKind::ThisWeek => "this_week",
            WindowKind::ThisMonth => "this_month",
            WindowKind::LastMonth => "last_month",
            WindowKind::ThisYear => "this_year",
            WindowKind::AllTime => "all_time",
        }
    }
}

impl fmt::Display for WindowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WindowKind {
    type Err = ArchiveError;

    fn from_str(s: &str) -> Result<Self, ArchiveError> {
        WindowKind::ALL
            .into_iter()
            .find(|w| w.as_str() == s)
            .ok_or_else(|| ArchiveError::UnknownWindow(s.to_owned()))
    }
}

/// Half-open interval `[start, end)`. `start == None` is unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: Option<DateTime<Utc>>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Build a window, rejecting `start > end`. `start == end` is a valid,
    /// empty window.
    pub fn checked(
        kind: WindowKind,
        start: Option<DateTime<Utc>>,
        end: DateTime<Utc>,
    ) -> Result<Self, ArchiveError> {
        match start {
            Some(start) if start > end => Err(ArchiveError::InvalidWindowDefinition {
                window: kind,
                start,
                end,
            }),
            _ => Ok(Self { start, end }),
        }
    }

    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        self.start.map_or(true, |start| start <= t) && t < self.end
    }
}

/// Resolve `kind` against `now`, using `tz` for every calendar boundary.
pub fn resolve(kind: WindowKind, now: DateTime<Utc>, tz: Tz) -> Result<TimeWindow, ArchiveError> {
    let today = now.with_timezone(&tz).date_naive();
    let out_of_range = || ArchiveError::CalendarOutOfRange { window: kind, now };
    let midnight = |date: NaiveDate| local_midnight(tz, date).ok_or_else(out_of_range);

    let (start, end) = match kind {
        WindowKind::Yesterday => {
            let yesterday = today.pred_opt().ok_or_else(out_of_range)?;
            (Some(midnight(yesterday)?), midnight(today)?)
        }
        WindowKind::ThisWeek => {
            let monday = today
                .checked_sub_days(Days::new(today.weekday().num_days_from_monday().into()))
                .ok_or_else(out_of_range)?;
            (Some(midnight(monday)?), now)
        }
        WindowKind::ThisMonth => {
            let first = today.with_day(1).ok_or_else(out_of_range)?;
            (Some(midnight(first)?), now)
        }
        WindowKind::LastMonth => {
            let first = today.with_day(1).ok_or_else(out_of_range)?;
            let previous = if today.month() == 1 {
                NaiveDate::from_ymd_opt(today.year() - 1, 12, 1)
            } else {
                NaiveDate::from_ymd_opt(today.year(), today.month() - 1, 1)
            }
            .ok_or_else(out_of_range)?;
            (Some(midnight(previous)?), midnight(first)?)
        }
        WindowKind::ThisYear => {
            let first = NaiveDate::from_ymd_opt(today.year(), 1, 1).ok_or_else(out_of_range)?;
            (Some(midnight(first)?), now)
        }
        WindowKind::AllTime => (None, now),
    };

    TimeWindow::checked(kind, start, end)
}

/// First instant of `date` in `tz`.
///
/// An ambiguous midnight resolves to its earliest mapping. A midnight that
/// falls in a DST gap resolves to the first valid local minute after it.
fn local_midnight(tz: Tz, date: NaiveDate) -> Option<DateTime<Utc>> {
    let midnight = date.and_time(NaiveTime::MIN);
    tz.from_local_datetime(&midnight)
        .earliest()
        .or_else(|| {
            (1..=180).find_map(|m| {
                let shifted = midnight.checked_add_signed(Duration::minutes(m))?;
                tz.from_local_datetime(&shifted).earliest()
            })
        })
        .map(|t| t.with_timezone(&Utc))
}
