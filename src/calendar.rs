//! Calendar bucketing
//!
//! Every day key in a report is computed in one reference timezone, so a
//! window never mixes local and UTC dates.

use crate::error::{RateError, Result};
use crate::types::{DailyRecord, Timestamp};
use chrono::{Days, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Calendar date identifying one bucket of the reconciled series (`YYYY-MM-DD`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DayKey(NaiveDate);

impl DayKey {
    /// Earliest representable day
    pub const MIN: DayKey = DayKey(NaiveDate::MIN);

    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    /// Build from year/month/day, `None` when the date does not exist
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self)
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }

    /// Day key `days` days earlier, `None` past the calendar's range
    pub fn minus_days(&self, days: u64) -> Option<Self> {
        self.0.checked_sub_days(Days::new(days)).map(Self)
    }

    /// Day key `days` days later, `None` past the calendar's range
    pub fn plus_days(&self, days: u64) -> Option<Self> {
        self.0.checked_add_days(Days::new(days)).map(Self)
    }

    /// Whole days from `earlier` to this day (negative when `earlier` is later)
    pub fn days_since(&self, earlier: DayKey) -> i64 {
        self.0.signed_duration_since(earlier.0).num_days()
    }
}

impl fmt::Display for DayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

impl FromStr for DayKey {
    type Err = RateError;

    fn from_str(s: &str) -> Result<Self> {
        NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map(Self)
            .map_err(|e| RateError::ParseError(format!("Invalid day key '{}': {}", s, e)))
    }
}

impl From<NaiveDate> for DayKey {
    fn from(date: NaiveDate) -> Self {
        Self(date)
    }
}

/// Maps instants to calendar days in a single reference timezone
pub trait DayCalendar: Send + Sync {
    /// Reference timezone for every computation of this calendar
    fn timezone(&self) -> Tz;

    /// Calendar day an instant falls on
    fn day_of(&self, ts: Timestamp) -> DayKey {
        DayKey(ts.with_timezone(&self.timezone()).date_naive())
    }

    /// First instant of a calendar day
    ///
    /// Days whose local midnight is skipped by a DST transition start at the
    /// first valid local time after midnight.
    fn start_of_day(&self, day: DayKey) -> Timestamp {
        let tz = self.timezone();
        let midnight = day.date().and_time(NaiveTime::default());

        (0..=2)
            .filter_map(|hours| midnight.checked_add_signed(Duration::hours(hours)))
            .find_map(|local| tz.from_local_datetime(&local).earliest())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|| Utc.from_utc_datetime(&midnight))
    }

    /// The `days` most recent distinct day keys ending at today, oldest first
    ///
    /// The window stops at the earliest representable day.
    fn window_days(&self, days: u32, now: Timestamp) -> Vec<DayKey> {
        let today = self.day_of(now);
        let reachable = today.days_since(DayKey::MIN).saturating_add(1);
        let count = u64::from(days).min(reachable.max(0) as u64);

        let keys: BTreeSet<DayKey> = (0..count).map_while(|i| today.minus_days(i)).collect();
        keys.into_iter().collect()
    }
}

/// Calendar pinned to an IANA timezone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoneCalendar {
    tz: Tz,
}

impl ZoneCalendar {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    /// UTC calendar
    pub fn utc() -> Self {
        Self { tz: chrono_tz::UTC }
    }

    /// Resolve an IANA timezone name such as `America/Caracas`
    pub fn from_name(name: &str) -> Result<Self> {
        name.parse::<Tz>()
            .map(Self::new)
            .map_err(|e| RateError::CalendarError(format!("Unknown timezone '{}': {}", name, e)))
    }
}

impl Default for ZoneCalendar {
    fn default() -> Self {
        Self::utc()
    }
}

impl DayCalendar for ZoneCalendar {
    fn timezone(&self) -> Tz {
        self.tz
    }
}

/// Chart period selectable by the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HistoryWindow {
    Week,
    Month,
    Quarter,
}

impl HistoryWindow {
    pub const ALL: [HistoryWindow; 3] = [
        HistoryWindow::Week,
        HistoryWindow::Month,
        HistoryWindow::Quarter,
    ];

    /// Number of days covered
    pub fn days(&self) -> u32 {
        match self {
            HistoryWindow::Week => 7,
            HistoryWindow::Month => 30,
            HistoryWindow::Quarter => 90,
        }
    }

    /// Strict conversion from a day count
    pub fn from_days(days: u32) -> Result<Self> {
        match days {
            7 => Ok(HistoryWindow::Week),
            30 => Ok(HistoryWindow::Month),
            90 => Ok(HistoryWindow::Quarter),
            other => Err(RateError::InvalidWindow(other)),
        }
    }

    /// Lenient parse of request input (`"7"`, `"30d"`, ...)
    ///
    /// Anything unrecognised selects the widest window.
    pub fn parse(input: &str) -> Self {
        input
            .trim()
            .trim_end_matches(['d', 'D'])
            .parse::<u32>()
            .ok()
            .and_then(|days| Self::from_days(days).ok())
            .unwrap_or(HistoryWindow::Quarter)
    }

    /// Start of the day `days()` days before today
    pub fn cutoff<C: DayCalendar + ?Sized>(&self, calendar: &C, now: Timestamp) -> Timestamp {
        let first = calendar
            .day_of(now)
            .minus_days(u64::from(self.days()))
            .unwrap_or(DayKey::MIN);
        calendar.start_of_day(first)
    }

    /// Keep the records that fall inside this chart period
    pub fn filter_records<C: DayCalendar + ?Sized>(
        &self,
        records: &[DailyRecord],
        calendar: &C,
        now: Timestamp,
    ) -> Vec<DailyRecord> {
        let cutoff = self.cutoff(calendar, now);
        records
            .iter()
            .filter(|record| record.timestamp >= cutoff)
            .copied()
            .collect()
    }
}

impl Default for HistoryWindow {
    fn default() -> Self {
        HistoryWindow::Quarter
    }
}

impl fmt::Display for HistoryWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}d", self.days())
    }
}
