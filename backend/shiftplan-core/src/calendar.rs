// src/calendar.rs
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use thiserror::Error;

static YEAR_MONTH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})-(\d{1,2})$").expect("year-month pattern compiles"));
static SHIFT_TIME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([01]?\d|2[0-3]):([0-5]\d)$").expect("shift time pattern compiles"));

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CalendarError {
    #[error("Invalid month '{0}', expected YYYY-MM")]
    InvalidMonth(String),
    #[error("Invalid time '{0}', expected HH:mm (24h)")]
    InvalidTime(String),
}

// --- Months ---

/// A calendar month, written `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct YearMonth {
    year: i32,
    month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        // Both ends of the month must be representable.
        NaiveDate::from_ymd_opt(year, month, 1)?;
        let ym = Self { year, month };
        ym.next_first_day()?;
        Some(ym)
    }

    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
            .unwrap_or(NaiveDate::MIN)
    }

    pub fn last_day(&self) -> NaiveDate {
        self.next_first_day()
            .and_then(|d| d.pred_opt())
            .unwrap_or(NaiveDate::MAX)
    }

    pub fn next(&self) -> Option<Self> {
        let (year, month) = if self.month == 12 {
            (self.year + 1, 1)
        } else {
            (self.year, self.month + 1)
        };
        Self::new(year, month)
    }

    pub fn num_days(&self) -> u32 {
        self.last_day().day()
    }

    /// Every date of the month, in order.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let first = self.first_day();
        let last = self.last_day();
        first.iter_days().take_while(move |d| *d <= last)
    }

    fn next_first_day(&self) -> Option<NaiveDate> {
        if self.month == 12 {
            NaiveDate::from_ymd_opt(self.year + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(self.year, self.month + 1, 1)
        }
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = CalendarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CalendarError::InvalidMonth(s.to_string());
        let caps = YEAR_MONTH_RE.captures(s.trim()).ok_or_else(invalid)?;
        let year: i32 = caps[1].parse().map_err(|_| invalid())?;
        let month: u32 = caps[2].parse().map_err(|_| invalid())?;
        Self::new(year, month).ok_or_else(invalid)
    }
}

impl TryFrom<String> for YearMonth {
    type Error = CalendarError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<YearMonth> for String {
    fn from(value: YearMonth) -> Self {
        value.to_string()
    }
}

/// Every month touched by the inclusive range `[start, end]`. Empty when `end < start`.
pub fn months_in_range(start: NaiveDate, end: NaiveDate) -> Vec<YearMonth> {
    let mut months = Vec::new();
    if end < start {
        return months;
    }
    let last = YearMonth::of(end);
    let mut current = Some(YearMonth::of(start));
    while let Some(month) = current {
        if month > last {
            break;
        }
        months.push(month);
        current = month.next();
    }
    months
}

// --- Day and week arithmetic ---

pub fn is_saturday(date: NaiveDate) -> bool {
    date.weekday() == Weekday::Sat
}

pub fn is_sunday(date: NaiveDate) -> bool {
    date.weekday() == Weekday::Sun
}

/// The Monday of the week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    let back = i64::from(date.weekday().num_days_from_monday());
    date.checked_sub_signed(Duration::days(back)).unwrap_or(date)
}

/// Signed number of Monday-aligned week boundaries from `from` to `to`.
///
/// Negative when `to` lies in an earlier week than `from`.
pub fn weeks_between(from: NaiveDate, to: NaiveDate) -> i64 {
    let days = (week_start(to) - week_start(from)).num_days();
    days.div_euclid(7)
}

/// Inclusive day count of `[from, to]`; zero or negative when `to < from`.
pub fn days_inclusive(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days() + 1
}

/// Folds a possibly negative offset into `[0, n)`. `None` for an empty cycle.
pub fn cyclic_index(x: i64, n: usize) -> Option<usize> {
    if n == 0 {
        return None;
    }
    let n = n as i64;
    Some((((x % n) + n) % n) as usize)
}

/// Lenient `YYYY-MM-DD` parse used for anchors and segment bounds coming from an editor.
pub fn parse_iso_date(value: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").ok()
}

// --- Shift times ---

/// A wall-clock time of day as used in shift definitions (`HH:mm`, 24h).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ShiftTime {
    hour: u32,
    minute: u32,
}

impl ShiftTime {
    pub fn minutes_since_midnight(&self) -> u32 {
        self.hour * 60 + self.minute
    }
}

impl FromStr for ShiftTime {
    type Err = CalendarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = SHIFT_TIME_RE
            .captures(s.trim())
            .ok_or_else(|| CalendarError::InvalidTime(s.to_string()))?;
        let hour = caps[1]
            .parse()
            .map_err(|_| CalendarError::InvalidTime(s.to_string()))?;
        let minute = caps[2]
            .parse()
            .map_err(|_| CalendarError::InvalidTime(s.to_string()))?;
        Ok(Self { hour, minute })
    }
}

impl fmt::Display for ShiftTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// Elapsed hours of a shift, wrapping past midnight when `end <= start`.
///
/// For consumers that need durations; expansion itself treats times as labels.
pub fn shift_hours(start: &str, end: &str) -> Option<Decimal> {
    let start: ShiftTime = start.parse().ok()?;
    let end: ShiftTime = end.parse().ok()?;
    let mut minutes = i64::from(end.minutes_since_midnight())
        - i64::from(start.minutes_since_midnight());
    if minutes <= 0 {
        minutes += 24 * 60;
    }
    Some((Decimal::from(minutes) / dec!(60)).round_dp(2))
}
