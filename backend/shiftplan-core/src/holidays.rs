// src/holidays.rs
use chrono::{Datelike, Duration, NaiveDate};
use std::collections::BTreeSet;
use tracing::debug;

use crate::calendar::YearMonth;

/// Easter Sunday (Gregorian) by the Meeus/Jones/Butcher computus.
pub fn easter_sunday(year: i32) -> Option<NaiveDate> {
    let a = year.rem_euclid(19);
    let b = year.div_euclid(100);
    let c = year.rem_euclid(100);
    let d = b.div_euclid(4);
    let e = b.rem_euclid(4);
    let f = (b + 8).div_euclid(25);
    let g = (b - f + 1).div_euclid(3);
    let h = (19 * a + b - d - g + 15).rem_euclid(30);
    let i = c.div_euclid(4);
    let k = c.rem_euclid(4);
    let l = (32 + 2 * e + 2 * i - h - k).rem_euclid(7);
    let m = (a + 11 * h + 22 * l).div_euclid(451);
    let n = h + l - 7 * m + 114;
    let month = n.div_euclid(31);
    let day = n.rem_euclid(31) + 1;
    NaiveDate::from_ymd_opt(year, u32::try_from(month).ok()?, u32::try_from(day).ok()?)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedHoliday {
    pub month: u32,
    pub day: u32,
    pub name: &'static str,
}

/// A holiday at a fixed day offset from Easter Sunday.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovableHoliday {
    pub days_after_easter: i64,
    pub name: &'static str,
}

pub trait HolidayCalendar {
    fn named_holidays_for_year(&self, year: i32) -> Vec<(NaiveDate, &'static str)>;

    fn holidays_for_year(&self, year: i32) -> BTreeSet<NaiveDate> {
        self.named_holidays_for_year(year)
            .into_iter()
            .map(|(date, _)| date)
            .collect()
    }

    /// Union over every year touched by `[start, end]`, clipped to the range.
    fn holidays_in_range(&self, start: NaiveDate, end: NaiveDate) -> BTreeSet<NaiveDate> {
        if end < start {
            return BTreeSet::new();
        }
        (start.year()..=end.year())
            .flat_map(|year| self.holidays_for_year(year))
            .filter(|date| *date >= start && *date <= end)
            .collect()
    }
}

/// Public-holiday rules: a fixed-date list plus Easter-relative holidays.
///
/// The default is the Polish calendar; swap the fixed list to retarget another locale.
#[derive(Debug, Clone)]
pub struct HolidayRules {
    fixed: Vec<FixedHoliday>,
    movable: Vec<MovableHoliday>,
}

impl HolidayRules {
    pub fn new(fixed: Vec<FixedHoliday>, movable: Vec<MovableHoliday>) -> Self {
        Self { fixed, movable }
    }

    pub fn polish() -> Self {
        let fixed = vec![
            FixedHoliday { month: 1, day: 1, name: "New Year's Day" },
            FixedHoliday { month: 1, day: 6, name: "Epiphany" },
            FixedHoliday { month: 5, day: 1, name: "Labour Day" },
            FixedHoliday { month: 5, day: 3, name: "Constitution Day" },
            FixedHoliday { month: 8, day: 15, name: "Assumption Day" },
            FixedHoliday { month: 11, day: 1, name: "All Saints' Day" },
            FixedHoliday { month: 11, day: 11, name: "Independence Day" },
            FixedHoliday { month: 12, day: 25, name: "Christmas Day" },
            FixedHoliday { month: 12, day: 26, name: "Second Day of Christmas" },
        ];
        let movable = vec![
            MovableHoliday { days_after_easter: 0, name: "Easter Sunday" },
            MovableHoliday { days_after_easter: 1, name: "Easter Monday" },
            MovableHoliday { days_after_easter: 49, name: "Pentecost" },
            MovableHoliday { days_after_easter: 60, name: "Corpus Christi" },
        ];
        Self::new(fixed, movable)
    }
}

impl Default for HolidayRules {
    fn default() -> Self {
        Self::polish()
    }
}

impl HolidayCalendar for HolidayRules {
    fn named_holidays_for_year(&self, year: i32) -> Vec<(NaiveDate, &'static str)> {
        let mut holidays: Vec<(NaiveDate, &'static str)> = self
            .fixed
            .iter()
            .filter_map(|h| NaiveDate::from_ymd_opt(year, h.month, h.day).map(|d| (d, h.name)))
            .collect();

        match easter_sunday(year) {
            Some(easter) => holidays.extend(self.movable.iter().filter_map(|h| {
                easter
                    .checked_add_signed(Duration::days(h.days_after_easter))
                    .map(|d| (d, h.name))
            })),
            None => debug!("No Easter date for year {}, skipping movable holidays", year),
        }

        holidays.sort();
        holidays
    }
}

/// Where the expander looks holidays up.
pub trait HolidayLookup {
    fn is_holiday(&self, date: NaiveDate) -> bool;

    /// Every holiday in `[from, to]`, when the source can list them without probing each day.
    fn holidays_between(&self, _from: NaiveDate, _to: NaiveDate) -> Option<Vec<NaiveDate>> {
        None
    }
}

/// Adapts a bare `Fn(NaiveDate) -> bool` to [`HolidayLookup`]; it can only be asked day by day.
#[derive(Debug, Clone, Copy)]
pub struct HolidayPredicate<F>(pub F);

impl<F> HolidayLookup for HolidayPredicate<F>
where
    F: Fn(NaiveDate) -> bool,
{
    fn is_holiday(&self, date: NaiveDate) -> bool {
        (self.0)(date)
    }
}

/// A precomputed set of holiday dates.
///
/// It must cover every date the expander counts over, see
/// [`holiday_window`](crate::expander::holiday_window).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HolidaySet(BTreeSet<NaiveDate>);

impl HolidaySet {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn for_range<C: HolidayCalendar + ?Sized>(
        calendar: &C,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Self {
        Self(calendar.holidays_in_range(start, end))
    }

    pub fn for_month<C: HolidayCalendar + ?Sized>(calendar: &C, month: YearMonth) -> Self {
        Self::for_range(calendar, month.first_day(), month.last_day())
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.0.contains(&date)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NaiveDate> {
        self.0.iter()
    }

    pub fn as_predicate(&self) -> impl Fn(NaiveDate) -> bool + '_ {
        move |date| self.contains(date)
    }
}

impl HolidayLookup for HolidaySet {
    fn is_holiday(&self, date: NaiveDate) -> bool {
        self.contains(date)
    }

    fn holidays_between(&self, from: NaiveDate, to: NaiveDate) -> Option<Vec<NaiveDate>> {
        if to < from {
            return Some(Vec::new());
        }
        Some(self.0.range(from..=to).copied().collect())
    }
}

impl From<BTreeSet<NaiveDate>> for HolidaySet {
    fn from(value: BTreeSet<NaiveDate>) -> Self {
        Self(value)
    }
}

impl FromIterator<NaiveDate> for HolidaySet {
    fn from_iter<T: IntoIterator<Item = NaiveDate>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(date_str: &str) -> NaiveDate {
        NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
            .unwrap_or_else(|_| panic!("Invalid date string format: {}", date_str))
    }

    #[test]
    fn computus_matches_known_easter_dates() {
        assert_eq!(easter_sunday(2000), Some(d("2000-04-23")));
        assert_eq!(easter_sunday(2019), Some(d("2019-04-21")));
        assert_eq!(easter_sunday(2024), Some(d("2024-03-31")));
        assert_eq!(easter_sunday(2025), Some(d("2025-04-20")));
        assert_eq!(easter_sunday(2038), Some(d("2038-04-25")));
        assert_eq!(easter_sunday(1818), Some(d("1818-03-22")));
    }

    #[test]
    fn polish_year_has_thirteen_holidays() {
        let holidays = HolidayRules::polish().holidays_for_year(2025);
        assert_eq!(holidays.len(), 13);
        for date in [
            "2025-01-01", "2025-01-06", "2025-04-20", "2025-04-21", "2025-05-01", "2025-05-03",
            "2025-06-08", "2025-06-19", "2025-08-15", "2025-11-01", "2025-11-11", "2025-12-25",
            "2025-12-26",
        ] {
            assert!(holidays.contains(&d(date)), "missing {}", date);
        }
    }

    #[test]
    fn named_holidays_are_sorted_by_date() {
        let named = HolidayRules::polish().named_holidays_for_year(2024);
        assert_eq!(named.first(), Some(&(d("2024-01-01"), "New Year's Day")));
        assert!(named.contains(&(d("2024-04-01"), "Easter Monday")));
        assert!(named.windows(2).all(|w| w[0].0 <= w[1].0));
    }

    #[test]
    fn range_spanning_years_is_clipped() {
        let rules = HolidayRules::polish();
        let range = rules.holidays_in_range(d("2024-12-24"), d("2025-01-03"));
        let expected: BTreeSet<NaiveDate> =
            [d("2024-12-25"), d("2024-12-26"), d("2025-01-01")].into_iter().collect();
        assert_eq!(range, expected);
        assert!(rules
            .holidays_in_range(d("2025-02-01"), d("2025-01-01"))
            .is_empty());
    }

    #[test]
    fn swapped_fixed_list_retargets_locale() {
        let rules = HolidayRules::new(
            vec![FixedHoliday { month: 7, day: 4, name: "Independence Day" }],
            Vec::new(),
        );
        let holidays = rules.holidays_for_year(2025);
        assert_eq!(holidays.len(), 1);
        assert!(holidays.contains(&d("2025-07-04")));
    }

    #[test]
    fn holiday_set_for_month_feeds_predicate() {
        let month: YearMonth = "2025-05".parse().unwrap();
        let set = HolidaySet::for_month(&HolidayRules::polish(), month);
        assert_eq!(set.len(), 2);
        let is_holiday = set.as_predicate();
        assert!(is_holiday(d("2025-05-03")));
        assert!(!is_holiday(d("2025-05-02")));
    }

    #[test]
    fn holiday_set_lists_dates_in_range() {
        let set = HolidaySet::for_range(&HolidayRules::polish(), d("2025-04-01"), d("2025-05-31"));
        assert_eq!(
            set.holidays_between(d("2025-04-21"), d("2025-05-02")),
            Some(vec![d("2025-04-21"), d("2025-05-01")])
        );
        assert_eq!(set.holidays_between(d("2025-05-02"), d("2025-05-01")), Some(Vec::new()));
        assert!(set.is_holiday(d("2025-04-20")));

        let predicate = HolidayPredicate(|date: NaiveDate| date.day() == 1);
        assert!(predicate.is_holiday(d("2025-05-01")));
        assert_eq!(predicate.holidays_between(d("2025-05-01"), d("2025-05-31")), None);
    }
}
