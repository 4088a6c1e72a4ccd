//! Working-day calendar.
//!
//! Decides whether a date counts as a working day under the weekend/holiday
//! exclusion policy and performs working-day arithmetic for the scheduler.
//! Every walk terminates: weekends exclude at most two days in seven and the
//! holiday set is finite.

use std::collections::BTreeSet;

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

/// Inclusive date ranges of the built-in holiday set (2025 public holidays).
const BUILTIN_HOLIDAYS: [((i32, u32, u32), (i32, u32, u32)); 6] = [
    ((2025, 1, 1), (2025, 1, 1)),
    ((2025, 1, 28), (2025, 2, 4)),
    ((2025, 4, 4), (2025, 4, 6)),
    ((2025, 5, 1), (2025, 5, 5)),
    ((2025, 5, 31), (2025, 6, 2)),
    ((2025, 10, 1), (2025, 10, 7)),
];

/// Holidays used when holiday exclusion is on and none are configured.
pub fn builtin_holidays() -> BTreeSet<NaiveDate> {
    let mut days = BTreeSet::new();
    for ((y1, m1, d1), (y2, m2, d2)) in BUILTIN_HOLIDAYS {
        let (Some(first), Some(last)) = (
            NaiveDate::from_ymd_opt(y1, m1, d1),
            NaiveDate::from_ymd_opt(y2, m2, d2),
        ) else {
            continue;
        };
        days.extend(first.iter_days().take_while(|day| *day <= last));
    }
    days
}

/// Exclusion policy for a scheduling run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarConfig {
    #[serde(default = "default_true")]
    pub exclude_weekends: bool,
    #[serde(default)]
    pub exclude_holidays: bool,
    /// Only consulted when `exclude_holidays` is set.
    #[serde(default)]
    pub holidays: BTreeSet<NaiveDate>,
}

fn default_true() -> bool {
    true
}

impl Default for CalendarConfig {
    fn default() -> Self {
        CalendarConfig {
            exclude_weekends: true,
            exclude_holidays: false,
            holidays: BTreeSet::new(),
        }
    }
}

impl CalendarConfig {
    pub fn new(
        exclude_weekends: bool,
        exclude_holidays: bool,
        holidays: impl IntoIterator<Item = NaiveDate>,
    ) -> Self {
        CalendarConfig {
            exclude_weekends,
            exclude_holidays,
            holidays: holidays.into_iter().collect(),
        }
    }

    /// A calendar where every day is a working day.
    pub fn every_day() -> Self {
        CalendarConfig::new(false, false, [])
    }

    fn excludes_nothing(&self) -> bool {
        !self.exclude_weekends && (!self.exclude_holidays || self.holidays.is_empty())
    }

    pub fn is_working_day(&self, date: NaiveDate) -> bool {
        if self.exclude_weekends && matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
            return false;
        }
        if self.exclude_holidays && self.holidays.contains(&date) {
            return false;
        }
        true
    }

    /// The first working day on or after `date`.
    pub fn next_working_day(&self, date: NaiveDate) -> NaiveDate {
        let mut day = date;
        while !self.is_working_day(day) {
            day += Duration::days(1);
        }
        day
    }

    /// The last working day on or before `date`.
    pub fn previous_working_day(&self, date: NaiveDate) -> NaiveDate {
        let mut day = date;
        while !self.is_working_day(day) {
            day -= Duration::days(1);
        }
        day
    }

    /// Advance by `n` working days. The walk starts from the first working
    /// day on or after `date`, so `add_working_days(d, 0)` is `d` only when
    /// `d` is itself a working day.
    pub fn add_working_days(&self, date: NaiveDate, n: u32) -> NaiveDate {
        let mut day = self.next_working_day(date);
        if self.excludes_nothing() {
            return day + Duration::days(i64::from(n));
        }
        let mut remaining = n;
        while remaining > 0 {
            day += Duration::days(1);
            if self.is_working_day(day) {
                remaining -= 1;
            }
        }
        day
    }

    /// Step back by `n` working days, starting from the last working day on
    /// or before `date`.
    pub fn subtract_working_days(&self, date: NaiveDate, n: u32) -> NaiveDate {
        let mut day = self.previous_working_day(date);
        if self.excludes_nothing() {
            return day - Duration::days(i64::from(n));
        }
        let mut remaining = n;
        while remaining > 0 {
            day -= Duration::days(1);
            if self.is_working_day(day) {
                remaining -= 1;
            }
        }
        day
    }

    /// Inclusive count of working days in `[start, end]`; zero when `start > end`.
    pub fn working_days_between(&self, start: NaiveDate, end: NaiveDate) -> u32 {
        if start > end {
            return 0;
        }
        if self.excludes_nothing() {
            return ((end - start).num_days() + 1) as u32;
        }
        start
            .iter_days()
            .take_while(|day| *day <= end)
            .filter(|day| self.is_working_day(*day))
            .count() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_builtin_holidays() {
        let days = builtin_holidays();
        assert_eq!(days.len(), 27);
        assert!(days.contains(&d(2025, 2, 4)));
        assert!(days.contains(&d(2025, 10, 7)));
        assert!(!days.contains(&d(2025, 10, 8)));

        let calendar = CalendarConfig::new(true, true, days);
        assert_eq!(calendar.next_working_day(d(2025, 9, 30)), d(2025, 9, 30));
        assert_eq!(calendar.add_working_days(d(2025, 9, 30), 1), d(2025, 10, 8));
    }

    #[test]
    fn test_weekends_are_excluded_only_when_enabled() {
        let saturday = d(2024, 1, 6);
        assert!(!CalendarConfig::default().is_working_day(saturday));
        assert!(CalendarConfig::every_day().is_working_day(saturday));
    }

    #[test]
    fn test_holidays_require_the_flag() {
        let new_year = d(2024, 1, 1);
        let off = CalendarConfig::new(true, false, [new_year]);
        let on = CalendarConfig::new(true, true, [new_year]);
        assert!(off.is_working_day(new_year));
        assert!(!on.is_working_day(new_year));
    }

    #[test]
    fn test_add_zero_days_moves_off_weekend() {
        let cal = CalendarConfig::default();
        assert_eq!(cal.add_working_days(d(2024, 1, 3), 0), d(2024, 1, 3));
        assert_eq!(cal.add_working_days(d(2024, 1, 6), 0), d(2024, 1, 8));
    }

    #[test]
    fn test_add_working_days_spans_weekend_and_holiday() {
        // Thu 4th + 2 working days, with Mon 8th a holiday: Fri 5th, Tue 9th.
        let cal = CalendarConfig::new(true, true, [d(2024, 1, 8)]);
        assert_eq!(cal.add_working_days(d(2024, 1, 4), 2), d(2024, 1, 9));
    }

    #[test]
    fn test_subtract_is_symmetric() {
        let cal = CalendarConfig::default();
        assert_eq!(cal.subtract_working_days(d(2024, 1, 8), 1), d(2024, 1, 5));
        assert_eq!(cal.subtract_working_days(d(2024, 1, 7), 0), d(2024, 1, 5));
        let start = d(2024, 1, 2);
        let end = cal.add_working_days(start, 9);
        assert_eq!(cal.subtract_working_days(end, 9), start);
    }

    #[test]
    fn test_plain_arithmetic_when_nothing_excluded() {
        let cal = CalendarConfig::every_day();
        assert_eq!(cal.add_working_days(d(2024, 2, 27), 3), d(2024, 3, 1));
        assert_eq!(cal.working_days_between(d(2024, 1, 1), d(2024, 1, 31)), 31);
    }

    #[test]
    fn test_working_days_between() {
        let cal = CalendarConfig::default();
        assert_eq!(cal.working_days_between(d(2024, 1, 1), d(2024, 1, 7)), 5);
        assert_eq!(cal.working_days_between(d(2024, 1, 6), d(2024, 1, 7)), 0);
        assert_eq!(cal.working_days_between(d(2024, 1, 9), d(2024, 1, 8)), 0);
    }

    #[test]
    fn test_large_spans_terminate() {
        let cal = CalendarConfig::new(true, true, [d(2024, 12, 25), d(2025, 1, 1)]);
        let end = cal.add_working_days(d(2024, 1, 1), 5_000);
        assert!(end > d(2043, 1, 1));
        assert!(cal.is_working_day(end));
    }
}
