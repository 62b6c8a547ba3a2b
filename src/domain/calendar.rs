use std::collections::BTreeMap;

use chrono::Datelike;
use chrono::NaiveDate;
use chrono::Weekday;
use serde::Serialize;
use thiserror::Error;

pub const FIVE_DAY_CALENDAR: &str = "5day";
pub const SIX_DAY_CALENDAR: &str = "6day";
pub const SEVEN_DAY_CALENDAR: &str = "7day";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CalendarError {
    #[error("calendar {0} has no working weekdays")]
    NoWorkingDays(String),
    #[error("unknown calendar: {0}")]
    UnknownCalendar(String),
}

/// Inclusive range of non-working dates (a single holiday has start == end).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FreeDateRange {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl FreeDateRange {
    pub fn single(date: NaiveDate) -> Self {
        Self {
            start_date: date,
            end_date: date,
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start_date && date <= self.end_date
    }
}

/// A working-day calendar: a weekly mask plus holiday exceptions.
///
/// All schedule dates are day boundaries, so `add_workdays` and
/// `workdays_between` count whole working days between two boundaries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkCalendar {
    pub id: String,
    working_weekdays: [bool; 7],
    pub holidays: Vec<FreeDateRange>,
}

impl WorkCalendar {
    pub fn new(
        id: &str,
        working_weekdays: &[Weekday],
        holidays: Vec<FreeDateRange>,
    ) -> Result<Self, CalendarError> {
        let mut mask = [false; 7];
        for weekday in working_weekdays {
            mask[weekday.num_days_from_monday() as usize] = true;
        }
        if !mask.iter().any(|working| *working) {
            return Err(CalendarError::NoWorkingDays(id.to_string()));
        }
        Ok(Self {
            id: id.to_string(),
            working_weekdays: mask,
            holidays,
        })
    }

    pub fn five_day(id: &str) -> Self {
        Self::preset(id, 5)
    }

    pub fn six_day(id: &str) -> Self {
        Self::preset(id, 6)
    }

    pub fn seven_day(id: &str) -> Self {
        Self::preset(id, 7)
    }

    fn preset(id: &str, working_days: usize) -> Self {
        let mut mask = [false; 7];
        for slot in mask.iter_mut().take(working_days) {
            *slot = true;
        }
        Self {
            id: id.to_string(),
            working_weekdays: mask,
            holidays: Vec::new(),
        }
    }

    pub fn working_weekdays(&self) -> Vec<Weekday> {
        let mut weekdays = Vec::new();
        let mut day = Weekday::Mon;
        for working in self.working_weekdays {
            if working {
                weekdays.push(day);
            }
            day = day.succ();
        }
        weekdays
    }

    pub fn is_workday(&self, date: NaiveDate) -> bool {
        if !self.working_weekdays[date.weekday().num_days_from_monday() as usize] {
            return false;
        }

        !self.holidays.iter().any(|range| range.contains(date))
    }

    /// First working day on or after `date`.
    pub fn next_workday(&self, mut date: NaiveDate) -> NaiveDate {
        while !self.is_workday(date) {
            let Some(next) = step(date, 1) else { break };
            date = next;
        }
        date
    }

    /// Last working day on or before `date`.
    pub fn previous_workday(&self, mut date: NaiveDate) -> NaiveDate {
        while !self.is_workday(date) {
            let Some(previous) = step(date, -1) else { break };
            date = previous;
        }
        date
    }

    /// Moves `n` working days forward (or backward when negative).
    ///
    /// Stops at `NaiveDate::MAX` / `NaiveDate::MIN` instead of overflowing.
    pub fn add_workdays(&self, date: NaiveDate, n: i64) -> NaiveDate {
        let direction = if n < 0 { -1 } else { 1 };
        let mut remaining = n.abs();
        let mut current = date;
        while remaining > 0 {
            let Some(next) = step(current, direction) else { break };
            current = next;
            if self.is_workday(current) {
                remaining -= 1;
            }
        }
        current
    }

    /// Calendar day after the last day worked in `start..finish`.
    ///
    /// Unlike `finish` this is not rolled over trailing non-working days, so
    /// a successor on a different calendar can start on them. Returns
    /// `finish` when nothing was worked.
    pub fn day_after_work(&self, start: NaiveDate, finish: NaiveDate) -> NaiveDate {
        if finish <= start {
            return finish;
        }
        let Some(last) = finish.pred_opt() else {
            return finish;
        };
        self.previous_workday(last)
            .max(start)
            .succ_opt()
            .unwrap_or(finish)
    }

    /// Working days `d` with `start <= d < end`; mirrored (negative) when `end < start`.
    pub fn workdays_between(&self, start: NaiveDate, end: NaiveDate) -> i64 {
        if end < start {
            return -self.workdays_between(end, start);
        }
        start
            .iter_days()
            .take_while(|date| *date < end)
            .filter(|date| self.is_workday(*date))
            .count() as i64
    }

    pub fn elapsed_working_ratio(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        target: NaiveDate,
    ) -> f64 {
        let total = self.workdays_between(start, end);
        if total <= 0 {
            return if target >= end { 1.0 } else { 0.0 };
        }
        let elapsed = self.workdays_between(start, target);
        (elapsed as f64 / total as f64).clamp(0.0, 1.0)
    }
}

fn step(date: NaiveDate, direction: i64) -> Option<NaiveDate> {
    date.checked_add_signed(chrono::Duration::days(direction))
}

/// Calendars referenced by id, with a project default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarSet {
    default_id: String,
    calendars: BTreeMap<String, WorkCalendar>,
}

impl CalendarSet {
    /// The 5/6/7-day presets with the 5-day calendar as default.
    pub fn standard() -> Self {
        let mut calendars = BTreeMap::new();
        for calendar in [
            WorkCalendar::five_day(FIVE_DAY_CALENDAR),
            WorkCalendar::six_day(SIX_DAY_CALENDAR),
            WorkCalendar::seven_day(SEVEN_DAY_CALENDAR),
        ] {
            calendars.insert(calendar.id.clone(), calendar);
        }
        Self {
            default_id: FIVE_DAY_CALENDAR.to_string(),
            calendars,
        }
    }

    pub fn insert(&mut self, calendar: WorkCalendar) {
        self.calendars.insert(calendar.id.clone(), calendar);
    }

    pub fn set_default(&mut self, id: &str) -> Result<(), CalendarError> {
        if !self.calendars.contains_key(id) {
            return Err(CalendarError::UnknownCalendar(id.to_string()));
        }
        self.default_id = id.to_string();
        Ok(())
    }

    pub fn default_id(&self) -> &str {
        &self.default_id
    }

    pub fn default_calendar(&self) -> &WorkCalendar {
        // set_default only accepts registered ids and calendars are never removed
        &self.calendars[&self.default_id]
    }

    /// Resolves an activity's calendar reference, `None` meaning the default.
    pub fn resolve(&self, id: Option<&str>) -> Result<&WorkCalendar, CalendarError> {
        match id {
            None => Ok(self.default_calendar()),
            Some(id) => self
                .calendars
                .get(id)
                .ok_or_else(|| CalendarError::UnknownCalendar(id.to_string())),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &WorkCalendar> {
        self.calendars.values()
    }
}

impl Default for CalendarSet {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::on_date;

    #[test]
    fn a_five_day_calendar_works_on_weekdays_only() {
        let test_cases = vec![
            (on_date(2026, 2, 16), true),  // Monday
            (on_date(2026, 2, 17), true),  // Tuesday
            (on_date(2026, 2, 18), true),  // Wednesday
            (on_date(2026, 2, 19), true),  // Thursday
            (on_date(2026, 2, 20), true),  // Friday
            (on_date(2026, 2, 21), false), // Saturday
            (on_date(2026, 2, 22), false), // Sunday
        ];

        let calendar = WorkCalendar::five_day("std");

        for (date, expected) in test_cases {
            assert_eq!(
                calendar.is_workday(date),
                expected,
                "Expected is_workday({date}) to be {expected}"
            );
        }
    }

    #[test]
    fn holidays_are_not_workdays() {
        let calendar = WorkCalendar::new(
            "site",
            &[Weekday::Mon, Weekday::Tue, Weekday::Wed, Weekday::Thu, Weekday::Fri],
            vec![FreeDateRange {
                start_date: on_date(2026, 2, 17),
                end_date: on_date(2026, 2, 18),
            }],
        )
        .unwrap();

        assert!(calendar.is_workday(on_date(2026, 2, 16)));
        assert!(!calendar.is_workday(on_date(2026, 2, 17)));
        assert!(!calendar.is_workday(on_date(2026, 2, 18)));
        assert!(calendar.is_workday(on_date(2026, 2, 19)));
    }

    #[test]
    fn a_calendar_without_working_weekdays_is_rejected() {
        let err = WorkCalendar::new("never", &[], Vec::new()).unwrap_err();
        assert_eq!(err, CalendarError::NoWorkingDays("never".to_string()));
    }

    #[test]
    fn add_workdays_skips_weekends_in_both_directions() {
        let calendar = WorkCalendar::five_day("std");
        let monday = on_date(2026, 2, 16);

        // start, n, expected
        let test_cases = vec![
            (monday, 0, monday),
            (monday, 1, on_date(2026, 2, 17)),
            (monday, 5, on_date(2026, 2, 23)),
            (on_date(2026, 2, 20), 1, on_date(2026, 2, 23)), // Friday + 1 => Monday
            (monday, -1, on_date(2026, 2, 13)),              // Monday - 1 => Friday
            (on_date(2026, 2, 23), -5, monday),
        ];

        for (start, n, expected) in test_cases {
            assert_eq!(calendar.add_workdays(start, n), expected, "{start} + {n}");
        }
    }

    #[test]
    fn six_and_seven_day_calendars_count_weekend_days() {
        let monday = on_date(2026, 2, 16);
        assert_eq!(
            WorkCalendar::six_day("6").add_workdays(monday, 6),
            on_date(2026, 2, 23)
        );
        assert_eq!(
            WorkCalendar::seven_day("7").add_workdays(monday, 6),
            on_date(2026, 2, 22)
        );
    }

    #[test]
    fn workdays_between_is_inverse_of_add_workdays() {
        let calendar = WorkCalendar::five_day("std");
        let monday = on_date(2026, 2, 16);
        for n in -12..=12 {
            let shifted = calendar.add_workdays(monday, n);
            assert_eq!(calendar.workdays_between(monday, shifted), n);
        }
    }

    #[test]
    fn next_workday_rolls_weekends_forward() {
        let calendar = WorkCalendar::five_day("std");
        assert_eq!(calendar.next_workday(on_date(2026, 2, 21)), on_date(2026, 2, 23));
        assert_eq!(calendar.next_workday(on_date(2026, 2, 20)), on_date(2026, 2, 20));
        assert_eq!(calendar.previous_workday(on_date(2026, 2, 22)), on_date(2026, 2, 20));
    }

    #[test]
    fn day_after_work_does_not_roll_over_the_weekend() {
        let calendar = WorkCalendar::five_day("std");
        let monday = on_date(2026, 3, 2);
        // five days of work end on Friday; the boundary is the next Monday
        assert_eq!(calendar.add_workdays(monday, 5), on_date(2026, 3, 9));
        assert_eq!(calendar.day_after_work(monday, on_date(2026, 3, 9)), on_date(2026, 3, 7));
        assert_eq!(calendar.day_after_work(monday, on_date(2026, 3, 4)), on_date(2026, 3, 4));
        assert_eq!(calendar.day_after_work(monday, monday), monday);
    }

    #[test]
    fn add_workdays_stops_at_the_end_of_the_date_range() {
        let calendar = WorkCalendar::seven_day("7");
        let near_end = NaiveDate::MAX - chrono::Duration::days(3);
        assert_eq!(calendar.add_workdays(near_end, 10), NaiveDate::MAX);

        let near_start = NaiveDate::MIN + chrono::Duration::days(3);
        assert_eq!(calendar.add_workdays(near_start, -10), NaiveDate::MIN);
    }

    #[test]
    fn elapsed_working_ratio_is_clamped_and_ignores_weekends() {
        let calendar = WorkCalendar::five_day("std");
        let start = on_date(2026, 2, 16);
        let end = on_date(2026, 2, 26); // 8 working days later

        assert_eq!(calendar.elapsed_working_ratio(start, end, on_date(2026, 2, 10)), 0.0);
        assert_eq!(calendar.elapsed_working_ratio(start, end, start), 0.0);
        assert_eq!(calendar.elapsed_working_ratio(start, end, on_date(2026, 2, 20)), 0.5);
        // Saturday and Sunday do not advance the ratio
        assert_eq!(calendar.elapsed_working_ratio(start, end, on_date(2026, 2, 21)), 0.625);
        assert_eq!(calendar.elapsed_working_ratio(start, end, on_date(2026, 2, 23)), 0.625);
        assert_eq!(calendar.elapsed_working_ratio(start, end, end), 1.0);
        assert_eq!(calendar.elapsed_working_ratio(start, end, on_date(2026, 3, 30)), 1.0);
    }

    #[test]
    fn calendar_set_resolves_default_and_rejects_unknown_ids() {
        let mut calendars = CalendarSet::standard();
        assert_eq!(calendars.resolve(None).unwrap().id, FIVE_DAY_CALENDAR);
        assert_eq!(
            calendars.resolve(Some(SEVEN_DAY_CALENDAR)).unwrap().id,
            SEVEN_DAY_CALENDAR
        );
        assert_eq!(
            calendars.resolve(Some("night-shift")).unwrap_err(),
            CalendarError::UnknownCalendar("night-shift".to_string())
        );

        calendars.set_default(SIX_DAY_CALENDAR).unwrap();
        assert_eq!(calendars.default_calendar().id, SIX_DAY_CALENDAR);
        assert!(calendars.set_default("missing").is_err());
    }
}
