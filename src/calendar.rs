//! Conversion between integer day offsets and calendar dates.
//!
//! The passes only ever add and subtract offsets. Dates appear at the edges of
//! the engine: constraint dates are turned into offsets on the way in and
//! computed offsets into dates on the way out. Swapping the [`Calendar`]
//! changes what an offset means without touching any pass arithmetic.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt::Debug;

pub trait Calendar: Debug + Send + Sync {
    /// Date reached after moving `offset` days from `origin`, or `None` when
    /// that date is outside the representable range.
    fn date_at(&self, origin: NaiveDate, offset: i64) -> Option<NaiveDate>;

    /// Offset of `date` relative to `origin`; the inverse of [`Calendar::date_at`]
    /// for dates the calendar can produce.
    fn offset_of(&self, origin: NaiveDate, date: NaiveDate) -> i64;
}

/// Every day counts. This is the calendar the engine assumes by default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsecutiveDayCalendar;

impl Calendar for ConsecutiveDayCalendar {
    fn date_at(&self, origin: NaiveDate, offset: i64) -> Option<NaiveDate> {
        origin.checked_add_signed(Duration::try_days(offset)?)
    }

    fn offset_of(&self, origin: NaiveDate, date: NaiveDate) -> i64 {
        (date - origin).num_days()
    }
}

/// Counts only working weekdays that are not holidays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkCalendar {
    holidays: HashSet<NaiveDate>,
    non_working_days: HashSet<Weekday>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkCalendarConfig {
    working_days: Vec<Weekday>,
    holidays: Vec<NaiveDate>,
}

impl Default for WorkCalendar {
    fn default() -> Self {
        Self {
            holidays: HashSet::new(),
            non_working_days: HashSet::from([Weekday::Sat, Weekday::Sun]),
        }
    }
}

impl WorkCalendar {
    const ALL_WEEKDAYS: [Weekday; 7] = [
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
        Weekday::Sat,
        Weekday::Sun,
    ];

    /// Returns `None` when no weekday is a working day, since no offset could
    /// ever be resolved.
    pub fn custom<I, J>(working_days: I, holidays: J) -> Option<Self>
    where
        I: IntoIterator<Item = Weekday>,
        J: IntoIterator<Item = NaiveDate>,
    {
        let config = WorkCalendarConfig::new(working_days, holidays);
        Self::from_config(&config)
    }

    pub fn from_config(config: &WorkCalendarConfig) -> Option<Self> {
        if config.working_days.is_empty() {
            return None;
        }
        let non_working_days = Self::ALL_WEEKDAYS
            .into_iter()
            .filter(|day| !config.working_days.contains(day))
            .collect();

        Some(Self {
            holidays: config.holidays.iter().copied().collect(),
            non_working_days,
        })
    }

    pub fn to_config(&self) -> WorkCalendarConfig {
        WorkCalendarConfig::from(self)
    }

    pub fn add_holiday(&mut self, date: NaiveDate) {
        self.holidays.insert(date);
    }

    pub fn add_holidays(&mut self, dates: &[NaiveDate]) {
        self.holidays.extend(dates);
    }

    /// Check if a date is available for scheduling
    pub fn is_available(&self, date: NaiveDate) -> bool {
        !self.holidays.contains(&date) && !self.non_working_days.contains(&date.weekday())
    }

    /// Walk `days` available days forward (or back), giving up at the edge of
    /// the date range.
    fn step_available(&self, from: NaiveDate, days: i64, forward: bool) -> Option<NaiveDate> {
        // A week never holds more than `working_per_week` available days.
        let working_per_week = (7 - self.non_working_days.len()).max(1) as i64;
        let min_span = (days / working_per_week)
            .saturating_sub(1)
            .saturating_mul(7);
        let signed = if forward { min_span } else { -min_span };
        ConsecutiveDayCalendar.date_at(from, signed)?;

        let mut current = from;
        let mut count = 0;
        while count < days {
            current = if forward {
                current.succ_opt()?
            } else {
                current.pred_opt()?
            };
            if self.is_available(current) {
                count += 1;
            }
        }
        Some(current)
    }

    /// Count available days in a date range (inclusive)
    pub fn count_available_days(&self, start: NaiveDate, end: NaiveDate) -> i64 {
        let mut count = 0;
        let mut current = start;
        while current <= end {
            if self.is_available(current) {
                count += 1;
            }
            match current.succ_opt() {
                Some(next) => current = next,
                None => break,
            }
        }
        count
    }
}

impl Calendar for WorkCalendar {
    fn date_at(&self, origin: NaiveDate, offset: i64) -> Option<NaiveDate> {
        if offset >= 0 {
            self.step_available(origin, offset, true)
        } else {
            self.step_available(origin, offset.checked_neg()?, false)
        }
    }

    fn offset_of(&self, origin: NaiveDate, date: NaiveDate) -> i64 {
        if date > origin {
            origin
                .succ_opt()
                .map_or(0, |next| self.count_available_days(next, date))
        } else if date < origin {
            origin
                .pred_opt()
                .map_or(0, |prev| -self.count_available_days(date, prev))
        } else {
            0
        }
    }
}

impl WorkCalendarConfig {
    pub fn new<I, J>(working_days: I, holidays: J) -> Self
    where
        I: IntoIterator<Item = Weekday>,
        J: IntoIterator<Item = NaiveDate>,
    {
        let mut working: Vec<Weekday> = working_days.into_iter().collect();
        working.sort_by_key(|wd| wd.num_days_from_monday());
        working.dedup();

        let mut holidays: Vec<NaiveDate> = holidays.into_iter().collect();
        holidays.sort();
        holidays.dedup();

        Self {
            working_days: working,
            holidays,
        }
    }

    pub fn working_days(&self) -> &[Weekday] {
        &self.working_days
    }

    pub fn holidays(&self) -> &[NaiveDate] {
        &self.holidays
    }
}

impl From<&WorkCalendar> for WorkCalendarConfig {
    fn from(calendar: &WorkCalendar) -> Self {
        let working = WorkCalendar::ALL_WEEKDAYS
            .into_iter()
            .filter(|day| !calendar.non_working_days.contains(day))
            .collect::<Vec<_>>();

        let mut holidays: Vec<NaiveDate> = calendar.holidays.iter().copied().collect();
        holidays.sort();

        Self {
            working_days: working,
            holidays,
        }
    }
}
