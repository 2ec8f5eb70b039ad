//! Solar Hijri (Jalali) calendar dates and their Gregorian counterparts.
//!
//! Conversion counts days from 979-01-01 (1600-03-20 Gregorian) and lays
//! years out in 33-year cycles of eight four-year blocks plus one common
//! year; the first year of every block is leap.

use std::fmt;

use thiserror::Error;
use time::{Date, Month};

const MONTH_DAYS: [u16; 12] = [31, 31, 31, 31, 31, 31, 30, 30, 30, 30, 30, 29];
const EPOCH_YEAR: i32 = 979;
const CYCLE_YEARS: i32 = 33;
const CYCLE_DAYS: i32 = 12_053;
const BLOCK_DAYS: i32 = 1_461;

/// Years accepted from uploaded files.
pub(crate) const MIN_YEAR: i32 = 1300;
pub(crate) const MAX_YEAR: i32 = 1500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct JalaliDate {
    year: i32,
    month: u8,
    day: u8,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum JalaliError {
    #[error("expected YYYY-MM-DD")]
    Format,
    #[error("year {0} is outside {MIN_YEAR}..={MAX_YEAR}")]
    YearOutOfRange(i32),
    #[error("month {0} does not exist")]
    Month(u8),
    #[error("day {day} does not exist in month {month}")]
    Day { month: u8, day: u8 },
    #[error("date is outside the supported Gregorian range")]
    Gregorian,
}

impl JalaliDate {
    pub(crate) fn new(year: i32, month: u8, day: u8) -> Result<Self, JalaliError> {
        if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
            return Err(JalaliError::YearOutOfRange(year));
        }
        if !(1..=12).contains(&month) {
            return Err(JalaliError::Month(month));
        }
        if day == 0 || u16::from(day) > month_length(year, month) {
            return Err(JalaliError::Day { month, day });
        }
        Ok(Self { year, month, day })
    }

    /// Parses the zero-padded `YYYY-MM-DD` shape used in import files.
    pub(crate) fn parse(value: &str) -> Result<Self, JalaliError> {
        let mut parts = value.trim().split('-');
        let (Some(year), Some(month), Some(day), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(JalaliError::Format);
        };

        if year.len() != 4 || month.len() != 2 || day.len() != 2 {
            return Err(JalaliError::Format);
        }
        if ![year, month, day].iter().all(|part| part.bytes().all(|b| b.is_ascii_digit())) {
            return Err(JalaliError::Format);
        }

        let year = year.parse().map_err(|_| JalaliError::Format)?;
        let month = month.parse().map_err(|_| JalaliError::Format)?;
        let day = day.parse().map_err(|_| JalaliError::Format)?;
        Self::new(year, month, day)
    }

    pub(crate) fn to_gregorian(self) -> Result<Date, JalaliError> {
        let years = self.year - EPOCH_YEAR;
        let mut days = 365 * years + (years / CYCLE_YEARS) * 8 + (years % CYCLE_YEARS + 3) / 4;
        days += MONTH_DAYS[..usize::from(self.month - 1)].iter().map(|d| i32::from(*d)).sum::<i32>();
        days += i32::from(self.day) - 1;

        Date::from_julian_day(epoch()?.to_julian_day() + days).map_err(|_| JalaliError::Gregorian)
    }

    pub(crate) fn from_gregorian(date: Date) -> Result<Self, JalaliError> {
        let mut days = date.to_julian_day() - epoch()?.to_julian_day();
        if days < 0 {
            return Err(JalaliError::Gregorian);
        }

        let cycles = days / CYCLE_DAYS;
        days %= CYCLE_DAYS;
        let mut year = EPOCH_YEAR + CYCLE_YEARS * cycles + 4 * (days / BLOCK_DAYS);
        days %= BLOCK_DAYS;
        if days >= 366 {
            year += (days - 1) / 365;
            days = (days - 1) % 365;
        }

        let mut month = 1u8;
        for length in MONTH_DAYS.iter().take(11) {
            let length = i32::from(*length);
            if days < length {
                break;
            }
            days -= length;
            month += 1;
        }

        Self::new(year, month, (days + 1) as u8)
    }
}

impl fmt::Display for JalaliDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

pub(crate) fn is_leap_year(year: i32) -> bool {
    let position = (year - EPOCH_YEAR).rem_euclid(CYCLE_YEARS);
    position % 4 == 0 && position != 32
}

fn month_length(year: i32, month: u8) -> u16 {
    match month {
        12 if is_leap_year(year) => 30,
        1..=12 => MONTH_DAYS[usize::from(month - 1)],
        _ => 0,
    }
}

fn epoch() -> Result<Date, JalaliError> {
    Date::from_calendar_date(1600, Month::March, 20).map_err(|_| JalaliError::Gregorian)
}
