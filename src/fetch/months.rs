use chrono::{Datelike, Duration, NaiveDate};
use std::fmt;
use std::str::FromStr;

use crate::error::MonthError;

/// A calendar month, held as the first day of that month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Month(NaiveDate);

impl Month {
    /// Parse a `YYYY-MM` label.
    pub fn parse(label: &str) -> Result<Self, MonthError> {
        let invalid = || MonthError::Invalid(label.to_string());
        let (year, month) = label.split_once('-').ok_or_else(invalid)?;
        let digits = |s: &str, n: usize| s.len() == n && s.bytes().all(|b| b.is_ascii_digit());
        if !digits(year, 4) || !digits(month, 2) {
            return Err(invalid());
        }
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        NaiveDate::from_ymd_opt(year, month, 1)
            .map(Month)
            .ok_or_else(invalid)
    }

    pub fn year(&self) -> i32 {
        self.0.year()
    }

    pub fn month(&self) -> u32 {
        self.0.month()
    }

    /// The following calendar month.
    ///
    /// 32 days past the first of any month always lands in the next one, so
    /// truncating back to day 1 never skips or repeats a month. `None` only at
    /// the end of chrono's date range.
    pub fn succ(&self) -> Option<Self> {
        let first = self.0.with_day(1)?;
        let later = first.checked_add_signed(Duration::days(32))?;
        later.with_day(1).map(Month)
    }

    /// Consecutive months starting at `self`.
    pub fn iter(self) -> impl Iterator<Item = Month> {
        std::iter::successors(Some(self), Month::succ)
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year(), self.month())
    }
}

impl FromStr for Month {
    type Err = MonthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Month::parse(s)
    }
}
