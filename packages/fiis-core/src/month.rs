//! Calendar year-month values used to key fund entries.

use crate::{Error, Result};
use chrono::{Datelike, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A calendar month, serialized as `YYYY-MM`.
///
/// Ordering is chronological, so sorting entries by `Month` gives the
/// canonical order of a fund's history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Month {
    year: i32,
    month: u32,
}

impl Month {
    /// Create a month, validating the year (1..=9999) and month (1..=12).
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=9999).contains(&year) || !(1..=12).contains(&month) {
            return Err(Error::InvalidMonth(format!("{:04}-{:02}", year, month)));
        }
        Ok(Self { year, month })
    }

    /// The current month in the local timezone.
    pub fn current() -> Self {
        let today = Local::now().date_naive();
        Self {
            year: today.year(),
            month: today.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// The month `months` months after this one, or `None` past 9999-12.
    pub fn offset(&self, months: usize) -> Option<Self> {
        let total = (i64::from(self.year) * 12 + i64::from(self.month - 1))
            .checked_add(i64::try_from(months).ok()?)?;
        let year = i32::try_from(total / 12).ok()?;
        let month = u32::try_from(total % 12).ok()? + 1;
        Self::new(year, month).ok()
    }
}

impl FromStr for Month {
    type Err = Error;

    /// Parse `YYYY-MM`, also accepting `YYYY/MM` and `YYYYMM`.
    fn from_str(value: &str) -> Result<Self> {
        let mut sanitized = value.trim().replace('/', "-");
        if sanitized.len() == 6 && sanitized.chars().all(|c| c.is_ascii_digit()) {
            sanitized.insert(4, '-');
        }

        // chrono's %Y accepts short years
        let four_digit_year = sanitized
            .split_once('-')
            .is_some_and(|(year, _)| year.len() == 4 && year.chars().all(|c| c.is_ascii_digit()));
        if !four_digit_year {
            return Err(Error::InvalidMonth(value.trim().to_string()));
        }

        let date = NaiveDate::parse_from_str(&format!("{}-01", sanitized), "%Y-%m-%d")
            .map_err(|_| Error::InvalidMonth(value.trim().to_string()))?;

        Self::new(date.year(), date.month()).map_err(|_| Error::InvalidMonth(value.trim().to_string()))
    }
}

impl TryFrom<String> for Month {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Month> for String {
    fn from(month: Month) -> Self {
        month.to_string()
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}
