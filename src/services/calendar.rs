use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::models::{Booking, BookingStatus};

/// A calendar month, used as the cursor of the month grid.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    year: i32,
    month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(|_| Self { year, month })
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Parses `YYYY-MM`.
    pub fn parse(s: &str) -> anyhow::Result<Self> {
        let (year, month) = s
            .trim()
            .split_once('-')
            .ok_or_else(|| anyhow::anyhow!("invalid month format: {s}"))?;
        let year: i32 = year
            .parse()
            .map_err(|_| anyhow::anyhow!("invalid year in: {s}"))?;
        let month: u32 = month
            .parse()
            .map_err(|_| anyhow::anyhow!("invalid month in: {s}"))?;
        Self::new(year, month).ok_or_else(|| anyhow::anyhow!("month out of range: {s}"))
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or_default()
    }

    pub fn last_day(&self) -> NaiveDate {
        self.next()
            .first_day()
            .pred_opt()
            .unwrap_or_else(|| self.first_day())
    }

    pub fn next(&self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    pub fn prev(&self) -> Self {
        if self.month == 1 {
            Self {
                year: self.year - 1,
                month: 12,
            }
        } else {
            Self {
                year: self.year,
                month: self.month - 1,
            }
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let month = *self;
        self.first_day()
            .iter_days()
            .take_while(move |d| month.contains(*d))
    }
}

impl std::fmt::Display for YearMonth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Status counts for one day.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DaySummary {
    pub counts: BTreeMap<BookingStatus, usize>,
}

impl DaySummary {
    pub fn count(&self, status: BookingStatus) -> usize {
        self.counts.get(&status).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }
}

/// Per-day status counts for `month`. Days without bookings are absent.
pub fn summarize_month(bookings: &[Booking], month: YearMonth) -> BTreeMap<NaiveDate, DaySummary> {
    let mut days: BTreeMap<NaiveDate, DaySummary> = BTreeMap::new();
    for booking in bookings.iter().filter(|b| month.contains(b.date())) {
        *days
            .entry(booking.date())
            .or_default()
            .counts
            .entry(booking.status)
            .or_insert(0) += 1;
    }
    days
}

/// Bookings starting on `date`, earliest first.
pub fn bookings_on_day(bookings: &[Booking], date: NaiveDate) -> Vec<Booking> {
    let mut day: Vec<Booking> = bookings
        .iter()
        .filter(|b| b.date() == date)
        .cloned()
        .collect();
    day.sort_by(|a, b| a.start_at.cmp(&b.start_at).then_with(|| a.id.cmp(&b.id)));
    day
}
