//! # Calendar Generator
//!
//! Builds the month grid shown to renters and owners. Weeks start on Sunday;
//! the first and last week are padded with empty cells. Pure: no I/O, and the
//! same inputs always produce the same grid.

use std::collections::BTreeSet;

use chrono::{Datelike, Months, NaiveDate};
use serde::Serialize;

use crate::error::{AppError, Result, ValidationErrors};

pub const MIN_YEAR: i32 = 1970;
pub const MAX_YEAR: i32 = 2100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DayState {
    /// Before today and not blocked.
    Past,
    /// Blocked, whether past or not. See `DayCell::is_past`.
    Unavailable,
    /// Today or later, and not blocked.
    Available,
    /// An available day the caller picked.
    Selected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DayCell {
    pub date: NaiveDate,
    pub state: DayState,
    pub is_past: bool,
}

impl DayCell {
    fn classify(date: NaiveDate, unavailable: &BTreeSet<NaiveDate>, today: NaiveDate) -> Self {
        let is_past = date < today;
        let state = if unavailable.contains(&date) {
            DayState::Unavailable
        } else if is_past {
            DayState::Past
        } else {
            DayState::Available
        };
        Self { date, state, is_past }
    }

    /// Only future, unblocked days are interactive.
    pub fn is_selectable(&self) -> bool {
        matches!(self.state, DayState::Available | DayState::Selected)
    }
}

pub type Week = [Option<DayCell>; 7];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthGrid {
    pub year: i32,
    pub month: u32,
    pub weeks: Vec<Week>,
}

impl MonthGrid {
    pub fn cells(&self) -> impl Iterator<Item = &DayCell> {
        self.weeks.iter().flatten().flatten()
    }

    pub fn cell(&self, date: NaiveDate) -> Option<&DayCell> {
        self.cells().find(|c| c.date == date)
    }

    /// Marks `date` as selected. Ignored unless the cell is available.
    pub fn select(mut self, date: NaiveDate) -> Self {
        for cell in self.weeks.iter_mut().flatten().flatten() {
            if cell.date == date && cell.state == DayState::Available {
                cell.state = DayState::Selected;
            }
        }
        self
    }

    pub fn previous_month(&self) -> (i32, u32) {
        if self.month == 1 {
            (self.year - 1, 12)
        } else {
            (self.year, self.month - 1)
        }
    }

    pub fn next_month(&self) -> (i32, u32) {
        if self.month == 12 {
            (self.year + 1, 1)
        } else {
            (self.year, self.month + 1)
        }
    }
}

/// First and last day of a month, after range-checking `year` and `month`.
pub fn month_bounds(year: i32, month: u32) -> Result<(NaiveDate, NaiveDate)> {
    let mut errors = ValidationErrors::new();
    if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
        errors.add("year", format!("Year must be between {MIN_YEAR} and {MAX_YEAR}."));
    }
    if !(1..=12).contains(&month) {
        errors.add("month", "Month must be between 1 and 12.");
    }
    errors.into_result()?;

    let first = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| AppError::ValidationError(invalid_month()))?;
    let last = first
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .ok_or_else(|| AppError::ValidationError(invalid_month()))?;
    Ok((first, last))
}

fn invalid_month() -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    errors.add("month", "Month is out of range.");
    errors
}

/// Classifies every day of `year`-`month` against `unavailable` and `today`.
pub fn generate_month(
    year: i32,
    month: u32,
    unavailable: &BTreeSet<NaiveDate>,
    today: NaiveDate,
) -> Result<MonthGrid> {
    let (first, last) = month_bounds(year, month)?;

    let mut weeks = Vec::with_capacity(6);
    let mut week: Week = [None; 7];
    let mut column = first.weekday().num_days_from_sunday() as usize;

    for date in first.iter_days().take_while(|d| *d <= last) {
        week[column] = Some(DayCell::classify(date, unavailable, today));
        column += 1;
        if column == 7 {
            weeks.push(week);
            week = [None; 7];
            column = 0;
        }
    }
    if column > 0 {
        weeks.push(week);
    }

    Ok(MonthGrid { year, month, weeks })
}
