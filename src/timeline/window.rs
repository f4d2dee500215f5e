use chrono::{Datelike, Duration, Months, NaiveDate};
use serde::{Deserialize, Serialize};

/// Months shown before the pivot's month.
const MONTHS_BEFORE: u32 = 1;
/// Months shown after the pivot's month.
const MONTHS_AFTER: u32 = 2;

/// First day of the month containing `date`.
pub fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Last day of the month containing `date`.
pub fn last_of_month(date: NaiveDate) -> NaiveDate {
    let first = first_of_month(date);
    match first.checked_add_months(Months::new(1)) {
        Some(next_month) => next_month - Duration::days(1),
        // Only reachable at the very end of chrono's supported range.
        None => NaiveDate::MAX,
    }
}

fn window_bounds(pivot: NaiveDate) -> (NaiveDate, NaiveDate) {
    let first = first_of_month(pivot);
    let start = first
        .checked_sub_months(Months::new(MONTHS_BEFORE))
        .unwrap_or(first);
    let end = first
        .checked_add_months(Months::new(MONTHS_AFTER))
        .map(last_of_month)
        .unwrap_or_else(|| last_of_month(first));
    (start, end)
}

/// Every calendar day from the first of the month before `pivot` through the
/// last day of the second month after it, ascending.
pub fn compute_window(pivot: NaiveDate) -> Vec<NaiveDate> {
    let (start, end) = window_bounds(pivot);
    start.iter_days().take_while(|day| *day <= end).collect()
}

/// The sliding range of days displayed by the timeline, derived from a pivot.
///
/// Only the pivot is stored; every query recomputes from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineWindow {
    pivot: NaiveDate,
}

impl TimelineWindow {
    pub fn new(pivot: NaiveDate) -> Self {
        Self { pivot }
    }

    pub fn today() -> Self {
        Self::new(chrono::Local::now().date_naive())
    }

    pub fn pivot(&self) -> NaiveDate {
        self.pivot
    }

    pub fn days(&self) -> Vec<NaiveDate> {
        compute_window(self.pivot)
    }

    pub fn first_day(&self) -> NaiveDate {
        window_bounds(self.pivot).0
    }

    pub fn last_day(&self) -> NaiveDate {
        window_bounds(self.pivot).1
    }

    pub fn len(&self) -> usize {
        let (start, end) = window_bounds(self.pivot);
        ((end - start).num_days() + 1) as usize
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        let (start, end) = window_bounds(self.pivot);
        start <= date && date <= end
    }

    /// Zero-based position of `date` in [`Self::days`], if displayed.
    pub fn index_of(&self, date: NaiveDate) -> Option<usize> {
        let (start, end) = window_bounds(self.pivot);
        if date < start || date > end {
            return None;
        }
        Some((date - start).num_days() as usize)
    }

    /// Shifts the pivot by whole calendar months. The day clamps to the
    /// target month's length.
    pub fn step_month(&mut self, delta: i32) {
        let months = Months::new(delta.unsigned_abs());
        let shifted = if delta >= 0 {
            self.pivot.checked_add_months(months)
        } else {
            self.pivot.checked_sub_months(months)
        };
        if let Some(pivot) = shifted {
            self.pivot = pivot;
        }
    }

    pub fn reset_to_today(&mut self) {
        self.pivot = chrono::Local::now().date_naive();
    }

    pub fn reset_to(&mut self, pivot: NaiveDate) {
        self.pivot = pivot;
    }

    /// `(first day, number of days)` for each month in the window, for headers.
    pub fn month_spans(&self) -> Vec<(NaiveDate, usize)> {
        let (start, end) = window_bounds(self.pivot);
        let mut spans = Vec::new();
        let mut month = start;
        while month <= end {
            let last = last_of_month(month).min(end);
            spans.push((month, ((last - month).num_days() + 1) as usize));
            match month.checked_add_months(Months::new(1)) {
                Some(next) => month = next,
                None => break,
            }
        }
        spans
    }
}

impl Default for TimelineWindow {
    fn default() -> Self {
        Self::today()
    }
}
