//! Day-offset timeline arithmetic
//!
//! Date windows are addressed as whole-day offsets from the start of a
//! subscriber's available data span.

use chrono::{Datelike, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Milliseconds in one day.
pub const DAY_MILLIS: i64 = 1000 * 60 * 60 * 24;

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Full span of data available for a subscriber, in epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailableDateRange {
    pub start: i64,
    pub end: i64,
}

impl AvailableDateRange {
    /// Number of whole days covered by the span.
    pub fn day_count(&self) -> i64 {
        (self.end - self.start) / DAY_MILLIS
    }

    /// Absolute timestamp of the given day offset.
    pub fn timestamp_at(&self, index: i64) -> i64 {
        self.start + index * DAY_MILLIS
    }

    /// Trailing window of `days` days ending on the last day of the span,
    /// clamped so the window never starts before day zero.
    pub fn trailing_window(&self, days: i64) -> DayRange {
        let length = self.day_count();
        DayRange::new((length - days).max(0), (length - 1).max(0))
    }
}

/// Inclusive day-offset window relative to an available range start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayRange {
    pub from_index: i64,
    pub to_index: i64,
}

impl DayRange {
    /// Build a range, clamping so `0 <= from_index <= to_index` holds.
    pub fn new(from_index: i64, to_index: i64) -> Self {
        let from_index = from_index.max(0);
        Self {
            from_index,
            to_index: to_index.max(from_index),
        }
    }

    /// Whether `other` lies fully inside this range.
    pub fn contains(&self, other: &DayRange) -> bool {
        other.from_index >= self.from_index && other.to_index <= self.to_index
    }
}

/// Truncate a timestamp to the beginning of its UTC day.
pub fn day_floor(timestamp: i64) -> i64 {
    timestamp - timestamp.rem_euclid(DAY_MILLIS)
}

/// Short month/day label for slider ticks, e.g. "Jan 5".
pub fn date_label(timestamp: i64) -> String {
    match Utc.timestamp_millis_opt(timestamp).single() {
        Some(dt) => format!("{} {}", MONTHS[dt.month0() as usize], dt.day()),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_window_default_selection() {
        // Nine-day span: the default six-day window is days 3..=8.
        let range = AvailableDateRange {
            start: 0,
            end: 9 * DAY_MILLIS,
        };
        assert_eq!(range.trailing_window(6), DayRange::new(3, 8));
    }

    #[test]
    fn test_trailing_window_clamps_short_spans() {
        let range = AvailableDateRange {
            start: 0,
            end: 3 * DAY_MILLIS,
        };
        assert_eq!(range.trailing_window(6), DayRange::new(0, 2));

        let empty = AvailableDateRange { start: 0, end: 0 };
        assert_eq!(empty.trailing_window(6), DayRange::new(0, 0));
    }

    #[test]
    fn test_day_range_invariant() {
        let range = DayRange::new(-4, -2);
        assert_eq!(range.from_index, 0);
        assert_eq!(range.to_index, 0);

        let flipped = DayRange::new(5, 2);
        assert_eq!(flipped.from_index, 5);
        assert_eq!(flipped.to_index, 5);
    }

    #[test]
    fn test_day_range_containment() {
        let downloaded = DayRange::new(2, 8);
        assert!(downloaded.contains(&DayRange::new(2, 8)));
        assert!(downloaded.contains(&DayRange::new(3, 5)));
        assert!(!downloaded.contains(&DayRange::new(1, 5)));
        assert!(!downloaded.contains(&DayRange::new(3, 9)));
    }

    #[test]
    fn test_day_floor() {
        assert_eq!(day_floor(0), 0);
        assert_eq!(day_floor(DAY_MILLIS - 1), 0);
        assert_eq!(day_floor(DAY_MILLIS + 123), DAY_MILLIS);
    }

    #[test]
    fn test_date_label() {
        assert_eq!(date_label(0), "Jan 1");
        assert_eq!(date_label(31 * DAY_MILLIS), "Feb 1");
    }
}
