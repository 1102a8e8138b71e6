//! Day-first date handling for the rotation plan
//!
//! Rotation sheets are maintained locally and typed day-first in whatever
//! separator the author preferred. Anything we cannot read is `None`, never an error.

use chrono::{Datelike, NaiveDate};

/// Day-first layouts tried in order; ISO is last so `2026-10-15` still parses
const DAY_FIRST_FORMATS: &[&str] = &[
    "%d-%m-%Y",
    "%d/%m/%Y",
    "%d.%m.%Y",
    "%d %m %Y",
    "%d-%b-%Y",
    "%d %b %Y",
    "%d-%B-%Y",
    "%d %B %Y",
    "%d-%m-%y",
    "%d/%m/%y",
    "%d-%b-%y",
    "%Y-%m-%d",
    "%Y/%m/%d",
];

/// Output layout for availability windows
pub const DISPLAY_FORMAT: &str = "%d-%m-%Y";

/// Parse a day-first date, ignoring a trailing time component
pub fn parse_day_first(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    // "15-10-2026 00:00:00" -> "15-10-2026"
    let date_part = match trimmed.split_once(' ') {
        Some((head, tail)) if tail.contains(':') => head,
        _ => trimmed,
    };

    // %Y happily reads "26" as year 26, leave short years to the %y layouts
    DAY_FIRST_FORMATS.iter().find_map(|fmt| {
        NaiveDate::parse_from_str(date_part, fmt)
            .ok()
            .filter(|d| !fmt.contains("%Y") || d.year() >= 1000)
    })
}

/// Format a date as day-month-year
pub fn format_day_first(date: NaiveDate) -> String {
    date.format(DISPLAY_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_day_first_separators() {
        assert_eq!(parse_day_first("05-11-2026"), Some(ymd(2026, 11, 5)));
        assert_eq!(parse_day_first("05/11/2026"), Some(ymd(2026, 11, 5)));
        assert_eq!(parse_day_first(" 05.11.2026 "), Some(ymd(2026, 11, 5)));
        assert_eq!(parse_day_first("5-Nov-2026"), Some(ymd(2026, 11, 5)));
        assert_eq!(parse_day_first("05/11/26"), Some(ymd(2026, 11, 5)));
    }

    #[test]
    fn test_ambiguous_dates_are_day_first() {
        // 03-04 is the 3rd of April, not March 4th
        assert_eq!(parse_day_first("03-04-2026"), Some(ymd(2026, 4, 3)));
    }

    #[test]
    fn test_iso_and_timestamp_inputs() {
        assert_eq!(parse_day_first("2026-10-15"), Some(ymd(2026, 10, 15)));
        assert_eq!(parse_day_first("15-10-2026 00:00:00"), Some(ymd(2026, 10, 15)));
    }

    #[test]
    fn test_unparsable_is_none() {
        assert_eq!(parse_day_first(""), None);
        assert_eq!(parse_day_first("next week"), None);
        assert_eq!(parse_day_first("31-02-2026"), None);
    }

    #[test]
    fn test_format_day_first() {
        assert_eq!(format_day_first(ymd(2026, 1, 7)), "07-01-2026");
    }
}
