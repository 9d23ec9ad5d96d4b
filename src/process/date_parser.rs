use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::process::utils::clean_str;

/// Timestamp layouts; only the date part is kept.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%d/%m/%Y %H:%M:%S",
];

/// Month-first before day-first, so `01/02/2020` is 2 January and
/// `25/02/2020` still parses as 25 February.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%d-%m-%Y",
    "%d.%m.%Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%d %b %Y",
    "%d %B %Y",
    "%d-%b-%Y",
];

/// Parse a cell as a calendar date, `None` when no known layout fits.
pub fn parse_calendar_date(raw: &str) -> Option<NaiveDate> {
    let s = clean_str(raw);
    if s.is_empty() {
        return None;
    }

    if let Some(d) = parse_compact_ymd(s) {
        return Some(d);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok().map(|dt| dt.date()))
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        })
}

/// Contiguous `YYYYMMDD`.
fn parse_compact_ymd(s: &str) -> Option<NaiveDate> {
    if s.len() != 8 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let year: i32 = s[0..4].parse().ok()?;
    let month: u32 = s[4..6].parse().ok()?;
    let day: u32 = s[6..8].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    #[test]
    fn iso_and_slash_layouts() {
        assert_eq!(parse_calendar_date("2020-01-05"), ymd(2020, 1, 5));
        assert_eq!(parse_calendar_date("2020/01/05"), ymd(2020, 1, 5));
        assert_eq!(parse_calendar_date(" \"2019-12-31\" "), ymd(2019, 12, 31));
        assert_eq!(parse_calendar_date("20170809"), ymd(2017, 8, 9));
    }

    #[test]
    fn timestamps_keep_the_date() {
        assert_eq!(parse_calendar_date("2024/12/22 00:05:00"), ymd(2024, 12, 22));
        assert_eq!(parse_calendar_date("2021-06-01T10:00:00+05:30"), ymd(2021, 6, 1));
    }

    #[test]
    fn month_first_then_day_first() {
        assert_eq!(parse_calendar_date("01/02/2020"), ymd(2020, 1, 2));
        assert_eq!(parse_calendar_date("25/02/2020"), ymd(2020, 2, 25));
        assert_eq!(parse_calendar_date("09.01.2017"), ymd(2017, 1, 9));
    }

    #[test]
    fn month_names() {
        assert_eq!(parse_calendar_date("Jan 5, 2020"), ymd(2020, 1, 5));
        assert_eq!(parse_calendar_date("5 January 2020"), ymd(2020, 1, 5));
    }

    #[test]
    fn garbage_and_impossible_dates_are_absent() {
        assert_eq!(parse_calendar_date(""), None);
        assert_eq!(parse_calendar_date("nan"), None);
        assert_eq!(parse_calendar_date("05/072018"), None);
        assert_eq!(parse_calendar_date("2019-02-30"), None);
        assert_eq!(parse_calendar_date("20191340"), None);
    }
}
