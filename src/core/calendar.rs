//! Date parsing and epidemiological weeks
//!
//! Week 1 of an epi year starts on the configured weekday closest to 1 January
//! (at most three days before or after it). Every later week starts seven days
//! on. Dates before the start of week 1 belong to the last week of the
//! previous epi year.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, Weekday};
use serde_json::Value;

/// An epidemiological week number within its epi year
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EpiWeek {
    pub year: i32,
    pub week: u32,
}

/// Maps a calendar date to its epi week
pub trait EpiWeekCalendar: Send + Sync {
    /// `None` only for dates outside the supported calendar range
    fn epi_week(&self, date: NaiveDate) -> Option<EpiWeek>;
}

/// Calendar whose weeks start on a fixed weekday
///
/// With [`Weekday::Mon`] this coincides with ISO-8601 week numbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferenceWeekdayCalendar {
    start: Weekday,
}

impl ReferenceWeekdayCalendar {
    pub fn new(start: Weekday) -> Self {
        Self { start }
    }

    /// First day of week 1 of `year`
    fn year_start(&self, year: i32) -> Option<NaiveDate> {
        let jan1 = NaiveDate::from_ymd_opt(year, 1, 1)?;
        let offset = (i64::from(jan1.weekday().num_days_from_monday())
            - i64::from(self.start.num_days_from_monday()))
        .rem_euclid(7);
        if offset <= 3 {
            jan1.checked_sub_signed(Duration::days(offset))
        } else {
            jan1.checked_add_signed(Duration::days(7 - offset))
        }
    }
}

impl Default for ReferenceWeekdayCalendar {
    fn default() -> Self {
        Self::new(Weekday::Mon)
    }
}

impl EpiWeekCalendar for ReferenceWeekdayCalendar {
    fn epi_week(&self, date: NaiveDate) -> Option<EpiWeek> {
        let mut year = date.year();
        let mut start = self.year_start(year)?;

        if date < start {
            year -= 1;
            start = self.year_start(year)?;
        } else {
            let next = self.year_start(year + 1)?;
            if date >= next {
                year += 1;
                start = next;
            }
        }

        let week = (date - start).num_days() / 7 + 1;
        Some(EpiWeek {
            year,
            week: u32::try_from(week).ok()?,
        })
    }
}

/// Parses a weekday name such as `monday` or `Sun`
pub fn parse_weekday(name: &str) -> Option<Weekday> {
    name.trim().parse::<Weekday>().ok()
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y"];

/// Parses the textual date forms found in form submissions
///
/// RFC 3339 timestamps keep their wall-clock time; the offset is dropped.
/// Anything unparsable is `None`, which projects to an empty cell.
pub fn parse_date(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_local());
    }
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt);
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return date.and_hms_opt(0, 0, 0);
        }
    }
    None
}

/// [`parse_date`] over a cell value; non-string values never parse
pub fn parse_date_value(value: &Value) -> Option<NaiveDateTime> {
    value.as_str().and_then(parse_date)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_monday_calendar_matches_iso_weeks() {
        let calendar = ReferenceWeekdayCalendar::default();
        let mut date = ymd(2013, 12, 1);
        while date < ymd(2017, 2, 1) {
            let iso = date.iso_week();
            let epi = calendar.epi_week(date).unwrap();
            assert_eq!((epi.year, epi.week), (iso.year(), iso.week()), "{date}");
            date = date.succ_opt().unwrap();
        }
    }

    #[test]
    fn test_known_epi_week() {
        let calendar = ReferenceWeekdayCalendar::default();
        assert_eq!(
            calendar.epi_week(ymd(2015, 4, 30)),
            Some(EpiWeek { year: 2015, week: 18 })
        );
    }

    #[test]
    fn test_sunday_calendar() {
        // 2015-01-01 is a Thursday; the closest Sunday is 2015-01-04.
        let calendar = ReferenceWeekdayCalendar::new(Weekday::Sun);
        assert_eq!(
            calendar.epi_week(ymd(2015, 1, 4)),
            Some(EpiWeek { year: 2015, week: 1 })
        );
        assert_eq!(calendar.epi_week(ymd(2015, 1, 3)).unwrap().year, 2014);
        assert_eq!(
            calendar.epi_week(ymd(2015, 1, 11)),
            Some(EpiWeek { year: 2015, week: 2 })
        );
    }

    #[test]
    fn test_epi_week_is_deterministic() {
        let calendar = ReferenceWeekdayCalendar::new(Weekday::Sat);
        let date = ymd(2016, 7, 14);
        assert_eq!(calendar.epi_week(date), calendar.epi_week(date));
    }

    #[test]
    fn test_parse_weekday() {
        assert_eq!(parse_weekday("monday"), Some(Weekday::Mon));
        assert_eq!(parse_weekday("Sun"), Some(Weekday::Sun));
        assert_eq!(parse_weekday("someday"), None);
    }

    #[test]
    fn test_parse_date_forms() {
        let expected = ymd(2015, 4, 30).and_hms_opt(0, 0, 0).unwrap();
        assert_eq!(parse_date("2015-04-30"), Some(expected));
        assert_eq!(parse_date("30/04/2015"), Some(expected));
        assert_eq!(parse_date("2015-04-30T00:00:00"), Some(expected));
        assert_eq!(parse_date("2015-04-30 00:00:00.000"), Some(expected));

        let with_time = parse_date("2015-04-30T23:54:16.049059").unwrap();
        assert_eq!(with_time.date(), ymd(2015, 4, 30));

        let offset = parse_date("2015-04-30T23:54:16+03:00").unwrap();
        assert_eq!(offset.date(), ymd(2015, 4, 30));
    }

    #[test]
    fn test_unparsable_dates() {
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("yesterday"), None);
        assert_eq!(parse_date("2015-13-40"), None);
        assert_eq!(parse_date_value(&json!(20150430)), None);
        assert!(parse_date_value(&json!("2015-04-30")).is_some());
    }
}
