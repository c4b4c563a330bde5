//! Calendar-date helpers for visit and annotation dates.
//!
//! Dates cross API boundaries as `YYYY-MM-DD` and are persisted as Julian
//! day numbers so SQL ordering is plain integer ordering.

use super::validation::RecordValidationError;
use time::format_description::FormatItem;
use time::macros::format_description;
use time::{Date, OffsetDateTime};

const ISO_DATE: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// Today's date in UTC. Used when a caller does not supply a date.
pub fn today_utc() -> Date {
    OffsetDateTime::now_utc().date()
}

/// Parses a `YYYY-MM-DD` string, ignoring surrounding whitespace.
pub fn parse_calendar_date(value: &str) -> Result<Date, RecordValidationError> {
    let trimmed = value.trim();
    Date::parse(trimmed, ISO_DATE)
        .map_err(|_| RecordValidationError::InvalidDate(trimmed.to_string()))
}

/// Formats a date as `YYYY-MM-DD`, zero-padding the year to four digits.
pub fn format_calendar_date(date: Date) -> String {
    let year = date.year();
    let sign = if year < 0 { "-" } else { "" };
    format!(
        "{sign}{:04}-{:02}-{:02}",
        year.unsigned_abs(),
        u8::from(date.month()),
        date.day()
    )
}

#[cfg(test)]
mod tests {
    use super::{format_calendar_date, parse_calendar_date};
    use time::{Date, Month};

    #[test]
    fn parses_iso_dates_with_padding() {
        let date = parse_calendar_date(" 2024-01-10 ").unwrap();
        assert_eq!(
            date,
            Date::from_calendar_date(2024, Month::January, 10).unwrap()
        );
        assert_eq!(format_calendar_date(date), "2024-01-10");
    }

    #[test]
    fn formats_small_years_with_padding() {
        let date = Date::from_calendar_date(987, Month::March, 5).unwrap();
        assert_eq!(format_calendar_date(date), "0987-03-05");
        assert_eq!(parse_calendar_date("0987-03-05").unwrap(), date);
    }

    #[test]
    fn rejects_impossible_dates() {
        assert!(parse_calendar_date("2024-02-30").is_err());
        assert!(parse_calendar_date("10/01/2024").is_err());
        assert!(parse_calendar_date("").is_err());
    }
}
