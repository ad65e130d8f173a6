//! Date normalization: one raw token to a canonical timestamp.
//!
//! Rules are tried in a fixed order and the first structural match commits:
//!
//! 1. spreadsheet serial day numbers (1 to 5 ASCII digits),
//! 2. fiscal quarter notation such as `Q3-24` or `q1 2025`,
//! 3. a lenient free-form parse (see [`freeform`]).
//!
//! A token that looks like a serial or a quarter never falls back to the
//! free-form parser, so a malformed `Q4-2x` cannot be misread as some other
//! date.

mod freeform;

use std::sync::OnceLock;

use chrono::{Days, NaiveDate, NaiveDateTime, NaiveTime};
use regex::{Captures, Regex};

use crate::error::ParseFailure;

/// Outcome of normalizing a single date cell.
pub type ParsedDate = Result<NaiveDateTime, ParseFailure>;

const SERIAL_MAX_DIGITS: usize = 5;
const SERIAL_EPOCH: (i32, u32, u32) = (1899, 12, 30);

/// Canonical text rendering used for normalized timestamps.
pub const CANONICAL_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Which rules apply when parsing a date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateMode {
    /// All rules, free-form parsing skips unrecognised words.
    #[default]
    Normalize,
    /// Used while classifying columns: serial numbers are not dates and the
    /// free-form parser rejects anything it does not recognise.
    Detect,
}

impl DateMode {
    fn accepts_serials(self) -> bool {
        matches!(self, DateMode::Normalize)
    }

    fn fuzzy(self) -> bool {
        matches!(self, DateMode::Normalize)
    }
}

fn quarter_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)^Q([1-4])(?:[-/_'\s]\s*)?([0-9]{4}|[0-9]{2})(?:[^0-9]|$)")
            .expect("quarter pattern compiles")
    })
}

/// Parses an optional cell; an absent cell is [`ParseFailure::MissingValue`].
pub fn parse_date(cell: Option<&str>) -> ParsedDate {
    match cell {
        Some(text) => normalize_date(text),
        None => Err(ParseFailure::MissingValue),
    }
}

pub fn normalize_date(text: &str) -> ParsedDate {
    parse_date_with_mode(text, DateMode::Normalize)
}

pub fn parse_date_with_mode(text: &str, mode: DateMode) -> ParsedDate {
    let trimmed = text.trim();

    if mode.accepts_serials() && is_serial_token(trimmed) {
        return serial_date(text, trimmed);
    }

    if let Some(caps) = quarter_pattern().captures(trimmed) {
        return quarter_start(text, &caps);
    }

    freeform::parse(trimmed, mode.fuzzy()).ok_or_else(|| ParseFailure::date(text))
}

/// Renders a timestamp in [`CANONICAL_FORMAT`].
pub fn format_timestamp(value: &NaiveDateTime) -> String {
    value.format(CANONICAL_FORMAT).to_string()
}

/// Five ASCII digits: a serial day number between 1927 and 2173.
pub fn looks_like_serial(text: &str) -> bool {
    let trimmed = text.trim();
    trimmed.len() == SERIAL_MAX_DIGITS && is_serial_token(trimmed)
}

fn is_serial_token(trimmed: &str) -> bool {
    !trimmed.is_empty()
        && trimmed.len() <= SERIAL_MAX_DIGITS
        && trimmed.bytes().all(|b| b.is_ascii_digit())
}

fn serial_date(raw: &str, digits: &str) -> ParsedDate {
    let (year, month, day) = SERIAL_EPOCH;
    let offset: u64 = digits
        .parse()
        .map_err(|_| ParseFailure::ambiguous(raw, "serial day number is not an integer"))?;
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|epoch| epoch.checked_add_days(Days::new(offset)))
        .map(midnight)
        .ok_or_else(|| ParseFailure::ambiguous(raw, "serial day number is out of range"))
}

fn quarter_start(raw: &str, caps: &Captures<'_>) -> ParsedDate {
    let quarter: u32 = caps[1]
        .parse()
        .map_err(|_| ParseFailure::ambiguous(raw, "quarter is not a number"))?;
    let year_digits = &caps[2];
    let mut year: i32 = year_digits
        .parse()
        .map_err(|_| ParseFailure::ambiguous(raw, "quarter year is not a number"))?;
    if year_digits.len() == 2 {
        year += 2000;
    }
    NaiveDate::from_ymd_opt(year, 3 * quarter - 2, 1)
        .map(midnight)
        .ok_or_else(|| ParseFailure::ambiguous(raw, "quarter start is not a calendar date"))
}

fn midnight(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(year: i32, month: u32, day: u32) -> NaiveDateTime {
        midnight(NaiveDate::from_ymd_opt(year, month, day).unwrap())
    }

    #[test]
    fn serial_numbers_count_from_spreadsheet_epoch() {
        let epoch = NaiveDate::from_ymd_opt(1899, 12, 30).unwrap();
        let expected = midnight(epoch.checked_add_days(Days::new(45000)).unwrap());
        assert_eq!(normalize_date("45000").unwrap(), expected);
        assert_eq!(normalize_date("45000").unwrap(), ymd(2023, 3, 15));
        assert_eq!(normalize_date("0").unwrap(), ymd(1899, 12, 30));
        assert_eq!(normalize_date(" 2023 ").unwrap(), ymd(1905, 7, 15));
    }

    #[test]
    fn six_digit_numbers_are_not_serials() {
        assert_eq!(
            normalize_date("123456"),
            Err(ParseFailure::date("123456"))
        );
    }

    #[test]
    fn non_ascii_digits_do_not_panic() {
        assert!(normalize_date("11\u{0967}111").is_err());
        assert!(normalize_date("Q3-\u{0968}\u{0966}").is_err());
        assert!(!looks_like_serial("4\u{0967}000"));
        assert!(looks_like_serial(" 45000 "));
    }

    #[test]
    fn quarters_map_to_first_day() {
        assert_eq!(normalize_date("Q3-24").unwrap(), ymd(2024, 7, 1));
        assert_eq!(normalize_date("q1 2025").unwrap(), ymd(2025, 1, 1));
        assert_eq!(normalize_date("Q4'23").unwrap(), ymd(2023, 10, 1));
        assert_eq!(normalize_date("Q2/2022 actuals").unwrap(), ymd(2022, 4, 1));
        assert_eq!(normalize_date("Q22024").unwrap(), ymd(2024, 4, 1));
    }

    #[test]
    fn unrecognised_text_fails() {
        assert_eq!(
            normalize_date("not a date"),
            Err(ParseFailure::date("not a date"))
        );
        assert_eq!(parse_date(None), Err(ParseFailure::MissingValue));
    }

    #[test]
    fn detect_mode_skips_serials_and_fuzziness() {
        assert!(parse_date_with_mode("100", DateMode::Detect).is_err());
        assert!(parse_date_with_mode("Paid on 2024-01-15", DateMode::Detect).is_err());
        assert_eq!(
            parse_date_with_mode("Paid on 2024-01-15", DateMode::Normalize).unwrap(),
            ymd(2024, 1, 15)
        );
        assert_eq!(
            parse_date_with_mode("Q1-24", DateMode::Detect).unwrap(),
            ymd(2024, 1, 1)
        );
    }

    #[test]
    fn canonical_rendering_round_trips() {
        let value = normalize_date("March 5th, 2024 4:15pm").unwrap();
        let rendered = format_timestamp(&value);
        assert_eq!(rendered, "2024-03-05 16:15:00");
        assert_eq!(normalize_date(&rendered).unwrap(), value);
    }
}
