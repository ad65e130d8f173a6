//! Lenient free-form date/time parsing.
//!
//! Well-known whole-string layouts (RFC 3339, RFC 2822, ISO 8601) are tried
//! first. Anything else is tokenized into numbers, clock times, words and
//! punctuation, and the date fields are resolved month-first. In fuzzy mode
//! unknown words and symbols are skipped; in strict mode they reject the text.

use std::sync::OnceLock;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use regex::Regex;

const NAIVE_DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];
const LONE_YEAR_RANGE: std::ops::RangeInclusive<u32> = 1900..=2100;
const TWO_DIGIT_YEAR_PIVOT: u32 = 69;

const MONTHS: &[(&str, u32)] = &[
    ("jan", 1),
    ("january", 1),
    ("feb", 2),
    ("february", 2),
    ("mar", 3),
    ("march", 3),
    ("apr", 4),
    ("april", 4),
    ("may", 5),
    ("jun", 6),
    ("june", 6),
    ("jul", 7),
    ("july", 7),
    ("aug", 8),
    ("august", 8),
    ("sep", 9),
    ("sept", 9),
    ("september", 9),
    ("oct", 10),
    ("october", 10),
    ("nov", 11),
    ("november", 11),
    ("dec", 12),
    ("december", 12),
];

const WEEKDAYS: &[&str] = &[
    "mon",
    "monday",
    "tue",
    "tues",
    "tuesday",
    "wed",
    "wednesday",
    "thu",
    "thur",
    "thurs",
    "thursday",
    "fri",
    "friday",
    "sat",
    "saturday",
    "sun",
    "sunday",
];

const ORDINAL_SUFFIXES: &[&str] = &["st", "nd", "rd", "th"];
const GLUE_WORDS: &[&str] = &["t", "at", "on", "of"];
const UTC_WORDS: &[&str] = &["z", "utc", "gmt"];
const STRICT_SYMBOLS: &[char] = &[',', '/', '-', '.'];

#[derive(Debug, Clone, PartialEq)]
enum Token<'a> {
    Clock(&'a str),
    Number(&'a str),
    Word(&'a str),
    Symbol(char),
}

#[derive(Debug, Clone, Copy)]
struct NumField {
    value: u32,
    digits: usize,
    sep_before: Option<char>,
}

impl NumField {
    fn year_like(&self) -> bool {
        self.digits == 4 || (self.digits <= 2 && self.value > 31)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Meridiem {
    Am,
    Pm,
}

#[derive(Debug, Default)]
struct Fields {
    numbers: Vec<NumField>,
    month_name: Option<u32>,
    clock: Option<(u32, u32, u32, u32)>,
    meridiem: Option<Meridiem>,
    offset_seconds: Option<i32>,
}

fn token_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"(?P<clock>[0-9]{1,2}:[0-9]{2}(?::[0-9]{2}(?:[.,][0-9]+)?)?)|(?P<num>[0-9]+)|(?P<word>[^\W\d_]+)|(?P<sym>\S)",
        )
        .expect("token pattern compiles")
    })
}

pub(crate) fn parse(text: &str, fuzzy: bool) -> Option<NaiveDateTime> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Some(parsed) = parse_known_layout(trimmed) {
        return Some(parsed);
    }
    let lowered = trimmed.to_lowercase();
    let tokens = tokenize(&lowered);
    let fields = collect_fields(&tokens, fuzzy)?;
    resolve(&fields)
}

fn parse_known_layout(text: &str) -> Option<NaiveDateTime> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.naive_utc());
    }
    if let Ok(parsed) = DateTime::parse_from_rfc2822(text) {
        return Some(parsed.naive_utc());
    }
    NAIVE_DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
}

fn tokenize(text: &str) -> Vec<Token<'_>> {
    token_pattern()
        .captures_iter(text)
        .filter_map(|caps| {
            if let Some(m) = caps.name("clock") {
                Some(Token::Clock(m.as_str()))
            } else if let Some(m) = caps.name("num") {
                Some(Token::Number(m.as_str()))
            } else if let Some(m) = caps.name("word") {
                Some(Token::Word(m.as_str()))
            } else {
                caps.name("sym")
                    .and_then(|m| m.as_str().chars().next())
                    .map(Token::Symbol)
            }
        })
        .collect()
}

fn collect_fields(tokens: &[Token<'_>], fuzzy: bool) -> Option<Fields> {
    let mut fields = Fields::default();
    let mut pending_sep: Option<char> = None;
    let mut idx = 0;

    while idx < tokens.len() {
        match &tokens[idx] {
            Token::Number(digits) => {
                if let Some(Token::Word(next)) = tokens.get(idx + 1)
                    && let Some(meridiem) = meridiem_of(next)
                {
                    if fields.clock.is_some() {
                        return None;
                    }
                    let hour: u32 = digits.parse().ok()?;
                    fields.clock = Some((hour, 0, 0, 0));
                    fields.meridiem = Some(meridiem);
                    idx += 2;
                    continue;
                }
                push_number(&mut fields, digits, pending_sep.take())?;
            }
            Token::Clock(clock) => {
                if fields.clock.is_some() {
                    return None;
                }
                fields.clock = Some(parse_clock(clock)?);
                pending_sep = None;
            }
            Token::Word(word) => {
                let previous_is_number = idx > 0 && matches!(tokens[idx - 1], Token::Number(_));
                if let Some(month) = month_of(word) {
                    if fields.month_name.is_some() {
                        return None;
                    }
                    fields.month_name = Some(month);
                } else if let Some(meridiem) = meridiem_of(word) {
                    if fields.clock.is_some() && fields.meridiem.is_none() {
                        fields.meridiem = Some(meridiem);
                    } else if !fuzzy {
                        return None;
                    }
                } else if UTC_WORDS.contains(word) {
                    fields.offset_seconds = Some(0);
                } else if WEEKDAYS.contains(word)
                    || GLUE_WORDS.contains(word)
                    || (previous_is_number && ORDINAL_SUFFIXES.contains(word))
                {
                    // Carries no date information.
                } else if !fuzzy {
                    return None;
                }
            }
            Token::Symbol(symbol) => {
                if matches!(symbol, '+' | '-')
                    && fields.clock.is_some()
                    && let Some(seconds) = parse_offset(tokens.get(idx + 1))
                {
                    let sign = if *symbol == '-' { -1 } else { 1 };
                    fields.offset_seconds = Some(sign * seconds);
                    idx += 2;
                    continue;
                }
                if STRICT_SYMBOLS.contains(symbol) {
                    pending_sep = Some(*symbol);
                } else if !fuzzy {
                    return None;
                }
            }
        }
        idx += 1;
    }

    Some(fields)
}

fn push_number(fields: &mut Fields, digits: &str, sep_before: Option<char>) -> Option<()> {
    if digits.len() == 8 {
        // Compact YYYYMMDD.
        let (year, rest) = digits.split_at(4);
        let (month, day) = rest.split_at(2);
        for (part, sep) in [(year, sep_before), (month, None), (day, None)] {
            fields.numbers.push(NumField {
                value: part.parse().ok()?,
                digits: part.len(),
                sep_before: sep,
            });
        }
        return Some(());
    }
    if digits.len() > 4 {
        return None;
    }
    fields.numbers.push(NumField {
        value: digits.parse().ok()?,
        digits: digits.len(),
        sep_before,
    });
    Some(())
}

fn month_of(word: &str) -> Option<u32> {
    MONTHS
        .iter()
        .find(|(name, _)| *name == word)
        .map(|(_, month)| *month)
}

fn meridiem_of(word: &str) -> Option<Meridiem> {
    match word {
        "am" => Some(Meridiem::Am),
        "pm" => Some(Meridiem::Pm),
        _ => None,
    }
}

fn parse_clock(clock: &str) -> Option<(u32, u32, u32, u32)> {
    let mut parts = clock.splitn(3, ':');
    let hour = parts.next()?.parse().ok()?;
    let minute = parts.next()?.parse().ok()?;
    let (second, nanos) = match parts.next() {
        Some(rest) => {
            let (whole, fraction) = match rest.split_once(['.', ',']) {
                Some((whole, fraction)) => (whole, Some(fraction)),
                None => (rest, None),
            };
            (whole.parse().ok()?, fraction.map(fraction_to_nanos).unwrap_or(0))
        }
        None => (0, 0),
    };
    Some((hour, minute, second, nanos))
}

fn fraction_to_nanos(fraction: &str) -> u32 {
    let mut padded: String = fraction.chars().take(9).collect();
    while padded.len() < 9 {
        padded.push('0');
    }
    padded.parse().unwrap_or(0)
}

fn parse_offset(token: Option<&Token<'_>>) -> Option<i32> {
    let (hours, minutes): (i32, i32) = match token? {
        Token::Number(digits) if digits.len() == 4 => {
            (digits[..2].parse().ok()?, digits[2..].parse().ok()?)
        }
        Token::Number(digits) if digits.len() <= 2 => (digits.parse().ok()?, 0),
        Token::Clock(clock) => {
            let (h, m) = clock.split_once(':')?;
            if m.contains(':') {
                return None;
            }
            (h.parse().ok()?, m.parse().ok()?)
        }
        _ => return None,
    };
    if hours > 23 || minutes > 59 {
        return None;
    }
    Some(hours * 3600 + minutes * 60)
}

fn resolve(fields: &Fields) -> Option<NaiveDateTime> {
    let date = resolve_date(fields)?;
    let time = resolve_time(fields)?;
    let naive = date.and_time(time);
    match fields.offset_seconds {
        None | Some(0) => Some(naive),
        Some(seconds) => FixedOffset::east_opt(seconds)?
            .from_local_datetime(&naive)
            .single()
            .map(|dt| dt.naive_utc()),
    }
}

fn resolve_date(fields: &Fields) -> Option<NaiveDate> {
    let numbers = fields.numbers.as_slice();
    if numbers.iter().any(|n| n.digits == 3) {
        return None;
    }

    let (year, month, day) = match fields.month_name {
        Some(month) => match numbers {
            [only] if only.year_like() => (*only, month, 1),
            [a, b] => match (a.year_like(), b.year_like()) {
                (true, false) => (*a, month, b.value),
                (false, _) => (*b, month, a.value),
                (true, true) => return None,
            },
            _ => return None,
        },
        None => match numbers {
            [only] if only.digits == 4 && LONE_YEAR_RANGE.contains(&only.value) => {
                if fields.clock.is_some() {
                    return None;
                }
                (*only, 1, 1)
            }
            [a, b] => {
                if !matches!(b.sep_before, Some('-') | Some('/')) {
                    return None;
                }
                match (a.digits == 4, b.digits == 4) {
                    (true, false) => (*a, b.value, 1),
                    (false, true) => (*b, a.value, 1),
                    _ => return None,
                }
            }
            [a, b, c] => {
                if b.sep_before != c.sep_before {
                    return None;
                }
                if a.digits == 4 {
                    if b.value > 12 && c.value <= 12 {
                        (*a, c.value, b.value)
                    } else {
                        (*a, b.value, c.value)
                    }
                } else if c.digits == 4 || c.digits == 2 {
                    if a.value > 12 {
                        (*c, b.value, a.value)
                    } else {
                        (*c, a.value, b.value)
                    }
                } else {
                    return None;
                }
            }
            _ => return None,
        },
    };

    NaiveDate::from_ymd_opt(expand_year(year)? as i32, month, day)
}

fn expand_year(field: NumField) -> Option<u32> {
    match field.digits {
        4 => Some(field.value),
        1 | 2 if field.value < TWO_DIGIT_YEAR_PIVOT => Some(2000 + field.value),
        1 | 2 => Some(1900 + field.value),
        _ => None,
    }
}

fn resolve_time(fields: &Fields) -> Option<NaiveTime> {
    let Some((mut hour, minute, second, nanos)) = fields.clock else {
        return Some(NaiveTime::MIN);
    };
    match fields.meridiem {
        Some(_) if hour == 0 || hour > 12 => return None,
        Some(Meridiem::Pm) if hour < 12 => hour += 12,
        Some(Meridiem::Am) if hour == 12 => hour = 0,
        _ => {}
    }
    NaiveTime::from_hms_nano_opt(hour, minute, second, nanos)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(year: i32, month: u32, day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(year, month, day)
            .unwrap()
            .and_time(NaiveTime::MIN)
    }

    fn ymd_hms(year: i32, month: u32, day: u32, h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(year, month, day)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    #[test]
    fn known_layouts_are_parsed_first() {
        assert_eq!(
            parse("2024-01-15T10:30:00Z", false),
            Some(ymd_hms(2024, 1, 15, 10, 30, 0))
        );
        assert_eq!(
            parse("2024-01-15T10:30:00+02:00", false),
            Some(ymd_hms(2024, 1, 15, 8, 30, 0))
        );
        assert_eq!(
            parse("Mon, 15 Jan 2024 10:30:00 +0000", false),
            Some(ymd_hms(2024, 1, 15, 10, 30, 0))
        );
    }

    #[test]
    fn numeric_dates_resolve_month_first() {
        assert_eq!(parse("2024-01-15", false), Some(ymd(2024, 1, 15)));
        assert_eq!(parse("01/02/2024", false), Some(ymd(2024, 1, 2)));
        assert_eq!(parse("15/01/2024", false), Some(ymd(2024, 1, 15)));
        assert_eq!(parse("15.01.2024", false), Some(ymd(2024, 1, 15)));
        assert_eq!(parse("20240115", false), Some(ymd(2024, 1, 15)));
        assert_eq!(parse("1/2/24", false), Some(ymd(2024, 1, 2)));
        assert_eq!(parse("12/31/99", false), Some(ymd(1999, 12, 31)));
    }

    #[test]
    fn month_names_and_ordinals() {
        assert_eq!(parse("March 5th, 2024", false), Some(ymd(2024, 3, 5)));
        assert_eq!(parse("15-Jan-2024", false), Some(ymd(2024, 1, 15)));
        assert_eq!(parse("Sept 2023", false), Some(ymd(2023, 9, 1)));
        assert_eq!(parse("Jan 5 24", false), Some(ymd(2024, 1, 5)));
        assert_eq!(parse("Tuesday, 2 April 2024", false), Some(ymd(2024, 4, 2)));
    }

    #[test]
    fn clock_times_and_meridiem() {
        assert_eq!(
            parse("2024-01-15 5pm", false),
            Some(ymd_hms(2024, 1, 15, 17, 0, 0))
        );
        assert_eq!(
            parse("01/15/2024 12:05 am", false),
            Some(ymd_hms(2024, 1, 15, 0, 5, 0))
        );
        assert_eq!(
            parse("2024-01-15 10:30 -05:00", false),
            Some(ymd_hms(2024, 1, 15, 15, 30, 0))
        );
        assert_eq!(parse("2024-01-15 13:00 pm", false), None);
    }

    #[test]
    fn missing_year_is_rejected() {
        assert_eq!(parse("Jan 5", true), None);
        assert_eq!(parse("1/15", true), None);
        assert_eq!(parse("10:30", true), None);
    }

    #[test]
    fn plain_amounts_are_not_dates() {
        for amount in ["12.50", "1,234", "100", "1.234.567", "(1,234.50)", "$100", "-1234.5"] {
            assert_eq!(parse(amount, false), None, "{amount} should not be a date");
        }
    }

    #[test]
    fn lone_year_is_january_first() {
        assert_eq!(parse("2023", false), Some(ymd(2023, 1, 1)));
        assert_eq!(parse("1500", false), None);
    }

    #[test]
    fn non_ascii_digits_never_form_numbers() {
        for text in ["11\u{0967}111", "2024-01-15 10:30 +1\u{0967}", "\u{0967}\u{0968}:30"] {
            assert_eq!(parse(text, false), None, "{text:?}");
        }
        assert_eq!(
            parse("2024-01-15 10:30 +1\u{0967}", true),
            Some(ymd_hms(2024, 1, 15, 9, 30, 0))
        );
        assert_eq!(parse("11\u{0967}111", true), None);
    }

    #[test]
    fn fuzzy_mode_skips_unknown_words() {
        assert_eq!(
            parse("Statement date: 15 Mar 2024", true),
            Some(ymd(2024, 3, 15))
        );
        assert_eq!(parse("Statement date: 15 Mar 2024", false), None);
        assert_eq!(parse("not a date", true), None);
    }
}
