//! Amount normalization: one raw token to a signed magnitude.
//!
//! The rules run in a fixed order and each one rewrites the working string:
//! accounting parentheses become a leading minus, currency symbols and stray
//! letters are stripped, a trailing `K`/`M`/`B` becomes a multiplier, and
//! commas are treated as grouping separators only.

use crate::error::ParseFailure;

/// Outcome of normalizing a single amount cell.
pub type ParsedAmount = Result<f64, ParseFailure>;

const THOUSAND: f64 = 1e3;
const MILLION: f64 = 1e6;
const BILLION: f64 = 1e9;

/// Parses an optional cell; an absent cell is reported as
/// [`ParseFailure::MissingValue`], never as zero.
pub fn parse_amount(cell: Option<&str>) -> ParsedAmount {
    match cell {
        Some(text) => normalize_amount(text),
        None => Err(ParseFailure::MissingValue),
    }
}

pub fn normalize_amount(text: &str) -> ParsedAmount {
    let trimmed = text.trim();

    let signed = match trimmed
        .strip_prefix('(')
        .and_then(|rest| rest.strip_suffix(')'))
    {
        Some(inner) => format!("-{inner}"),
        None => trimmed.to_string(),
    };

    let mut working: String = signed.chars().filter(|c| is_retained(*c)).collect();

    let multiplier = match working.chars().last().map(|c| c.to_ascii_lowercase()) {
        Some('k') => THOUSAND,
        Some('m') => MILLION,
        Some('b') => BILLION,
        _ => 1.0,
    };
    if multiplier != 1.0 {
        working.pop();
    }

    // Commas are grouping separators whatever the comma/period balance.
    working.retain(|c| c != ',');

    let magnitude: f64 = working.parse().map_err(|_| ParseFailure::amount(text))?;
    let value = magnitude * multiplier;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ParseFailure::amount(text))
    }
}

fn is_retained(c: char) -> bool {
    c.is_ascii_digit() || matches!(c, '.' | ',' | '-' | 'k' | 'K' | 'm' | 'M' | 'b' | 'B')
}
