//! Sample-based column type classification.
//!
//! A column is judged from at most `sample_limit` non-missing values taken
//! from its head. Dates are checked before numbers, so a column of bare years
//! such as `2023` lands on [`TypeVerdict::Date`] once enough of it parses.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    amount::normalize_amount,
    config::NormalizerConfig,
    date::{DateMode, looks_like_serial, parse_date_with_mode},
    table::RawCell,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeVerdict {
    Date,
    Number,
    String,
}

impl TypeVerdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            TypeVerdict::Date => "date",
            TypeVerdict::Number => "number",
            TypeVerdict::String => "string",
        }
    }
}

impl fmt::Display for TypeVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Evidence gathered for a single column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnProfile {
    pub verdict: TypeVerdict,
    pub sampled: usize,
    pub date_hits: usize,
    /// `None` when the date check already decided the verdict.
    pub number_hits: Option<usize>,
}

impl ColumnProfile {
    pub fn date_ratio(&self) -> f64 {
        ratio(self.date_hits, self.sampled)
    }

    pub fn number_ratio(&self) -> Option<f64> {
        self.number_hits.map(|hits| ratio(hits, self.sampled))
    }
}

#[derive(Debug, Clone, Default)]
pub struct Classifier {
    config: NormalizerConfig,
}

impl Classifier {
    pub fn new(config: NormalizerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &NormalizerConfig {
        &self.config
    }

    pub fn classify(&self, cells: &[RawCell]) -> TypeVerdict {
        self.profile(cells).verdict
    }

    pub fn profile(&self, cells: &[RawCell]) -> ColumnProfile {
        let sample = self.sample(cells);
        if sample.is_empty() {
            return ColumnProfile {
                verdict: TypeVerdict::String,
                sampled: 0,
                date_hits: 0,
                number_hits: None,
            };
        }

        let date_hits = sample
            .iter()
            .filter(|value| parse_date_with_mode(value, DateMode::Detect).is_ok())
            .count();
        if ratio(date_hits, sample.len()) > self.config.date_threshold {
            return ColumnProfile {
                verdict: TypeVerdict::Date,
                sampled: sample.len(),
                date_hits,
                number_hits: None,
            };
        }

        let number_hits = sample
            .iter()
            .filter(|value| normalize_amount(value).is_ok())
            .count();
        let verdict = if ratio(number_hits, sample.len()) > self.config.number_threshold {
            TypeVerdict::Number
        } else {
            TypeVerdict::String
        };
        ColumnProfile {
            verdict,
            sampled: sample.len(),
            date_hits,
            number_hits: Some(number_hits),
        }
    }

    /// True when every sampled value is a five digit integer, the shape of a
    /// spreadsheet serial date. Such columns classify as numbers.
    pub fn serial_like(&self, cells: &[RawCell]) -> bool {
        let sample = self.sample(cells);
        !sample.is_empty() && sample.iter().all(|value| looks_like_serial(value))
    }

    fn sample<'a>(&self, cells: &'a [RawCell]) -> Vec<&'a str> {
        cells
            .iter()
            .filter_map(|cell| cell.as_deref())
            .take(self.config.sample_limit)
            .collect()
    }
}

/// Classifies a column with the default policy.
pub fn classify_column(cells: &[RawCell]) -> TypeVerdict {
    Classifier::default().classify(cells)
}

fn ratio(hits: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        hits as f64 / total as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(values: &[&str]) -> Vec<RawCell> {
        values.iter().map(|v| Some(v.to_string())).collect()
    }

    #[test]
    fn empty_or_missing_columns_are_strings() {
        assert_eq!(classify_column(&[]), TypeVerdict::String);
        assert_eq!(classify_column(&[None, None]), TypeVerdict::String);
    }

    #[test]
    fn mostly_numeric_column_is_number() {
        let column = cells(&["100", "200", "abc", "300", "400"]);
        let profile = Classifier::default().profile(&column);
        assert_eq!(profile.verdict, TypeVerdict::Number);
        assert_eq!(profile.sampled, 5);
        assert_eq!(profile.date_hits, 0);
        assert_eq!(profile.number_hits, Some(4));
    }

    #[test]
    fn seventy_percent_dates_wins() {
        let mut column = vec![Some("2024-01-15".to_string()); 70];
        column.extend(vec![Some("pending".to_string()); 30]);
        assert_eq!(classify_column(&column), TypeVerdict::Date);
    }

    #[test]
    fn exactly_sixty_percent_is_not_enough() {
        let mut column = vec![Some("2024-01-15".to_string()); 6];
        column.extend(vec![Some("pending".to_string()); 4]);
        let profile = Classifier::default().profile(&column);
        assert_eq!(profile.date_ratio(), 0.6);
        assert_eq!(profile.verdict, TypeVerdict::String);
    }

    #[test]
    fn values_beyond_the_sample_are_ignored() {
        let mut column = vec![Some("Acme Corp".to_string()); 100];
        column.extend(vec![Some("1,000.00".to_string()); 500]);
        assert_eq!(classify_column(&column), TypeVerdict::String);

        let config = NormalizerConfig {
            sample_limit: 600,
            ..NormalizerConfig::default()
        };
        assert_eq!(Classifier::new(config).classify(&column), TypeVerdict::Number);
    }

    #[test]
    fn missing_cells_do_not_count_towards_the_sample() {
        let column = vec![None, Some("$1.2K".to_string()), None, Some("(45)".to_string())];
        assert_eq!(classify_column(&column), TypeVerdict::Number);
    }

    #[test]
    fn bare_years_bias_towards_dates() {
        let column = cells(&["2021", "2022", "2023", "2024"]);
        assert_eq!(classify_column(&column), TypeVerdict::Date);
    }

    #[test]
    fn non_ascii_digits_are_classified_without_panicking() {
        let column = cells(&["11\u{0967}111", "11\u{0967}111", "11\u{0967}111"]);
        let profile = Classifier::default().profile(&column);
        assert_eq!(profile.date_hits, 0);
        assert_eq!(profile.verdict, TypeVerdict::Number);

        let column = cells(&["2024-01-15 10:30 +1\u{0967}", "Q1\u{0967}\u{0968}"]);
        assert_eq!(classify_column(&column), TypeVerdict::String);
    }

    #[test]
    fn serial_like_needs_every_sampled_value_to_be_a_serial() {
        let classifier = Classifier::default();
        assert!(classifier.serial_like(&cells(&["45000", "45010", " 45020 "])));
        assert!(!classifier.serial_like(&cells(&["45000", "4501"])));
        assert!(!classifier.serial_like(&cells(&["45000", "45010.5"])));
        assert!(!classifier.serial_like(&[None, None]));
    }

    #[test]
    fn quarters_are_dates() {
        let column = cells(&["Q1-24", "Q2-24", "Q3-24", "Q4-24"]);
        assert_eq!(classify_column(&column), TypeVerdict::Date);
    }
}
