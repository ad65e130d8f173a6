//! Per-value failure taxonomy shared by the normalizers and the pipeline.

use serde::Serialize;
use thiserror::Error;

/// Why a single raw cell could not be turned into a typed value.
///
/// Every variant except [`ParseFailure::MissingValue`] carries the original
/// raw text so the failure ledger can be inspected without re-reading the
/// source.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParseFailure {
    #[error("value is missing")]
    MissingValue,
    #[error("'{raw}' is not a recognizable amount")]
    UnparseableAmount { raw: String },
    #[error("'{raw}' is not a recognizable date")]
    UnparseableDate { raw: String },
    #[error("'{raw}' matched a structural pattern but is invalid: {reason}")]
    AmbiguousPattern { raw: String, reason: String },
}

impl ParseFailure {
    pub fn amount(raw: &str) -> Self {
        ParseFailure::UnparseableAmount {
            raw: raw.to_string(),
        }
    }

    pub fn date(raw: &str) -> Self {
        ParseFailure::UnparseableDate {
            raw: raw.to_string(),
        }
    }

    pub fn ambiguous(raw: &str, reason: impl Into<String>) -> Self {
        ParseFailure::AmbiguousPattern {
            raw: raw.to_string(),
            reason: reason.into(),
        }
    }

    /// Original text of the cell, if any was present.
    pub fn raw(&self) -> Option<&str> {
        match self {
            ParseFailure::MissingValue => None,
            ParseFailure::UnparseableAmount { raw }
            | ParseFailure::UnparseableDate { raw }
            | ParseFailure::AmbiguousPattern { raw, .. } => Some(raw),
        }
    }

    /// Short machine-friendly label used in failure ledgers.
    pub fn kind(&self) -> &'static str {
        match self {
            ParseFailure::MissingValue => "missing_value",
            ParseFailure::UnparseableAmount { .. } => "unparseable_amount",
            ParseFailure::UnparseableDate { .. } => "unparseable_date",
            ParseFailure::AmbiguousPattern { .. } => "ambiguous_pattern",
        }
    }
}
