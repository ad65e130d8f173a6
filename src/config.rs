//! Tunable policy for classification and normalization.
//!
//! The defaults reproduce the behaviour the heuristics were calibrated with:
//! a 100 value sample and a strict 60% success ratio for both dates and
//! numbers. Configuration files are YAML; omitted keys keep their defaults.
//!
//! ```yaml
//! sample_limit: 250
//! date_threshold: 0.75
//! name_hints: true
//! overrides:
//!   Posting Ref: string
//! ```

use std::{collections::BTreeMap, fs::File, io::BufReader, path::Path};

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};

use crate::classify::TypeVerdict;

pub const DEFAULT_SAMPLE_LIMIT: usize = 100;
pub const DEFAULT_THRESHOLD: f64 = 0.6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    /// Maximum number of non-missing values sampled from the head of a column.
    pub sample_limit: usize,
    /// A column is a date column when its date ratio is strictly above this.
    pub date_threshold: f64,
    /// A column is numeric when its amount ratio is strictly above this.
    pub number_threshold: f64,
    /// Force columns named like `*date*` to dates and `*amount*` to numbers.
    pub name_hints: bool,
    /// Explicit verdicts per column name; these beat both hints and sampling.
    pub overrides: BTreeMap<String, TypeVerdict>,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            sample_limit: DEFAULT_SAMPLE_LIMIT,
            date_threshold: DEFAULT_THRESHOLD,
            number_threshold: DEFAULT_THRESHOLD,
            name_hints: false,
            overrides: BTreeMap::new(),
        }
    }
}

impl NormalizerConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening config file {path:?}"))?;
        let reader = BufReader::new(file);
        let config: NormalizerConfig =
            serde_yaml::from_reader(reader).with_context(|| format!("Parsing config {path:?}"))?;
        config
            .validate()
            .with_context(|| format!("Validating config {path:?}"))?;
        Ok(config)
    }

    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(self.sample_limit > 0, "sample_limit must be at least 1");
        for (name, value) in [
            ("date_threshold", self.date_threshold),
            ("number_threshold", self.number_threshold),
        ] {
            ensure!(
                (0.0..=1.0).contains(&value),
                "{name} must be between 0 and 1, got {value}"
            );
        }
        Ok(())
    }

    /// Verdict forced on a column by name, if any.
    pub fn forced_verdict(&self, column_name: &str) -> Option<TypeVerdict> {
        if let Some(verdict) = self.overrides.get(column_name) {
            return Some(*verdict);
        }
        if !self.name_hints {
            return None;
        }
        let lowered = column_name.to_lowercase();
        if lowered.contains("date") {
            Some(TypeVerdict::Date)
        } else if lowered.contains("amount") {
            Some(TypeVerdict::Number)
        } else {
            None
        }
    }
}
