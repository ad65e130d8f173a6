//! Column normalization: classify a column, then run the matching normalizer
//! over every cell while keeping row alignment.

use std::{num::NonZeroUsize, thread};

use chrono::NaiveDateTime;
use log::debug;
use serde::Serialize;

use crate::{
    amount::normalize_amount,
    classify::{Classifier, TypeVerdict},
    config::NormalizerConfig,
    date::{format_timestamp, normalize_date},
    error::ParseFailure,
    table::{RawCell, Table},
};

/// One normalized cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Slot<T> {
    Missing,
    Value(T),
    Failed(ParseFailure),
}

impl<T> Slot<T> {
    fn from_cell<F>(cell: &RawCell, parse: F) -> Self
    where
        F: Fn(&str) -> Result<T, ParseFailure>,
    {
        match cell.as_deref() {
            None => Slot::Missing,
            Some(text) => match parse(text) {
                Ok(value) => Slot::Value(value),
                Err(failure) => Slot::Failed(failure),
            },
        }
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Slot::Value(value) => Some(value),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&ParseFailure> {
        match self {
            Slot::Failed(failure) => Some(failure),
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Slot::Missing)
    }
}

/// A successfully normalized value of either typed kind.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
pub enum TypedValue {
    Amount(f64),
    Timestamp(NaiveDateTime),
}

impl TypedValue {
    pub fn render(&self) -> String {
        match self {
            TypedValue::Amount(value) => value.to_string(),
            TypedValue::Timestamp(value) => format_timestamp(value),
        }
    }
}

/// Normalized counterpart of a raw column, always the same length and order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum NormalizedColumn {
    /// String verdict: cells pass through untouched.
    Text(Vec<RawCell>),
    Amounts(Vec<Slot<f64>>),
    Timestamps(Vec<Slot<NaiveDateTime>>),
}

impl NormalizedColumn {
    pub fn verdict(&self) -> TypeVerdict {
        match self {
            NormalizedColumn::Text(_) => TypeVerdict::String,
            NormalizedColumn::Amounts(_) => TypeVerdict::Number,
            NormalizedColumn::Timestamps(_) => TypeVerdict::Date,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            NormalizedColumn::Text(cells) => cells.len(),
            NormalizedColumn::Amounts(slots) => slots.len(),
            NormalizedColumn::Timestamps(slots) => slots.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Typed view of one row; `None` for pass-through text columns or an
    /// out-of-range row.
    pub fn typed_slot(&self, row: usize) -> Option<Slot<TypedValue>> {
        match self {
            NormalizedColumn::Text(_) => None,
            NormalizedColumn::Amounts(slots) => slots.get(row).map(|slot| match slot {
                Slot::Missing => Slot::Missing,
                Slot::Value(value) => Slot::Value(TypedValue::Amount(*value)),
                Slot::Failed(failure) => Slot::Failed(failure.clone()),
            }),
            NormalizedColumn::Timestamps(slots) => slots.get(row).map(|slot| match slot {
                Slot::Missing => Slot::Missing,
                Slot::Value(value) => Slot::Value(TypedValue::Timestamp(*value)),
                Slot::Failed(failure) => Slot::Failed(failure.clone()),
            }),
        }
    }

    /// Display text for one row: canonical rendering for typed values, the
    /// original text for pass-through columns, `None` for missing or failed.
    pub fn rendered(&self, row: usize) -> Option<String> {
        match self {
            NormalizedColumn::Text(cells) => cells.get(row).cloned().flatten(),
            _ => self
                .typed_slot(row)
                .and_then(|slot| slot.value().map(TypedValue::render)),
        }
    }

    /// Failure ledger: every failed row with its failure, in row order.
    pub fn failures(&self) -> Vec<(usize, &ParseFailure)> {
        fn collect<T>(slots: &[Slot<T>]) -> Vec<(usize, &ParseFailure)> {
            slots
                .iter()
                .enumerate()
                .filter_map(|(row, slot)| slot.failure().map(|failure| (row, failure)))
                .collect()
        }
        match self {
            NormalizedColumn::Text(_) => Vec::new(),
            NormalizedColumn::Amounts(slots) => collect(slots),
            NormalizedColumn::Timestamps(slots) => collect(slots),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NamedColumn {
    pub name: String,
    pub values: NormalizedColumn,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedTable {
    pub name: String,
    pub columns: Vec<NamedColumn>,
}

impl NormalizedTable {
    pub fn row_count(&self) -> usize {
        self.columns.first().map_or(0, |c| c.values.len())
    }

    pub fn column(&self, name: &str) -> Option<&NormalizedColumn> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| &c.values)
    }

    pub fn failure_count(&self) -> usize {
        self.columns.iter().map(|c| c.values.failures().len()).sum()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    classifier: Classifier,
}

impl Pipeline {
    pub fn new(config: NormalizerConfig) -> Self {
        Self {
            classifier: Classifier::new(config),
        }
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    pub fn normalize(&self, cells: &[RawCell]) -> NormalizedColumn {
        normalize_as(self.classifier.classify(cells), cells)
    }

    /// Like [`Pipeline::normalize`], but honours verdicts forced on the column
    /// name by configuration.
    pub fn normalize_named(&self, name: &str, cells: &[RawCell]) -> NormalizedColumn {
        let verdict = match self.classifier.config().forced_verdict(name) {
            Some(forced) => {
                debug!("Column '{name}' forced to {forced}");
                forced
            }
            None => self.classifier.classify(cells),
        };
        let normalized = normalize_as(verdict, cells);
        debug!(
            "Column '{name}' normalized as {verdict} with {} failure(s)",
            normalized.failures().len()
        );
        normalized
    }

    /// Normalizes every column of `table`. Columns are spread over scoped
    /// worker threads and reassembled in their original order.
    pub fn normalize_table(&self, table: &Table) -> NormalizedTable {
        let workers = thread::available_parallelism()
            .map(NonZeroUsize::get)
            .unwrap_or(1);
        let chunk_size = table.columns.len().div_ceil(workers).max(1);

        let columns: Vec<NamedColumn> = thread::scope(|scope| {
            let handles: Vec<_> = table
                .columns
                .chunks(chunk_size)
                .map(|chunk| {
                    scope.spawn(move || {
                        chunk
                            .iter()
                            .map(|column| NamedColumn {
                                name: column.name.clone(),
                                values: self.normalize_named(&column.name, &column.cells),
                            })
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            handles
                .into_iter()
                .flat_map(|handle| {
                    handle
                        .join()
                        .unwrap_or_else(|payload| std::panic::resume_unwind(payload))
                })
                .collect()
        });

        NormalizedTable {
            name: table.name.clone(),
            columns,
        }
    }
}

/// Applies the normalizer matching `verdict` to every cell.
pub fn normalize_as(verdict: TypeVerdict, cells: &[RawCell]) -> NormalizedColumn {
    match verdict {
        TypeVerdict::String => NormalizedColumn::Text(cells.to_vec()),
        TypeVerdict::Number => NormalizedColumn::Amounts(
            cells
                .iter()
                .map(|cell| Slot::from_cell(cell, normalize_amount))
                .collect(),
        ),
        TypeVerdict::Date => NormalizedColumn::Timestamps(
            cells
                .iter()
                .map(|cell| Slot::from_cell(cell, normalize_date))
                .collect(),
        ),
    }
}

/// Classifies and normalizes a column with the default policy.
pub fn normalize_column(cells: &[RawCell]) -> NormalizedColumn {
    Pipeline::default().normalize(cells)
}
