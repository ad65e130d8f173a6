//! In-memory store of normalized tables with range queries and group sums.
//!
//! Failed and missing slots are excluded from every computation; they are
//! never coerced to zero or to the epoch.

use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;

use crate::{
    classify::TypeVerdict,
    pipeline::{NormalizedColumn, NormalizedTable, Slot, TypedValue},
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("no dataset named '{0}'")]
    UnknownDataset(String),
    #[error("dataset '{dataset}' has no column '{column}'")]
    UnknownColumn { dataset: String, column: String },
    #[error("column '{column}' holds {actual} values, expected {expected}")]
    WrongColumnType {
        column: String,
        expected: TypeVerdict,
        actual: TypeVerdict,
    },
    #[error("range bounds must both be {expected} values")]
    MismatchedBounds { expected: TypeVerdict },
}

/// Sum of one group in an aggregation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSum {
    pub key: String,
    pub total: f64,
    pub rows: usize,
}

#[derive(Debug, Clone, Default)]
pub struct FinancialStore {
    datasets: BTreeMap<String, NormalizedTable>,
}

impl FinancialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `table` under its name, replacing any previous dataset.
    pub fn add_dataset(&mut self, table: NormalizedTable) {
        self.datasets.insert(table.name.clone(), table);
    }

    pub fn dataset(&self, name: &str) -> Result<&NormalizedTable, StoreError> {
        self.datasets
            .get(name)
            .ok_or_else(|| StoreError::UnknownDataset(name.to_string()))
    }

    pub fn dataset_names(&self) -> impl Iterator<Item = &str> {
        self.datasets.keys().map(String::as_str)
    }

    /// Row indices whose `column` value lies within `[start, end]`.
    pub fn query_range(
        &self,
        name: &str,
        column: &str,
        start: TypedValue,
        end: TypedValue,
    ) -> Result<Vec<usize>, StoreError> {
        let values = self.column(name, column)?;
        let expected = match values {
            NormalizedColumn::Amounts(_) => TypeVerdict::Number,
            NormalizedColumn::Timestamps(_) => TypeVerdict::Date,
            NormalizedColumn::Text(_) => {
                return Err(StoreError::WrongColumnType {
                    column: column.to_string(),
                    expected: bound_verdict(&start),
                    actual: TypeVerdict::String,
                });
            }
        };
        if bound_verdict(&start) != expected || bound_verdict(&end) != expected {
            return Err(StoreError::MismatchedBounds { expected });
        }

        Ok((0..values.len())
            .filter(|row| match values.typed_slot(*row) {
                Some(Slot::Value(value)) => start <= value && value <= end,
                _ => false,
            })
            .collect())
    }

    /// Sums the amount column `value_column` per distinct rendered value of
    /// `group_by`. Groups are returned in ascending key order.
    pub fn aggregate(
        &self,
        name: &str,
        group_by: &str,
        value_column: &str,
    ) -> Result<Vec<GroupSum>, StoreError> {
        let keys = self.column(name, group_by)?;
        let values = self.column(name, value_column)?;
        let NormalizedColumn::Amounts(amounts) = values else {
            return Err(StoreError::WrongColumnType {
                column: value_column.to_string(),
                expected: TypeVerdict::Number,
                actual: values.verdict(),
            });
        };

        let mut groups: BTreeMap<String, GroupSum> = BTreeMap::new();
        for (row, slot) in amounts.iter().enumerate() {
            let (Some(key), Some(amount)) = (keys.rendered(row), slot.value()) else {
                continue;
            };
            let entry = groups.entry(key.clone()).or_insert_with(|| GroupSum {
                key,
                total: 0.0,
                rows: 0,
            });
            entry.total += amount;
            entry.rows += 1;
        }
        Ok(groups.into_values().collect())
    }

    fn column(&self, name: &str, column: &str) -> Result<&NormalizedColumn, StoreError> {
        self.dataset(name)?
            .column(column)
            .ok_or_else(|| StoreError::UnknownColumn {
                dataset: name.to_string(),
                column: column.to_string(),
            })
    }
}

fn bound_verdict(bound: &TypedValue) -> TypeVerdict {
    match bound {
        TypedValue::Amount(_) => TypeVerdict::Number,
        TypedValue::Timestamp(_) => TypeVerdict::Date,
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::{
        pipeline::Pipeline,
        table::{RawColumn, Table},
    };

    fn bank_store() -> FinancialStore {
        let cell = |v: &str| if v.is_empty() { None } else { Some(v.to_string()) };
        let table = Table::new(
            "kh_bank",
            vec![
                RawColumn::new(
                    "ValueDate",
                    ["2022-12-31", "2023-01-01", "2023-06-30", "bogus", "2024-01-01", ""]
                        .into_iter()
                        .map(cell)
                        .collect(),
                ),
                RawColumn::new(
                    "Amount",
                    ["10", "(5.50)", "$1K", "20", "n/a", "7"]
                        .into_iter()
                        .map(cell)
                        .collect(),
                ),
                RawColumn::new(
                    "Currency",
                    ["EUR", "USD", "EUR", "USD", "EUR", ""]
                        .into_iter()
                        .map(cell)
                        .collect(),
                ),
            ],
        );
        let mut store = FinancialStore::new();
        store.add_dataset(Pipeline::default().normalize_table(&table));
        store
    }

    fn midnight(year: i32, month: u32, day: u32) -> TypedValue {
        TypedValue::Timestamp(
            NaiveDate::from_ymd_opt(year, month, day)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
        )
    }

    #[test]
    fn range_query_is_inclusive_and_skips_failures() {
        let store = bank_store();
        let rows = store
            .query_range(
                "kh_bank",
                "ValueDate",
                midnight(2023, 1, 1),
                midnight(2023, 12, 31),
            )
            .unwrap();
        assert_eq!(rows, vec![1, 2]);

        let rows = store
            .query_range(
                "kh_bank",
                "Amount",
                TypedValue::Amount(-10.0),
                TypedValue::Amount(10.0),
            )
            .unwrap();
        assert_eq!(rows, vec![0, 1, 5]);
    }

    #[test]
    fn aggregate_groups_and_excludes_missing() {
        let store = bank_store();
        let sums = store.aggregate("kh_bank", "Currency", "Amount").unwrap();
        assert_eq!(
            sums,
            vec![
                GroupSum {
                    key: "EUR".to_string(),
                    total: 1010.0,
                    rows: 2,
                },
                GroupSum {
                    key: "USD".to_string(),
                    total: 14.5,
                    rows: 2,
                },
            ]
        );
    }

    #[test]
    fn errors_name_the_problem() {
        let store = bank_store();
        assert_eq!(
            store.aggregate("nope", "Currency", "Amount"),
            Err(StoreError::UnknownDataset("nope".to_string()))
        );
        assert!(matches!(
            store.aggregate("kh_bank", "Currency", "ValueDate"),
            Err(StoreError::WrongColumnType { .. })
        ));
        assert_eq!(
            store.query_range(
                "kh_bank",
                "ValueDate",
                TypedValue::Amount(0.0),
                TypedValue::Amount(1.0)
            ),
            Err(StoreError::MismatchedBounds {
                expected: TypeVerdict::Date
            })
        );
        assert!(matches!(
            store.query_range(
                "kh_bank",
                "Missing",
                TypedValue::Amount(0.0),
                TypedValue::Amount(1.0)
            ),
            Err(StoreError::UnknownColumn { .. })
        ));
    }
}
