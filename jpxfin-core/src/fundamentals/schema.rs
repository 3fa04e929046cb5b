//! Statement schema normalization.
//!
//! Turns a provider table into exactly the declared line items of its
//! statement, indexed by as-of-date, before any reconciliation happens.

use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::domain::{StatementField, StatementKind, StatementTable, Ticker};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// What to do when a statement reports the same as-of-date more than once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateDatePolicy {
    /// Keep the row that appears last in provider order.
    #[default]
    KeepLast,
    /// Refuse the ticker's statements.
    Reject,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ReconcileError {
    #[error("{statement} reports as-of-date {date} more than once")]
    DuplicateAsOfDate {
        statement: StatementKind,
        date: NaiveDate,
    },
}

/// Declared line items of one statement, one entry per as-of-date.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedStatement {
    pub kind: StatementKind,
    rows: BTreeMap<NaiveDate, BTreeMap<StatementField, f64>>,
}

impl NormalizedStatement {
    /// Normalize `table` to the fields its kind declares.
    ///
    /// A declared field no row carries is zero-filled on every date. Cells
    /// missing on some dates only are left empty.
    pub fn from_table(
        table: &StatementTable,
        policy: DuplicateDatePolicy,
        diagnostics: &mut Diagnostics,
    ) -> Result<Self, ReconcileError> {
        let kind = table.kind;
        let ticker = &table.ticker;
        let fields = kind.fields();

        let zero_filled: Vec<StatementField> = fields
            .iter()
            .copied()
            .filter(|f| !table.has_field(f.name()))
            .collect();
        for field in &zero_filled {
            diagnostics.record(
                ticker,
                DiagnosticKind::StatementFieldZeroFilled {
                    statement: kind,
                    field: *field,
                },
            );
        }

        let mut seen: BTreeMap<NaiveDate, usize> = BTreeMap::new();
        let mut rows = BTreeMap::new();
        for record in &table.rows {
            let count = seen.entry(record.as_of_date).or_insert(0);
            *count += 1;
            if *count > 1 && policy == DuplicateDatePolicy::Reject {
                return Err(ReconcileError::DuplicateAsOfDate {
                    statement: kind,
                    date: record.as_of_date,
                });
            }

            let values: BTreeMap<StatementField, f64> = fields
                .iter()
                .filter_map(|field| {
                    if zero_filled.contains(field) {
                        Some((*field, 0.0))
                    } else {
                        record.value(field.name()).map(|v| (*field, v))
                    }
                })
                .collect();
            // Later rows overwrite earlier ones for the same date.
            rows.insert(record.as_of_date, values);
        }

        for (date, count) in seen.into_iter().filter(|(_, n)| *n > 1) {
            collapsed(ticker, kind, date, count, diagnostics);
        }

        Ok(Self { kind, rows })
    }

    pub fn dates(&self) -> BTreeSet<NaiveDate> {
        self.rows.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Value of `field` on `date`; `None` for an unknown date or empty cell.
    pub fn value(&self, date: NaiveDate, field: StatementField) -> Option<f64> {
        self.rows.get(&date)?.get(&field).copied()
    }
}

fn collapsed(
    ticker: &Ticker,
    statement: StatementKind,
    date: NaiveDate,
    rows: usize,
    diagnostics: &mut Diagnostics,
) {
    diagnostics.record(
        ticker,
        DiagnosticKind::DuplicateDateCollapsed {
            statement,
            date,
            rows,
        },
    );
}
