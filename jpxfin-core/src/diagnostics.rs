//! Non-fatal degradations recorded during a run.
//!
//! Every degradation is logged through `tracing` when recorded and kept as a
//! value so callers can count and summarize them after the run.

use crate::domain::report::MetricField;
use crate::domain::{StatementField, StatementKind, Ticker};
use chrono::NaiveDate;
use std::fmt;

/// What degraded.
#[derive(Debug, Clone, PartialEq)]
pub enum DiagnosticKind {
    /// A metric was recorded as null.
    MetricUnavailable { field: MetricField, reason: String },
    /// A statement line item was absent and replaced by a zero column.
    StatementFieldZeroFilled {
        statement: StatementKind,
        field: StatementField,
    },
    /// Several rows shared an as-of-date; only the last one was kept.
    DuplicateDateCollapsed {
        statement: StatementKind,
        date: NaiveDate,
        rows: usize,
    },
    /// A statement fetch failed; the ticker contributes no statement rows.
    StatementFetchFailed {
        statement: StatementKind,
        reason: String,
    },
    /// Reconciliation refused the ticker's statements.
    StatementsRejected { reason: String },
}

/// A degradation attributed to one ticker.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub ticker: Ticker,
    pub kind: DiagnosticKind,
}

impl Diagnostic {
    pub fn new(ticker: Ticker, kind: DiagnosticKind) -> Self {
        Self { ticker, kind }
    }

    /// True if the ticker lost its whole statement contribution.
    pub fn drops_statements(&self) -> bool {
        matches!(
            self.kind,
            DiagnosticKind::StatementFetchFailed { .. } | DiagnosticKind::StatementsRejected { .. }
        )
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ticker = &self.ticker;
        match &self.kind {
            DiagnosticKind::MetricUnavailable { field, reason } => {
                write!(f, "ticker {ticker}: metric '{field}' unavailable ({reason})")
            }
            DiagnosticKind::StatementFieldZeroFilled { statement, field } => {
                write!(f, "ticker {ticker}: {statement} has no '{field}', zero-filled")
            }
            DiagnosticKind::DuplicateDateCollapsed {
                statement,
                date,
                rows,
            } => write!(
                f,
                "ticker {ticker}: {statement} has {rows} rows dated {date}, kept the last"
            ),
            DiagnosticKind::StatementFetchFailed { statement, reason } => {
                write!(f, "ticker {ticker}: {statement} fetch failed: {reason}")
            }
            DiagnosticKind::StatementsRejected { reason } => {
                write!(f, "ticker {ticker}: statements skipped: {reason}")
            }
        }
    }
}

/// Ordered collection of diagnostics for a run (or part of one).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Log and keep a diagnostic.
    pub fn record(&mut self, ticker: &Ticker, kind: DiagnosticKind) {
        let diagnostic = Diagnostic::new(ticker.clone(), kind);
        tracing::warn!(ticker = %ticker, "{diagnostic}");
        self.entries.push(diagnostic);
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.entries.extend(other.entries);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    pub fn for_ticker<'a>(&'a self, ticker: &'a Ticker) -> impl Iterator<Item = &'a Diagnostic> {
        self.entries.iter().filter(move |d| &d.ticker == ticker)
    }
}
