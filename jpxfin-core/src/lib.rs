//! jpxfin core: roster loading, fundamentals providers, metrics extraction and
//! statement reconciliation for JPX-listed equities.
//!
//! - Domain types (security codes, tickers, statements, report rows)
//! - Roster spreadsheet loading and category filtering
//! - `FundamentalsProvider` trait with Yahoo and in-memory implementations
//! - Metrics fetcher with per-field null fallback
//! - Statement schema normalization and date reconciliation
//! - Diagnostics for every non-fatal degradation

pub mod data;
pub mod diagnostics;
pub mod domain;
pub mod fundamentals;

pub use diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
