//! Fundamentals provider trait and structured error types.
//!
//! The FundamentalsProvider trait abstracts over data sources (Yahoo Finance,
//! the in-memory provider) so the pipeline can run against a live API or a
//! deterministic stub.

use crate::domain::{StatementTable, Ticker};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

/// Flat field → value mapping for one provider module of one ticker.
pub type FieldMap = BTreeMap<String, Value>;

/// Structured error types for provider calls.
///
/// These are designed to be displayable in log lines and the run summary.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ProviderError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("authentication required: {0}")]
    AuthenticationRequired(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("provider error: {0}")]
    Other(String),
}

/// Trait for fundamentals providers.
///
/// Every call may fail independently; callers decide the blast radius of a
/// failure (one field, one statement, one ticker).
pub trait FundamentalsProvider {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Summary/valuation fields (dividends, market cap, ...).
    fn summary_detail(&self, ticker: &Ticker) -> Result<FieldMap, ProviderError>;

    /// Financial-ratio fields (revenue, return on equity, ...).
    fn financial_data(&self, ticker: &Ticker) -> Result<FieldMap, ProviderError>;

    /// Annual income statement; `trailing` adds the trailing-twelve-month row.
    fn income_statement(&self, ticker: &Ticker, trailing: bool)
        -> Result<StatementTable, ProviderError>;

    /// Annual cash-flow statement; `trailing` adds the trailing-twelve-month row.
    fn cash_flow(&self, ticker: &Ticker, trailing: bool) -> Result<StatementTable, ProviderError>;

    /// Annual balance sheet.
    fn balance_sheet(&self, ticker: &Ticker) -> Result<StatementTable, ProviderError>;
}

impl<P: FundamentalsProvider + ?Sized> FundamentalsProvider for &P {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn summary_detail(&self, ticker: &Ticker) -> Result<FieldMap, ProviderError> {
        (**self).summary_detail(ticker)
    }

    fn financial_data(&self, ticker: &Ticker) -> Result<FieldMap, ProviderError> {
        (**self).financial_data(ticker)
    }

    fn income_statement(
        &self,
        ticker: &Ticker,
        trailing: bool,
    ) -> Result<StatementTable, ProviderError> {
        (**self).income_statement(ticker, trailing)
    }

    fn cash_flow(&self, ticker: &Ticker, trailing: bool) -> Result<StatementTable, ProviderError> {
        (**self).cash_flow(ticker, trailing)
    }

    fn balance_sheet(&self, ticker: &Ticker) -> Result<StatementTable, ProviderError> {
        (**self).balance_sheet(ticker)
    }
}
