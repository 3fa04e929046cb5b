//! In-memory fundamentals provider.
//!
//! Deterministic stand-in for Yahoo: responses come from maps filled by the
//! builder methods, and any call can be made to fail for a given ticker.

use super::provider::{FieldMap, FundamentalsProvider, ProviderError};
use crate::domain::{StatementKind, StatementRecord, StatementTable, Ticker};
use serde_json::Value;
use std::collections::BTreeMap;

/// Provider call, used to target injected failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Endpoint {
    SummaryDetail,
    FinancialData,
    Statement(StatementKind),
}

/// Provider serving canned responses.
#[derive(Debug, Clone, Default)]
pub struct StaticProvider {
    summary_detail: BTreeMap<Ticker, FieldMap>,
    financial_data: BTreeMap<Ticker, FieldMap>,
    statements: BTreeMap<(Ticker, StatementKind), Vec<StatementRecord>>,
    failures: BTreeMap<(Ticker, Endpoint), ProviderError>,
}

impl StaticProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Numeric summary-detail fields for a ticker.
    pub fn with_summary_detail<'a>(
        mut self,
        ticker: &Ticker,
        fields: impl IntoIterator<Item = (&'a str, f64)>,
    ) -> Self {
        self.summary_detail
            .insert(ticker.clone(), numeric_fields(fields));
        self
    }

    /// Numeric financial-data fields for a ticker.
    pub fn with_financial_data<'a>(
        mut self,
        ticker: &Ticker,
        fields: impl IntoIterator<Item = (&'a str, f64)>,
    ) -> Self {
        self.financial_data
            .insert(ticker.clone(), numeric_fields(fields));
        self
    }

    /// Raw JSON fields, for responses that are not plain numbers.
    pub fn with_raw_fields(mut self, ticker: &Ticker, endpoint: Endpoint, fields: FieldMap) -> Self {
        match endpoint {
            Endpoint::SummaryDetail => {
                self.summary_detail.insert(ticker.clone(), fields);
            }
            Endpoint::FinancialData => {
                self.financial_data.insert(ticker.clone(), fields);
            }
            Endpoint::Statement(_) => {}
        }
        self
    }

    pub fn with_statement(
        mut self,
        ticker: &Ticker,
        kind: StatementKind,
        rows: Vec<StatementRecord>,
    ) -> Self {
        self.statements.insert((ticker.clone(), kind), rows);
        self
    }

    /// Make one call fail for one ticker.
    pub fn failing(mut self, ticker: &Ticker, endpoint: Endpoint, error: ProviderError) -> Self {
        self.failures.insert((ticker.clone(), endpoint), error);
        self
    }

    fn check(&self, ticker: &Ticker, endpoint: Endpoint) -> Result<(), ProviderError> {
        match self.failures.get(&(ticker.clone(), endpoint)) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn module(
        &self,
        map: &BTreeMap<Ticker, FieldMap>,
        ticker: &Ticker,
        endpoint: Endpoint,
    ) -> Result<FieldMap, ProviderError> {
        self.check(ticker, endpoint)?;
        map.get(ticker)
            .cloned()
            .ok_or_else(|| ProviderError::SymbolNotFound {
                symbol: ticker.to_string(),
            })
    }

    fn statement(
        &self,
        ticker: &Ticker,
        kind: StatementKind,
        trailing: bool,
    ) -> Result<StatementTable, ProviderError> {
        self.check(ticker, Endpoint::Statement(kind))?;
        let rows = self
            .statements
            .get(&(ticker.clone(), kind))
            .map(|rows| {
                rows.iter()
                    .filter(|r| trailing || r.period_type != "TTM")
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(StatementTable::new(ticker.clone(), kind).with_rows(rows))
    }
}

fn numeric_fields<'a>(fields: impl IntoIterator<Item = (&'a str, f64)>) -> FieldMap {
    fields
        .into_iter()
        .map(|(k, v)| {
            let value = serde_json::Number::from_f64(v)
                .map(Value::Number)
                .unwrap_or(Value::Null);
            (k.to_string(), value)
        })
        .collect()
}

impl FundamentalsProvider for StaticProvider {
    fn name(&self) -> &str {
        "static"
    }

    fn summary_detail(&self, ticker: &Ticker) -> Result<FieldMap, ProviderError> {
        self.module(&self.summary_detail, ticker, Endpoint::SummaryDetail)
    }

    fn financial_data(&self, ticker: &Ticker) -> Result<FieldMap, ProviderError> {
        self.module(&self.financial_data, ticker, Endpoint::FinancialData)
    }

    fn income_statement(
        &self,
        ticker: &Ticker,
        trailing: bool,
    ) -> Result<StatementTable, ProviderError> {
        self.statement(ticker, StatementKind::IncomeStatement, trailing)
    }

    fn cash_flow(&self, ticker: &Ticker, trailing: bool) -> Result<StatementTable, ProviderError> {
        self.statement(ticker, StatementKind::CashFlow, trailing)
    }

    fn balance_sheet(&self, ticker: &Ticker) -> Result<StatementTable, ProviderError> {
        self.statement(ticker, StatementKind::BalanceSheet, false)
    }
}
