//! Financial-statement tables as returned by a provider.
//!
//! A `StatementTable` is row-oriented: one `StatementRecord` per reported
//! period, each carrying whatever line items the provider supplied. The fixed
//! set of line items the reports care about is declared by `StatementField`.

use super::ids::Ticker;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// The three statements reconciled per ticker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatementKind {
    IncomeStatement,
    CashFlow,
    BalanceSheet,
}

impl StatementKind {
    pub const ALL: [StatementKind; 3] = [
        StatementKind::IncomeStatement,
        StatementKind::CashFlow,
        StatementKind::BalanceSheet,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::IncomeStatement => "income_statement",
            Self::CashFlow => "cash_flow",
            Self::BalanceSheet => "balance_sheet",
        }
    }

    /// Line items extracted from this statement, in report column order.
    pub fn fields(self) -> &'static [StatementField] {
        match self {
            Self::IncomeStatement => &[
                StatementField::TotalRevenue,
                StatementField::GrossProfit,
                StatementField::OperatingExpense,
                StatementField::OperatingIncome,
            ],
            Self::CashFlow => &[
                StatementField::NetIncome,
                StatementField::OperatingCashFlow,
                StatementField::FreeCashFlow,
            ],
            Self::BalanceSheet => &[
                StatementField::StockholdersEquity,
                StatementField::TotalAssets,
                StatementField::TotalLiabilitiesNetMinorityInterest,
            ],
        }
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Statement line items carried into the statement report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StatementField {
    TotalRevenue,
    GrossProfit,
    OperatingExpense,
    OperatingIncome,
    NetIncome,
    OperatingCashFlow,
    FreeCashFlow,
    StockholdersEquity,
    TotalAssets,
    TotalLiabilitiesNetMinorityInterest,
}

impl StatementField {
    pub const ALL: [StatementField; 10] = [
        StatementField::TotalRevenue,
        StatementField::GrossProfit,
        StatementField::OperatingExpense,
        StatementField::OperatingIncome,
        StatementField::NetIncome,
        StatementField::OperatingCashFlow,
        StatementField::FreeCashFlow,
        StatementField::StockholdersEquity,
        StatementField::TotalAssets,
        StatementField::TotalLiabilitiesNetMinorityInterest,
    ];

    /// Provider line-item name, also used as the report column header.
    pub const fn name(self) -> &'static str {
        match self {
            Self::TotalRevenue => "TotalRevenue",
            Self::GrossProfit => "GrossProfit",
            Self::OperatingExpense => "OperatingExpense",
            Self::OperatingIncome => "OperatingIncome",
            Self::NetIncome => "NetIncome",
            Self::OperatingCashFlow => "OperatingCashFlow",
            Self::FreeCashFlow => "FreeCashFlow",
            Self::StockholdersEquity => "StockholdersEquity",
            Self::TotalAssets => "TotalAssets",
            Self::TotalLiabilitiesNetMinorityInterest => "TotalLiabilitiesNetMinorityInterest",
        }
    }

    /// Statement this line item is read from.
    pub const fn statement(self) -> StatementKind {
        match self {
            Self::TotalRevenue
            | Self::GrossProfit
            | Self::OperatingExpense
            | Self::OperatingIncome => StatementKind::IncomeStatement,
            Self::NetIncome | Self::OperatingCashFlow | Self::FreeCashFlow => {
                StatementKind::CashFlow
            }
            Self::StockholdersEquity
            | Self::TotalAssets
            | Self::TotalLiabilitiesNetMinorityInterest => StatementKind::BalanceSheet,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }
}

impl fmt::Display for StatementField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One reported period of a statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementRecord {
    pub as_of_date: NaiveDate,
    /// Provider period tag (`12M` for annual, `TTM` for trailing).
    pub period_type: String,
    /// Line-item values keyed by provider name.
    pub values: BTreeMap<String, f64>,
}

impl StatementRecord {
    pub fn new(as_of_date: NaiveDate, period_type: impl Into<String>) -> Self {
        Self {
            as_of_date,
            period_type: period_type.into(),
            values: BTreeMap::new(),
        }
    }

    pub fn with_value(mut self, name: impl Into<String>, value: f64) -> Self {
        self.values.insert(name.into(), value);
        self
    }

    pub fn value(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }
}

/// A statement table for one ticker, rows in provider order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementTable {
    pub ticker: Ticker,
    pub kind: StatementKind,
    pub rows: Vec<StatementRecord>,
}

impl StatementTable {
    pub fn new(ticker: Ticker, kind: StatementKind) -> Self {
        Self {
            ticker,
            kind,
            rows: Vec::new(),
        }
    }

    pub fn with_rows(mut self, rows: Vec<StatementRecord>) -> Self {
        self.rows = rows;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Distinct as-of-dates present in the table.
    pub fn as_of_dates(&self) -> BTreeSet<NaiveDate> {
        self.rows.iter().map(|r| r.as_of_date).collect()
    }

    /// True if any row carries a value for the named line item.
    pub fn has_field(&self, name: &str) -> bool {
        self.rows.iter().any(|r| r.values.contains_key(name))
    }
}
