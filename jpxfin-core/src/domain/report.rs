//! Report rows: per-ticker metrics and reconciled statement periods.

use super::ids::Ticker;
use super::statement::StatementField;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Provider module a metric is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricSource {
    SummaryDetail,
    FinancialData,
}

impl MetricSource {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SummaryDetail => "summaryDetail",
            Self::FinancialData => "financialData",
        }
    }
}

impl fmt::Display for MetricSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The seven metrics collected per ticker, in report column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetricField {
    DividendRate,
    DividendYield,
    FiveYearAvgDividendYield,
    PayoutRatio,
    MarketCap,
    TotalRevenue,
    ReturnOnEquity,
}

impl MetricField {
    pub const ALL: [MetricField; 7] = [
        MetricField::DividendRate,
        MetricField::DividendYield,
        MetricField::FiveYearAvgDividendYield,
        MetricField::PayoutRatio,
        MetricField::MarketCap,
        MetricField::TotalRevenue,
        MetricField::ReturnOnEquity,
    ];

    /// Key in the provider response.
    pub const fn key(self) -> &'static str {
        match self {
            Self::DividendRate => "dividendRate",
            Self::DividendYield => "dividendYield",
            Self::FiveYearAvgDividendYield => "fiveYearAvgDividendYield",
            Self::PayoutRatio => "payoutRatio",
            Self::MarketCap => "marketCap",
            Self::TotalRevenue => "totalRevenue",
            Self::ReturnOnEquity => "returnOnEquity",
        }
    }

    /// Column header in the metrics report.
    pub const fn column(self) -> &'static str {
        match self {
            Self::MarketCap => "MarketCap",
            Self::ReturnOnEquity => "ROE",
            other => other.key(),
        }
    }

    pub const fn source(self) -> MetricSource {
        match self {
            Self::TotalRevenue | Self::ReturnOnEquity => MetricSource::FinancialData,
            _ => MetricSource::SummaryDetail,
        }
    }

    /// Fields read from one provider module, in column order.
    pub fn from_source(source: MetricSource) -> impl Iterator<Item = MetricField> {
        Self::ALL.into_iter().filter(move |f| f.source() == source)
    }
}

impl fmt::Display for MetricField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// One metrics row. Every value is either finite or `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickerMetrics {
    pub ticker: Ticker,
    pub dividend_rate: Option<f64>,
    pub dividend_yield: Option<f64>,
    pub five_year_avg_dividend_yield: Option<f64>,
    pub payout_ratio: Option<f64>,
    pub market_cap: Option<f64>,
    pub total_revenue: Option<f64>,
    pub return_on_equity: Option<f64>,
}

impl TickerMetrics {
    pub fn empty(ticker: Ticker) -> Self {
        Self {
            ticker,
            dividend_rate: None,
            dividend_yield: None,
            five_year_avg_dividend_yield: None,
            payout_ratio: None,
            market_cap: None,
            total_revenue: None,
            return_on_equity: None,
        }
    }

    pub fn get(&self, field: MetricField) -> Option<f64> {
        match field {
            MetricField::DividendRate => self.dividend_rate,
            MetricField::DividendYield => self.dividend_yield,
            MetricField::FiveYearAvgDividendYield => self.five_year_avg_dividend_yield,
            MetricField::PayoutRatio => self.payout_ratio,
            MetricField::MarketCap => self.market_cap,
            MetricField::TotalRevenue => self.total_revenue,
            MetricField::ReturnOnEquity => self.return_on_equity,
        }
    }

    pub fn set(&mut self, field: MetricField, value: Option<f64>) {
        let slot = match field {
            MetricField::DividendRate => &mut self.dividend_rate,
            MetricField::DividendYield => &mut self.dividend_yield,
            MetricField::FiveYearAvgDividendYield => &mut self.five_year_avg_dividend_yield,
            MetricField::PayoutRatio => &mut self.payout_ratio,
            MetricField::MarketCap => &mut self.market_cap,
            MetricField::TotalRevenue => &mut self.total_revenue,
            MetricField::ReturnOnEquity => &mut self.return_on_equity,
        };
        *slot = value;
    }

    /// Values in column order.
    pub fn values(&self) -> [Option<f64>; 7] {
        MetricField::ALL.map(|f| self.get(f))
    }
}

/// One reconciled reporting period for a ticker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementRow {
    pub ticker: Ticker,
    /// 0-based position within this ticker's rows.
    pub period_index: usize,
    pub as_of_date: NaiveDate,
    pub total_revenue: Option<f64>,
    pub gross_profit: Option<f64>,
    pub operating_expense: Option<f64>,
    pub operating_income: Option<f64>,
    pub net_income: Option<f64>,
    pub operating_cash_flow: Option<f64>,
    pub free_cash_flow: Option<f64>,
    pub stockholders_equity: Option<f64>,
    pub total_assets: Option<f64>,
    pub total_liabilities: Option<f64>,
    /// StockholdersEquity / TotalAssets.
    pub capital_adequacy_ratio: Option<f64>,
    /// NetIncome / StockholdersEquity.
    pub roe: Option<f64>,
}

impl StatementRow {
    pub fn new(ticker: Ticker, period_index: usize, as_of_date: NaiveDate) -> Self {
        Self {
            ticker,
            period_index,
            as_of_date,
            total_revenue: None,
            gross_profit: None,
            operating_expense: None,
            operating_income: None,
            net_income: None,
            operating_cash_flow: None,
            free_cash_flow: None,
            stockholders_equity: None,
            total_assets: None,
            total_liabilities: None,
            capital_adequacy_ratio: None,
            roe: None,
        }
    }

    pub fn get(&self, field: StatementField) -> Option<f64> {
        match field {
            StatementField::TotalRevenue => self.total_revenue,
            StatementField::GrossProfit => self.gross_profit,
            StatementField::OperatingExpense => self.operating_expense,
            StatementField::OperatingIncome => self.operating_income,
            StatementField::NetIncome => self.net_income,
            StatementField::OperatingCashFlow => self.operating_cash_flow,
            StatementField::FreeCashFlow => self.free_cash_flow,
            StatementField::StockholdersEquity => self.stockholders_equity,
            StatementField::TotalAssets => self.total_assets,
            StatementField::TotalLiabilitiesNetMinorityInterest => self.total_liabilities,
        }
    }

    pub fn set(&mut self, field: StatementField, value: Option<f64>) {
        let slot = match field {
            StatementField::TotalRevenue => &mut self.total_revenue,
            StatementField::GrossProfit => &mut self.gross_profit,
            StatementField::OperatingExpense => &mut self.operating_expense,
            StatementField::OperatingIncome => &mut self.operating_income,
            StatementField::NetIncome => &mut self.net_income,
            StatementField::OperatingCashFlow => &mut self.operating_cash_flow,
            StatementField::FreeCashFlow => &mut self.free_cash_flow,
            StatementField::StockholdersEquity => &mut self.stockholders_equity,
            StatementField::TotalAssets => &mut self.total_assets,
            StatementField::TotalLiabilitiesNetMinorityInterest => &mut self.total_liabilities,
        };
        *slot = value;
    }

    /// Recompute the derived ratio columns from the line items.
    pub fn derive_ratios(&mut self) {
        self.capital_adequacy_ratio = ratio(self.stockholders_equity, self.total_assets);
        self.roe = ratio(self.net_income, self.stockholders_equity);
    }
}

/// `numerator / denominator`, or `None` when either side is missing, the
/// denominator is zero, or the quotient is not finite.
pub fn ratio(numerator: Option<f64>, denominator: Option<f64>) -> Option<f64> {
    let (n, d) = (numerator?, denominator?);
    if d == 0.0 {
        return None;
    }
    let q = n / d;
    q.is_finite().then_some(q)
}
