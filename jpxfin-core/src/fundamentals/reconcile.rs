//! Statement reconciliation.
//!
//! Joins the income statement, cash flow and balance sheet of one ticker on
//! the as-of-dates all three report, and derives the two balance ratios.

use super::schema::{DuplicateDatePolicy, NormalizedStatement, ReconcileError};
use crate::data::provider::{FundamentalsProvider, ProviderError};
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::domain::{StatementKind, StatementRow, StatementTable, Ticker};
use chrono::NaiveDate;
use std::collections::BTreeSet;

/// Fetch and reconcile one ticker's statements.
///
/// Any failed fetch, or a rejected duplicate date, records one diagnostic
/// and yields no rows. Never fails the run.
pub fn reconcile_statements(
    provider: &dyn FundamentalsProvider,
    ticker: &Ticker,
    policy: DuplicateDatePolicy,
    diagnostics: &mut Diagnostics,
) -> Vec<StatementRow> {
    let tables = match fetch_tables(provider, ticker) {
        Ok(tables) => tables,
        Err((statement, err)) => {
            diagnostics.record(
                ticker,
                DiagnosticKind::StatementFetchFailed {
                    statement,
                    reason: err.to_string(),
                },
            );
            return Vec::new();
        }
    };

    match reconcile_tables(ticker, &tables, policy, diagnostics) {
        Ok(rows) => rows,
        Err(err) => {
            diagnostics.record(
                ticker,
                DiagnosticKind::StatementsRejected {
                    reason: err.to_string(),
                },
            );
            Vec::new()
        }
    }
}

/// Income (non-trailing), cash flow (non-trailing), balance sheet; stops at
/// the first failure.
fn fetch_tables(
    provider: &dyn FundamentalsProvider,
    ticker: &Ticker,
) -> Result<[StatementTable; 3], (StatementKind, ProviderError)> {
    let income = provider
        .income_statement(ticker, false)
        .map_err(|e| (StatementKind::IncomeStatement, e))?;
    let cash_flow = provider
        .cash_flow(ticker, false)
        .map_err(|e| (StatementKind::CashFlow, e))?;
    let balance = provider
        .balance_sheet(ticker)
        .map_err(|e| (StatementKind::BalanceSheet, e))?;
    Ok([income, cash_flow, balance])
}

/// Reconcile already-fetched tables into rows sorted by as-of-date.
pub fn reconcile_tables(
    ticker: &Ticker,
    tables: &[StatementTable],
    policy: DuplicateDatePolicy,
    diagnostics: &mut Diagnostics,
) -> Result<Vec<StatementRow>, ReconcileError> {
    let normalized = tables
        .iter()
        .map(|t| NormalizedStatement::from_table(t, policy, diagnostics))
        .collect::<Result<Vec<_>, _>>()?;

    let dates = common_dates(&normalized);
    tracing::debug!(ticker = %ticker, common_dates = dates.len(), "reconciled statement dates");

    let rows = dates
        .into_iter()
        .enumerate()
        .map(|(index, date)| {
            let mut row = StatementRow::new(ticker.clone(), index, date);
            for statement in &normalized {
                for &field in statement.kind.fields() {
                    row.set(field, statement.value(date, field));
                }
            }
            row.derive_ratios();
            row
        })
        .collect();

    Ok(rows)
}

/// As-of-dates present in every statement, ascending.
pub fn common_dates(statements: &[NormalizedStatement]) -> BTreeSet<NaiveDate> {
    let mut iter = statements.iter();
    let Some(first) = iter.next() else {
        return BTreeSet::new();
    };
    iter.fold(first.dates(), |acc, s| {
        let dates = s.dates();
        acc.intersection(&dates).copied().collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::memory::{Endpoint, StaticProvider};
    use crate::domain::{StatementField, StatementRecord};

    fn date(year: i32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, 3, 31).unwrap()
    }

    fn ticker() -> Ticker {
        Ticker::new("7203.T")
    }

    fn income(year: i32) -> StatementRecord {
        StatementRecord::new(date(year), "12M")
            .with_value("TotalRevenue", 1000.0)
            .with_value("GrossProfit", 300.0)
            .with_value("OperatingExpense", 100.0)
            .with_value("OperatingIncome", 200.0)
    }

    fn cash_flow(year: i32) -> StatementRecord {
        StatementRecord::new(date(year), "12M")
            .with_value("NetIncome", 150.0)
            .with_value("OperatingCashFlow", 250.0)
            .with_value("FreeCashFlow", 120.0)
    }

    fn balance(year: i32, equity: f64, assets: f64) -> StatementRecord {
        StatementRecord::new(date(year), "12M")
            .with_value("StockholdersEquity", equity)
            .with_value("TotalAssets", assets)
            .with_value("TotalLiabilitiesNetMinorityInterest", assets - equity)
    }

    fn provider() -> StaticProvider {
        let t = ticker();
        StaticProvider::new()
            .with_statement(&t, StatementKind::IncomeStatement, vec![income(2022), income(2023)])
            .with_statement(
                &t,
                StatementKind::CashFlow,
                vec![cash_flow(2021), cash_flow(2022), cash_flow(2023)],
            )
            .with_statement(
                &t,
                StatementKind::BalanceSheet,
                vec![
                    balance(2022, 400.0, 1000.0),
                    balance(2023, 500.0, 1250.0),
                    balance(2024, 600.0, 1500.0),
                ],
            )
    }

    #[test]
    fn joins_on_common_dates_only() {
        let mut diags = Diagnostics::new();
        let rows = reconcile_statements(&provider(), &ticker(), DuplicateDatePolicy::KeepLast, &mut diags);

        assert!(diags.is_empty());
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].as_of_date, date(2022));
        assert_eq!(rows[1].as_of_date, date(2023));
        assert_eq!(rows[0].period_index, 0);
        assert_eq!(rows[1].period_index, 1);
    }

    #[test]
    fn rows_carry_every_statement_and_ratios() {
        let mut diags = Diagnostics::new();
        let rows = reconcile_statements(&provider(), &ticker(), DuplicateDatePolicy::KeepLast, &mut diags);
        let r = &rows[1];

        assert_eq!(r.ticker, ticker());
        assert_eq!(r.total_revenue, Some(1000.0));
        assert_eq!(r.free_cash_flow, Some(120.0));
        assert_eq!(r.total_liabilities, Some(750.0));
        assert!((r.capital_adequacy_ratio.unwrap() - 0.4).abs() < 1e-12);
        assert!((r.roe.unwrap() - 0.3).abs() < 1e-12);
    }

    #[test]
    fn balance_sheet_failure_drops_ticker_with_one_diagnostic() {
        let t = ticker();
        let provider = provider().failing(
            &t,
            Endpoint::Statement(StatementKind::BalanceSheet),
            ProviderError::NetworkUnreachable("connection reset".into()),
        );
        let mut diags = Diagnostics::new();
        let rows = reconcile_statements(&provider, &t, DuplicateDatePolicy::KeepLast, &mut diags);

        assert!(rows.is_empty());
        assert_eq!(diags.len(), 1);
        assert!(matches!(
            diags.iter().next().unwrap().kind,
            DiagnosticKind::StatementFetchFailed {
                statement: StatementKind::BalanceSheet,
                ..
            }
        ));
    }

    #[test]
    fn first_failure_short_circuits() {
        let t = ticker();
        let provider = provider()
            .failing(
                &t,
                Endpoint::Statement(StatementKind::IncomeStatement),
                ProviderError::Other("boom".into()),
            )
            .failing(
                &t,
                Endpoint::Statement(StatementKind::CashFlow),
                ProviderError::Other("boom".into()),
            );
        let mut diags = Diagnostics::new();
        let rows = reconcile_statements(&provider, &t, DuplicateDatePolicy::KeepLast, &mut diags);
        assert!(rows.is_empty());
        assert_eq!(diags.len(), 1);
    }

    #[test]
    fn missing_field_zero_fills_and_keeps_rows() {
        let t = ticker();
        let provider = provider().with_statement(
            &t,
            StatementKind::CashFlow,
            vec![
                StatementRecord::new(date(2022), "12M").with_value("OperatingCashFlow", 1.0),
                StatementRecord::new(date(2023), "12M").with_value("OperatingCashFlow", 2.0),
            ],
        );
        let mut diags = Diagnostics::new();
        let rows = reconcile_statements(&provider, &t, DuplicateDatePolicy::KeepLast, &mut diags);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].net_income, Some(0.0));
        assert_eq!(rows[0].roe, Some(0.0));
        assert_eq!(diags.len(), 2);
    }

    #[test]
    fn zero_equity_leaves_ratios_empty() {
        let t = ticker();
        let provider = provider().with_statement(
            &t,
            StatementKind::BalanceSheet,
            vec![balance(2022, 0.0, 0.0), balance(2023, 0.0, 1000.0)],
        );
        let mut diags = Diagnostics::new();
        let rows = reconcile_statements(&provider, &t, DuplicateDatePolicy::KeepLast, &mut diags);

        assert_eq!(rows[0].capital_adequacy_ratio, None);
        assert_eq!(rows[0].roe, None);
        assert_eq!(rows[1].capital_adequacy_ratio, Some(0.0));
        assert_eq!(rows[1].roe, None);
    }

    #[test]
    fn empty_intersection_yields_no_rows() {
        let t = ticker();
        let provider = provider().with_statement(
            &t,
            StatementKind::BalanceSheet,
            vec![balance(2019, 1.0, 2.0)],
        );
        let mut diags = Diagnostics::new();
        let rows = reconcile_statements(&provider, &t, DuplicateDatePolicy::KeepLast, &mut diags);
        assert!(rows.is_empty());
        assert!(diags.is_empty());
    }

    #[test]
    fn rejected_duplicates_drop_statements() {
        let t = ticker();
        let provider = provider().with_statement(
            &t,
            StatementKind::IncomeStatement,
            vec![income(2022), income(2022), income(2023)],
        );

        let mut diags = Diagnostics::new();
        let rows = reconcile_statements(&provider, &t, DuplicateDatePolicy::Reject, &mut diags);
        assert!(rows.is_empty());
        assert!(diags.iter().any(|d| d.drops_statements()));

        let mut diags = Diagnostics::new();
        let rows = reconcile_statements(&provider, &t, DuplicateDatePolicy::KeepLast, &mut diags);
        assert_eq!(rows.len(), 2);
        assert_eq!(diags.len(), 1);
    }

    #[test]
    fn reconcile_tables_sets_fields_from_owning_statement() {
        let t = ticker();
        let tables = [
            StatementTable::new(t.clone(), StatementKind::IncomeStatement)
                .with_rows(vec![income(2023)]),
            StatementTable::new(t.clone(), StatementKind::CashFlow).with_rows(vec![cash_flow(2023)]),
            StatementTable::new(t.clone(), StatementKind::BalanceSheet)
                .with_rows(vec![balance(2023, 10.0, 20.0)]),
        ];
        let mut diags = Diagnostics::new();
        let rows = reconcile_tables(&t, &tables, DuplicateDatePolicy::KeepLast, &mut diags).unwrap();
        assert_eq!(rows.len(), 1);
        for field in StatementField::ALL {
            assert!(rows[0].get(field).is_some(), "{field} empty");
        }
    }
}
