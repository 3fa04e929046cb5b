//! Integration tests for the full pipeline: roster file in, two reports out.
//!
//! The in-memory provider stands in for Yahoo, so these tests never touch
//! the network.

use chrono::NaiveDate;
use jpxfin_core::data::{Endpoint, ProviderError, StaticProvider};
use jpxfin_core::domain::{StatementKind, StatementRecord, Ticker};
use jpxfin_core::DiagnosticKind;
use jpxfin_runner::{execute, PipelineConfig, PipelineOptions};
use std::path::Path;

const ROSTER: &str = "\
日付,コード,銘柄名,市場・商品区分,33業種コード,33業種区分,17業種コード,17業種区分,規模コード,規模区分
20240329,1343,ＮＥＸＴ　ＦＵＮＤＳ　東証REIT指数連動型上場投信,ETF・ETN,-,-,-,-,-,-
20240329,2971,エスコンジャパンリート投資法人,REIT・ベンチャーファンド・カントリーファンド・インフラファンド,-,-,-,-,-,-
20240329,25935,伊藤園（優先株式）,プライム（内国株式）,3050,食料品,1,食品,-,-
20240329,6758,ソニーグループ,プライム（内国株式）,3650,電気機器,9,電機・精密,1,TOPIX Core30
20240329,7203,トヨタ自動車,プライム（内国株式）,3700,輸送用機器,6,自動車・輸送機,1,TOPIX Core30
";

fn date(year: i32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, 3, 31).unwrap()
}

fn income(year: i32) -> StatementRecord {
    StatementRecord::new(date(year), "12M")
        .with_value("TotalRevenue", 45_095_325_000_000.0)
        .with_value("GrossProfit", 9_000_000_000_000.0)
        .with_value("OperatingExpense", 4_300_000_000_000.0)
        .with_value("OperatingIncome", 5_352_934_000_000.0)
}

fn cash_flow(year: i32) -> StatementRecord {
    StatementRecord::new(date(year), "12M")
        .with_value("NetIncome", 4_944_933_000_000.0)
        .with_value("OperatingCashFlow", 4_206_373_000_000.0)
        .with_value("FreeCashFlow", -500_000_000_000.0)
}

fn balance(year: i32) -> StatementRecord {
    StatementRecord::new(date(year), "12M")
        .with_value("StockholdersEquity", 34_220_991_000_000.0)
        .with_value("TotalAssets", 90_114_296_000_000.0)
        .with_value("TotalLiabilitiesNetMinorityInterest", 54_000_000_000_000.0)
}

/// Complete responses for one ticker.
fn complete(provider: StaticProvider, ticker: &Ticker, years: &[i32]) -> StaticProvider {
    provider
        .with_summary_detail(
            ticker,
            [
                ("dividendRate", 75.0),
                ("dividendYield", 0.0214),
                ("fiveYearAvgDividendYield", 2.68),
                ("payoutRatio", 0.2457),
                ("marketCap", 56_765_000_000_000.0),
            ],
        )
        .with_financial_data(
            ticker,
            [("totalRevenue", 45_095_325_000_000.0), ("returnOnEquity", 0.1448)],
        )
        .with_statement(
            ticker,
            StatementKind::IncomeStatement,
            years.iter().map(|&y| income(y)).collect(),
        )
        .with_statement(
            ticker,
            StatementKind::CashFlow,
            years.iter().map(|&y| cash_flow(y)).collect(),
        )
        .with_statement(
            ticker,
            StatementKind::BalanceSheet,
            years.iter().map(|&y| balance(y)).collect(),
        )
}

fn provider() -> StaticProvider {
    let p = complete(StaticProvider::new(), &Ticker::new("7203.T"), &[2022, 2023]);
    complete(p, &Ticker::new("6758.T"), &[2021, 2022, 2023])
}

fn config_in(dir: &Path) -> PipelineConfig {
    let roster = dir.join("data_j.csv");
    std::fs::write(&roster, ROSTER).unwrap();

    let mut config = PipelineConfig::default();
    config.roster.path = roster;
    config.output.relocate(&dir.join("out"));
    config
}

fn decode(path: &Path) -> String {
    let bytes = std::fs::read(path).unwrap();
    let (text, _, had_errors) = encoding_rs::SHIFT_JIS.decode(&bytes);
    assert!(!had_errors);
    text.into_owned()
}

#[test]
fn reports_cover_only_admitted_issues() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());

    let report = execute(&config, &PipelineOptions::from(&config), &provider(), None).unwrap();

    assert_eq!(report.output.metrics.len(), 2);
    assert!(report.output.diagnostics.is_empty());

    let metrics = decode(&config.output.metrics_path);
    let lines: Vec<&str> = metrics.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[1].starts_with("6758.T,ソニーグループ,プライム（内国株式）,電気機器,電機・精密,75,"));
    assert!(lines[2].starts_with("7203.T,トヨタ自動車,"));
    assert!(!metrics.contains("ETF・ETN"));
    assert!(!metrics.contains("25935"));

    let statements = decode(&config.output.statements_path);
    let lines: Vec<&str> = statements.lines().collect();
    // header + 3 Sony periods + 2 Toyota periods
    assert_eq!(lines.len(), 6);
    assert!(lines[1].starts_with("6758.T,0,2021-03-31,"));
    assert!(lines[3].starts_with("6758.T,2,2023-03-31,"));
    assert!(lines[4].starts_with("7203.T,0,2022-03-31,"));
    assert!(lines[5].starts_with("7203.T,1,2023-03-31,"));

    assert_eq!(report.metrics_report.rows, 2);
    assert_eq!(report.statements_report.rows, 5);
}

#[test]
fn identical_inputs_give_identical_reports() {
    let first = tempfile::tempdir().unwrap();
    let second = tempfile::tempdir().unwrap();
    let a = config_in(first.path());
    let b = config_in(second.path());

    let ra = execute(&a, &PipelineOptions::from(&a), &provider(), None).unwrap();
    let rb = execute(&b, &PipelineOptions::from(&b), &provider(), None).unwrap();

    assert_eq!(ra.metrics_report.digest, rb.metrics_report.digest);
    assert_eq!(ra.statements_report.digest, rb.statements_report.digest);
    assert_eq!(
        std::fs::read(&a.output.statements_path).unwrap(),
        std::fs::read(&b.output.statements_path).unwrap()
    );
}

#[test]
fn balance_sheet_failure_keeps_metrics_row() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    let toyota = Ticker::new("7203.T");
    let provider = provider().failing(
        &toyota,
        Endpoint::Statement(StatementKind::BalanceSheet),
        ProviderError::NetworkUnreachable("connection reset by peer".into()),
    );

    let report = execute(&config, &PipelineOptions::from(&config), &provider, None).unwrap();
    let out = &report.output;

    assert!(out.statements.iter().all(|r| r.ticker != toyota));
    assert_eq!(out.diagnostics.len(), 1);
    assert_eq!(out.diagnostics.for_ticker(&toyota).count(), 1);

    let toyota_metrics = out
        .metrics
        .iter()
        .find(|m| m.metrics.ticker == toyota)
        .unwrap();
    assert_eq!(toyota_metrics.metrics.dividend_rate, Some(75.0));
    assert_eq!(out.summary.tickers_without_statements, 1);
}

#[test]
fn cash_flow_dates_narrow_the_join() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    let toyota = Ticker::new("7203.T");
    let provider = provider().with_statement(&toyota, StatementKind::CashFlow, vec![cash_flow(2023)]);

    let report = execute(&config, &PipelineOptions::from(&config), &provider, None).unwrap();

    let rows: Vec<_> = report
        .output
        .statements
        .iter()
        .filter(|r| r.ticker == toyota)
        .collect();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].as_of_date, date(2023));
    assert_eq!(rows[0].period_index, 0);
}

#[test]
fn metric_gaps_are_empty_cells() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    let toyota = Ticker::new("7203.T");
    let provider = provider().failing(
        &toyota,
        Endpoint::FinancialData,
        ProviderError::RateLimited {
            retry_after_secs: 60,
        },
    );

    let report = execute(&config, &PipelineOptions::from(&config), &provider, None).unwrap();

    let unavailable = report
        .output
        .diagnostics
        .iter()
        .filter(|d| matches!(d.kind, DiagnosticKind::MetricUnavailable { .. }))
        .count();
    assert_eq!(unavailable, 2);

    let metrics = decode(&config.output.metrics_path);
    let toyota_line = metrics.lines().find(|l| l.starts_with("7203.T,")).unwrap();
    assert!(toyota_line.ends_with(",,"));
}

#[test]
fn limit_applies_after_filtering() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    let options = PipelineOptions {
        limit: Some(1),
        ..PipelineOptions::from(&config)
    };

    let report = execute(&config, &options, &provider(), None).unwrap();
    assert_eq!(report.output.metrics.len(), 1);
    assert_eq!(report.output.metrics[0].entry.code.as_str(), "6758");
}

#[test]
fn both_reports_key_rows_by_provider_ticker() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());

    execute(&config, &PipelineOptions::from(&config), &provider(), None).unwrap();

    let key = |line: &str| line.split(',').next().unwrap_or_default().to_string();
    let metrics = decode(&config.output.metrics_path);
    let statements = decode(&config.output.statements_path);
    let metric_keys: Vec<String> = metrics.lines().skip(1).map(key).collect();
    assert_eq!(metric_keys, ["6758.T", "7203.T"]);
    for line in statements.lines().skip(1) {
        assert!(metric_keys.contains(&key(line)), "unmatched statement row: {line}");
    }
}
