//! Yahoo Finance fundamentals provider.
//!
//! Summary and financial-data fields come from the v10 `quoteSummary` API,
//! which needs a session cookie and a crumb token. Statements come from the
//! `fundamentals-timeseries` API, one `annual<LineItem>` series per field,
//! merged by as-of-date into a row table.
//!
//! Yahoo Finance has no official API and is subject to unannounced format
//! changes. Calls are never retried: a failure is reported to the caller,
//! which decides whether it costs a field, a statement, or a ticker.

use super::provider::{FieldMap, FundamentalsProvider, ProviderError};
use crate::domain::{StatementKind, StatementRecord, StatementTable, Ticker};
use chrono::NaiveDate;
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::Duration;

const COOKIE_URL: &str = "https://fc.yahoo.com";
const CRUMB_URL: &str = "https://query1.finance.yahoo.com/v1/test/getcrumb";
const REFERER: &str = "https://finance.yahoo.com/";

/// Earliest period requested from the timeseries API (1985-08-23).
const TIMESERIES_PERIOD_START: i64 = 493_590_046;

/// Connection settings for [`YahooProvider`].
#[derive(Debug, Clone)]
pub struct YahooConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for YahooConfig {
    fn default() -> Self {
        Self {
            base_url: "https://query2.finance.yahoo.com".into(),
            timeout: Duration::from_secs(30),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".into(),
        }
    }
}

/// quoteSummary API response.
#[derive(Debug, Deserialize)]
struct QuoteSummaryResponse {
    #[serde(rename = "quoteSummary")]
    quote_summary: QuoteSummaryBody,
}

#[derive(Debug, Deserialize)]
struct QuoteSummaryBody {
    result: Option<Vec<BTreeMap<String, Value>>>,
    error: Option<YahooApiError>,
}

#[derive(Debug, Deserialize)]
struct YahooApiError {
    code: String,
    description: String,
}

/// fundamentals-timeseries API response.
#[derive(Debug, Deserialize)]
struct TimeseriesResponse {
    timeseries: TimeseriesBody,
}

#[derive(Debug, Deserialize)]
struct TimeseriesBody {
    result: Option<Vec<Value>>,
    error: Option<YahooApiError>,
}

#[derive(Debug, Deserialize)]
struct TimeseriesMeta {
    #[serde(rename = "type", default)]
    series_type: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct TimeseriesPoint {
    #[serde(rename = "asOfDate")]
    as_of_date: String,
    #[serde(rename = "periodType", default)]
    period_type: String,
    #[serde(rename = "reportedValue")]
    reported_value: Option<ReportedValue>,
}

#[derive(Debug, Deserialize)]
struct ReportedValue {
    raw: Option<f64>,
}

/// Yahoo Finance fundamentals provider.
pub struct YahooProvider {
    client: Client,
    base_url: String,
    crumb: Mutex<Option<String>>,
}

impl YahooProvider {
    pub fn new(config: YahooConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent)
            .cookie_store(true)
            .build()
            .map_err(|e| ProviderError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            crumb: Mutex::new(None),
        })
    }

    fn quote_summary_url(&self, ticker: &Ticker) -> String {
        format!("{}/v10/finance/quoteSummary/{ticker}", self.base_url)
    }

    fn timeseries_url(&self, ticker: &Ticker) -> String {
        format!(
            "{}/ws/fundamentals-timeseries/v1/finance/timeseries/{ticker}",
            self.base_url
        )
    }

    /// Series names requested for a statement: `annualTotalRevenue`, ...
    fn series_types(kind: StatementKind, trailing: bool) -> Vec<String> {
        let mut types: Vec<String> = kind
            .fields()
            .iter()
            .map(|f| format!("annual{}", f.name()))
            .collect();
        if trailing {
            types.extend(kind.fields().iter().map(|f| format!("trailing{}", f.name())));
        }
        types
    }

    /// Cached crumb, fetched on first use after the cookie handshake.
    fn crumb(&self) -> Result<String, ProviderError> {
        if let Some(crumb) = self.cached_crumb()? {
            return Ok(crumb);
        }

        // The cookie endpoint answers 404 but sets the session cookie in the jar.
        self.client
            .get(COOKIE_URL)
            .header("referer", REFERER)
            .send()
            .map_err(|e| ProviderError::NetworkUnreachable(format!("yahoo cookie: {e}")))?;

        let crumb = self
            .send(self.client.get(CRUMB_URL).header("referer", REFERER), "crumb")
            .map_err(crumb_error)
            .and_then(|body| validate_crumb(&body))?;

        tracing::debug!("obtained yahoo crumb");
        *self.lock_crumb()? = Some(crumb.clone());
        Ok(crumb)
    }

    fn cached_crumb(&self) -> Result<Option<String>, ProviderError> {
        Ok(self.lock_crumb()?.clone())
    }

    fn lock_crumb(&self) -> Result<std::sync::MutexGuard<'_, Option<String>>, ProviderError> {
        self.crumb
            .lock()
            .map_err(|_| ProviderError::Other("crumb lock poisoned".into()))
    }

    fn invalidate_crumb(&self) {
        if let Ok(mut crumb) = self.crumb.lock() {
            *crumb = None;
        }
    }

    /// Execute one request and map HTTP failures onto `ProviderError`.
    fn send(&self, request: RequestBuilder, symbol: &str) -> Result<String, ProviderError> {
        let resp = request.send().map_err(|e| {
            if e.is_connect() || e.is_timeout() {
                ProviderError::NetworkUnreachable(e.to_string())
            } else {
                ProviderError::Other(e.to_string())
            }
        })?;

        let status = resp.status();
        tracing::debug!(symbol, %status, url = %resp.url(), "yahoo response");

        if status == StatusCode::NOT_FOUND {
            return Err(ProviderError::SymbolNotFound {
                symbol: symbol.to_string(),
            });
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = resp
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(60);
            return Err(ProviderError::RateLimited {
                retry_after_secs: retry_after,
            });
        }

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            self.invalidate_crumb();
            return Err(ProviderError::AuthenticationRequired(format!(
                "HTTP {status} for {symbol}"
            )));
        }

        if !status.is_success() {
            return Err(ProviderError::Other(format!("HTTP {status} for {symbol}")));
        }

        resp.text()
            .map_err(|e| ProviderError::ResponseFormatChanged(format!("unreadable body: {e}")))
    }

    fn quote_summary_module(&self, ticker: &Ticker, module: &str) -> Result<FieldMap, ProviderError> {
        let crumb = self.crumb()?;
        let request = self.client.get(self.quote_summary_url(ticker)).query(&[
            ("modules", module),
            ("formatted", "false"),
            ("crumb", crumb.as_str()),
        ]);
        let body = self.send(request, ticker.as_str())?;
        parse_quote_summary(ticker, module, &body)
    }

    fn statement(
        &self,
        ticker: &Ticker,
        kind: StatementKind,
        trailing: bool,
    ) -> Result<StatementTable, ProviderError> {
        let types = Self::series_types(kind, trailing).join(",");
        let period2 = chrono::Utc::now().timestamp().to_string();
        let period1 = TIMESERIES_PERIOD_START.to_string();
        let request = self.client.get(self.timeseries_url(ticker)).query(&[
            ("symbol", ticker.as_str()),
            ("type", types.as_str()),
            ("period1", period1.as_str()),
            ("period2", period2.as_str()),
            ("merge", "false"),
            ("padTimeSeries", "false"),
        ]);
        let body = self.send(request, ticker.as_str())?;
        parse_timeseries(ticker, kind, &body)
    }
}

impl FundamentalsProvider for YahooProvider {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    fn summary_detail(&self, ticker: &Ticker) -> Result<FieldMap, ProviderError> {
        self.quote_summary_module(ticker, "summaryDetail")
    }

    fn financial_data(&self, ticker: &Ticker) -> Result<FieldMap, ProviderError> {
        self.quote_summary_module(ticker, "financialData")
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

/// Parse a quoteSummary body and return the requested module's fields.
fn parse_quote_summary(
    ticker: &Ticker,
    module: &str,
    body: &str,
) -> Result<FieldMap, ProviderError> {
    let resp: QuoteSummaryResponse = serde_json::from_str(body).map_err(|e| {
        ProviderError::ResponseFormatChanged(format!("quoteSummary for {ticker}: {e}"))
    })?;

    if let Some(err) = resp.quote_summary.error {
        return Err(api_error(ticker, err));
    }

    let result = resp
        .quote_summary
        .result
        .and_then(|r| r.into_iter().next())
        .ok_or_else(|| {
            ProviderError::ResponseFormatChanged(format!("quoteSummary for {ticker}: empty result"))
        })?;

    match result.get(module) {
        Some(Value::Object(fields)) => Ok(fields
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()),
        Some(other) => Err(ProviderError::ResponseFormatChanged(format!(
            "quoteSummary module '{module}' for {ticker} is not an object: {other}"
        ))),
        None => Err(ProviderError::ResponseFormatChanged(format!(
            "quoteSummary for {ticker} has no '{module}' module"
        ))),
    }
}

/// Parse a fundamentals-timeseries body into a row table keyed by as-of-date.
///
/// Rows are ordered by date, then period type; points without a reported
/// value still create their row.
fn parse_timeseries(
    ticker: &Ticker,
    kind: StatementKind,
    body: &str,
) -> Result<StatementTable, ProviderError> {
    let resp: TimeseriesResponse = serde_json::from_str(body).map_err(|e| {
        ProviderError::ResponseFormatChanged(format!("timeseries for {ticker}: {e}"))
    })?;

    if let Some(err) = resp.timeseries.error {
        return Err(api_error(ticker, err));
    }

    let mut rows: BTreeMap<(NaiveDate, String), StatementRecord> = BTreeMap::new();

    for series in resp.timeseries.result.unwrap_or_default() {
        let meta: TimeseriesMeta = series
            .get("meta")
            .cloned()
            .map(serde_json::from_value::<TimeseriesMeta>)
            .transpose()
            .map_err(|e| ProviderError::ResponseFormatChanged(format!("timeseries meta: {e}")))?
            .ok_or_else(|| ProviderError::ResponseFormatChanged("timeseries without meta".into()))?;

        let Some(series_type) = meta.series_type.first() else {
            continue;
        };
        let field = series_type
            .strip_prefix("annual")
            .or_else(|| series_type.strip_prefix("trailing"))
            .unwrap_or(series_type);

        // A series with no reported periods carries only `meta` and `timestamp`.
        let Some(points) = series.get(series_type.as_str()) else {
            continue;
        };
        let points: Vec<Option<TimeseriesPoint>> = serde_json::from_value(points.clone())
            .map_err(|e| {
                ProviderError::ResponseFormatChanged(format!("series '{series_type}': {e}"))
            })?;

        for point in points.into_iter().flatten() {
            let date = NaiveDate::parse_from_str(&point.as_of_date, "%Y-%m-%d").map_err(|e| {
                ProviderError::ResponseFormatChanged(format!(
                    "bad asOfDate '{}' in '{series_type}': {e}",
                    point.as_of_date
                ))
            })?;
            let record = rows
                .entry((date, point.period_type.clone()))
                .or_insert_with(|| StatementRecord::new(date, point.period_type.clone()));
            if let Some(raw) = point.reported_value.and_then(|v| v.raw) {
                record.values.insert(field.to_string(), raw);
            }
        }
    }

    Ok(StatementTable::new(ticker.clone(), kind).with_rows(rows.into_values().collect()))
}

/// A failed crumb request is an auth failure for every ticker, not a missing symbol.
fn crumb_error(err: ProviderError) -> ProviderError {
    match err {
        ProviderError::NetworkUnreachable(_)
        | ProviderError::RateLimited { .. }
        | ProviderError::AuthenticationRequired(_) => err,
        other => ProviderError::AuthenticationRequired(format!("yahoo crumb unavailable: {other}")),
    }
}

fn validate_crumb(body: &str) -> Result<String, ProviderError> {
    let crumb = body.trim();
    if crumb.is_empty() || crumb.len() >= 100 || crumb.contains(' ') || crumb.contains('<') {
        return Err(ProviderError::AuthenticationRequired(
            "yahoo returned an invalid crumb".into(),
        ));
    }
    Ok(crumb.to_string())
}

fn api_error(ticker: &Ticker, err: YahooApiError) -> ProviderError {
    if err.code == "Not Found" {
        ProviderError::SymbolNotFound {
            symbol: ticker.to_string(),
        }
    } else {
        ProviderError::ResponseFormatChanged(format!("{}: {}", err.code, err.description))
    }
}
