//! Per-ticker metrics fetcher.
//!
//! Each provider module is requested once; every field is then extracted on
//! its own, so a missing or malformed field costs only that field.

use crate::data::provider::{FieldMap, FundamentalsProvider, ProviderError};
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::domain::report::{MetricField, MetricSource};
use crate::domain::{Ticker, TickerMetrics};
use serde_json::Value;
use thiserror::Error;

/// Why a single field could not be read.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FieldError {
    #[error("field absent")]
    Missing,

    #[error("value is not numeric: {0}")]
    NotNumeric(String),

    #[error("value is not finite")]
    NonFinite,

    #[error("{0}")]
    Provider(ProviderError),
}

/// Run `accessor`; on failure record a diagnostic for `field` and return `fallback`.
pub fn extract_or<T>(
    ticker: &Ticker,
    field: MetricField,
    fallback: T,
    diagnostics: &mut Diagnostics,
    accessor: impl FnOnce() -> Result<T, FieldError>,
) -> T {
    match accessor() {
        Ok(value) => value,
        Err(err) => {
            diagnostics.record(
                ticker,
                DiagnosticKind::MetricUnavailable {
                    field,
                    reason: err.to_string(),
                },
            );
            fallback
        }
    }
}

/// Read a finite number from a module response.
///
/// Accepts plain JSON numbers and Yahoo's `{"raw": ..., "fmt": ...}` wrappers.
pub fn read_number(response: &Result<FieldMap, ProviderError>, key: &str) -> Result<f64, FieldError> {
    let fields = response.as_ref().map_err(|e| FieldError::Provider(e.clone()))?;
    let value = fields.get(key).ok_or(FieldError::Missing)?;
    number_value(value)
}

fn number_value(value: &Value) -> Result<f64, FieldError> {
    match value {
        Value::Null => Err(FieldError::Missing),
        Value::Number(n) => {
            let v = n
                .as_f64()
                .ok_or_else(|| FieldError::NotNumeric(n.to_string()))?;
            if v.is_finite() {
                Ok(v)
            } else {
                Err(FieldError::NonFinite)
            }
        }
        Value::Object(obj) => match obj.get("raw") {
            Some(raw) => number_value(raw),
            // Yahoo sends `{}` for fields it has no value for.
            None if obj.is_empty() => Err(FieldError::Missing),
            None => Err(FieldError::NotNumeric(value.to_string())),
        },
        other => Err(FieldError::NotNumeric(other.to_string())),
    }
}

/// Fetch one metrics row. Never fails: unavailable fields are `None`.
pub fn fetch_metrics(
    provider: &dyn FundamentalsProvider,
    ticker: &Ticker,
    diagnostics: &mut Diagnostics,
) -> TickerMetrics {
    let mut metrics = TickerMetrics::empty(ticker.clone());

    for source in [MetricSource::SummaryDetail, MetricSource::FinancialData] {
        let response = match source {
            MetricSource::SummaryDetail => provider.summary_detail(ticker),
            MetricSource::FinancialData => provider.financial_data(ticker),
        };

        for field in MetricField::from_source(source) {
            let value = extract_or(ticker, field, None, diagnostics, || {
                read_number(&response, field.key()).map(Some)
            });
            metrics.set(field, value);
        }
    }

    metrics
}
