//! Per-ticker pipeline loop.
//!
//! Walks the filtered roster in order, one ticker at a time: metrics row
//! first, then reconciled statement rows. Per-ticker degradations become
//! diagnostics; only roster loading and report writing can fail a run.

use crate::config::{ConfigError, PipelineConfig};
use crate::export::{self, ReportArtifact};
use jpxfin_core::data::{FundamentalsProvider, Roster, RosterEntry, RosterError};
use jpxfin_core::diagnostics::{DiagnosticKind, Diagnostics};
use jpxfin_core::domain::{StatementRow, Ticker, TickerMetrics, TSE_SUFFIX};
use jpxfin_core::fundamentals::{fetch_metrics, reconcile_statements, DuplicateDatePolicy};
use std::path::PathBuf;
use thiserror::Error;

/// Run-level failures. Everything narrower is a diagnostic.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Roster(#[from] RosterError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to write report {path}: {reason}")]
    Report { path: PathBuf, reason: String },
}

/// Knobs for [`run_pipeline`].
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOptions {
    pub exchange_suffix: String,
    pub duplicate_dates: DuplicateDatePolicy,
    /// Process only the first `n` roster entries.
    pub limit: Option<usize>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            exchange_suffix: TSE_SUFFIX.to_string(),
            duplicate_dates: DuplicateDatePolicy::default(),
            limit: None,
        }
    }
}

impl From<&PipelineConfig> for PipelineOptions {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            exchange_suffix: config.roster.exchange_suffix.clone(),
            duplicate_dates: config.statements.duplicate_dates,
            limit: None,
        }
    }
}

/// One line of the metrics report: roster metadata plus fetched metrics.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsReportRow {
    pub entry: RosterEntry,
    pub metrics: TickerMetrics,
}

/// What one ticker contributed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickerOutcome {
    pub metric_nulls: usize,
    pub statement_rows: usize,
    pub statements_dropped: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub tickers: usize,
    pub statement_rows: usize,
    pub tickers_without_statements: usize,
    pub diagnostics: usize,
}

/// Everything a run accumulated, in roster order.
#[derive(Debug, Clone, Default)]
pub struct RunOutput {
    pub metrics: Vec<MetricsReportRow>,
    pub statements: Vec<StatementRow>,
    pub diagnostics: Diagnostics,
    pub summary: RunSummary,
}

/// Progress callbacks for a run.
pub trait PipelineProgress {
    fn on_start(&self, ticker: &Ticker, index: usize, total: usize);

    fn on_complete(&self, ticker: &Ticker, index: usize, total: usize, outcome: &TickerOutcome);

    fn on_batch_complete(&self, summary: &RunSummary);
}

/// Progress reporter that writes through `tracing`.
pub struct LogProgress;

impl PipelineProgress for LogProgress {
    fn on_start(&self, ticker: &Ticker, index: usize, total: usize) {
        tracing::info!("[{}/{}] {ticker}", index + 1, total);
    }

    fn on_complete(&self, ticker: &Ticker, _index: usize, _total: usize, outcome: &TickerOutcome) {
        tracing::debug!(
            ticker = %ticker,
            metric_nulls = outcome.metric_nulls,
            statement_rows = outcome.statement_rows,
            statements_dropped = outcome.statements_dropped,
            "ticker done"
        );
    }

    fn on_batch_complete(&self, summary: &RunSummary) {
        tracing::info!(
            "run complete: {} tickers, {} statement rows, {} without statements, {} diagnostics",
            summary.tickers,
            summary.statement_rows,
            summary.tickers_without_statements,
            summary.diagnostics
        );
    }
}

/// Process every roster entry against `provider`.
pub fn run_pipeline(
    roster: &Roster,
    provider: &dyn FundamentalsProvider,
    options: &PipelineOptions,
    progress: Option<&dyn PipelineProgress>,
) -> RunOutput {
    let total = options
        .limit
        .map_or(roster.len(), |n| n.min(roster.len()));
    let mut output = RunOutput::default();

    for (index, (entry, ticker)) in roster
        .tickers(&options.exchange_suffix)
        .take(total)
        .enumerate()
    {
        if let Some(p) = progress {
            p.on_start(&ticker, index, total);
        }

        let mut diagnostics = Diagnostics::new();
        let metrics = fetch_metrics(provider, &ticker, &mut diagnostics);
        let rows = reconcile_statements(provider, &ticker, options.duplicate_dates, &mut diagnostics);

        let outcome = TickerOutcome {
            metric_nulls: diagnostics
                .iter()
                .filter(|d| matches!(d.kind, DiagnosticKind::MetricUnavailable { .. }))
                .count(),
            statement_rows: rows.len(),
            statements_dropped: diagnostics.iter().any(|d| d.drops_statements()),
        };

        output.summary.tickers += 1;
        output.summary.statement_rows += rows.len();
        if rows.is_empty() {
            output.summary.tickers_without_statements += 1;
        }

        output.metrics.push(MetricsReportRow {
            entry: entry.clone(),
            metrics,
        });
        output.statements.extend(rows);
        output.diagnostics.extend(diagnostics);

        if let Some(p) = progress {
            p.on_complete(&ticker, index, total, &outcome);
        }
    }

    output.summary.diagnostics = output.diagnostics.len();
    if let Some(p) = progress {
        p.on_batch_complete(&output.summary);
    }
    output
}

/// A finished run with its written reports.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub output: RunOutput,
    pub metrics_report: ReportArtifact,
    pub statements_report: ReportArtifact,
}

/// Load the roster, run the pipeline and write both reports.
///
/// The roster is loaded before `provider` is touched, so a missing file
/// fails without any network activity.
pub fn execute(
    config: &PipelineConfig,
    options: &PipelineOptions,
    provider: &dyn FundamentalsProvider,
    progress: Option<&dyn PipelineProgress>,
) -> Result<RunReport, PipelineError> {
    let encoding = config.output.encoding()?;
    let roster = Roster::load(&config.roster.path, &config.roster.filter())?;

    let output = run_pipeline(&roster, provider, options, progress);

    let metrics_path = &config.output.metrics_path;
    let metrics_report = export::metrics_csv(&output.metrics)
        .and_then(|csv| export::write_report(metrics_path, &csv, output.metrics.len(), encoding))
        .map_err(|e| PipelineError::Report {
            path: metrics_path.clone(),
            reason: format!("{e:#}"),
        })?;

    let statements_path = &config.output.statements_path;
    let statements_report = export::statements_csv(&output.statements)
        .and_then(|csv| {
            export::write_report(statements_path, &csv, output.statements.len(), encoding)
        })
        .map_err(|e| PipelineError::Report {
            path: statements_path.clone(),
            reason: format!("{e:#}"),
        })?;

    Ok(RunReport {
        output,
        metrics_report,
        statements_report,
    })
}
