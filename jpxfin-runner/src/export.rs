//! Report export: CSV text, legacy encoding and on-disk artifacts.
//!
//! Both reports are built as UTF-8 CSV in memory, then re-encoded for the
//! spreadsheet tools that consume them (Shift_JIS by default). Characters the
//! target encoding cannot represent are dropped.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use encoding_rs::{Encoding, EncoderResult};
use jpxfin_core::domain::{MetricField, StatementField, StatementRow};

use crate::pipeline::MetricsReportRow;

/// Roster columns leading the metrics report.
pub const METRICS_ROSTER_COLUMNS: [&str; 5] = [
    "ticker",
    "ticker_name",
    "market_product_category",
    "type_33",
    "type_17",
];

pub fn metrics_header() -> Vec<&'static str> {
    METRICS_ROSTER_COLUMNS
        .into_iter()
        .chain(MetricField::ALL.iter().map(|f| f.column()))
        .collect()
}

pub fn statements_header() -> Vec<&'static str> {
    ["ticker", "index", "asOfDate"]
        .into_iter()
        .chain(StatementField::ALL.iter().map(|f| f.name()))
        .chain(["capitalAdequacyRatio", "ROE"])
        .collect()
}

/// Empty for null, otherwise the shortest form that parses back exactly.
fn cell(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Metrics report, one line per roster entry.
///
/// The ticker column carries the provider ticker, the same key the statement report uses.
pub fn metrics_csv(rows: &[MetricsReportRow]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(metrics_header())?;

    for row in rows {
        let e = &row.entry;
        let mut record = vec![
            row.metrics.ticker.to_string(),
            e.name.clone(),
            e.market_category.clone(),
            e.industry_33.clone(),
            e.industry_17.clone(),
        ];
        record.extend(row.metrics.values().into_iter().map(cell));
        wtr.write_record(&record)?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Statement report, one line per reconciled period.
pub fn statements_csv(rows: &[StatementRow]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(statements_header())?;

    for row in rows {
        let mut record = vec![
            row.ticker.to_string(),
            row.period_index.to_string(),
            row.as_of_date.format("%Y-%m-%d").to_string(),
        ];
        record.extend(StatementField::ALL.iter().map(|&f| cell(row.get(f))));
        record.push(cell(row.capital_adequacy_ratio));
        record.push(cell(row.roe));
        wtr.write_record(&record)?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Encoding ───────────────────────────────────────────────────────

/// Encode `text`, silently dropping characters `encoding` cannot map.
pub fn encode_lossy(text: &str, encoding: &'static Encoding) -> Vec<u8> {
    let mut encoder = encoding.new_encoder();
    let mut out = Vec::with_capacity(text.len());
    let mut buf = [0u8; 4096];
    let mut src = text;
    let mut dropped = 0usize;

    loop {
        let (result, read, written) =
            encoder.encode_from_utf8_without_replacement(src, &mut buf, true);
        out.extend_from_slice(&buf[..written]);
        src = &src[read..];
        match result {
            EncoderResult::InputEmpty => break,
            EncoderResult::OutputFull => {}
            EncoderResult::Unmappable(_) => dropped += 1,
        }
    }

    if dropped > 0 {
        tracing::debug!(dropped, encoding = encoding.name(), "dropped unencodable characters");
    }
    out
}

// ─── Artifacts ──────────────────────────────────────────────────────

/// A report written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportArtifact {
    pub path: PathBuf,
    /// Data rows, header excluded.
    pub rows: usize,
    pub bytes: usize,
    /// BLAKE3 digest of the written bytes, hex.
    pub digest: String,
}

/// Encode `csv` and write it to `path`, creating parent directories.
pub fn write_report(
    path: &Path,
    csv: &str,
    rows: usize,
    encoding: &'static Encoding,
) -> Result<ReportArtifact> {
    let bytes = encode_lossy(csv, encoding);

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create report dir: {}", parent.display()))?;
    }
    std::fs::write(path, &bytes)
        .with_context(|| format!("failed to write {}", path.display()))?;

    let artifact = ReportArtifact {
        path: path.to_path_buf(),
        rows,
        bytes: bytes.len(),
        digest: blake3::hash(&bytes).to_hex().to_string(),
    };
    tracing::info!(
        path = %artifact.path.display(),
        rows = artifact.rows,
        bytes = artifact.bytes,
        blake3 = %artifact.digest,
        "report written"
    );
    Ok(artifact)
}
