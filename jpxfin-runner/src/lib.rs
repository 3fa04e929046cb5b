//! jpxfin runner: configuration, the per-ticker pipeline, and report export.
//!
//! This crate builds on `jpxfin-core` to provide:
//! - TOML pipeline configuration with full defaults
//! - The sequential roster loop (metrics + reconciled statements per ticker)
//! - CSV report serialization in Shift_JIS (or any WHATWG encoding)
//! - Report artifacts with BLAKE3 digests

pub mod config;
pub mod export;
pub mod pipeline;

pub use config::{ConfigError, OutputConfig, PipelineConfig, ProviderConfig, RosterConfig};
pub use export::{encode_lossy, metrics_csv, statements_csv, write_report, ReportArtifact};
pub use pipeline::{
    execute, run_pipeline, LogProgress, MetricsReportRow, PipelineError, PipelineOptions,
    PipelineProgress, RunOutput, RunReport, RunSummary, TickerOutcome,
};
