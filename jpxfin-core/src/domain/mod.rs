//! Domain types for jpxfin

pub mod ids;
pub mod report;
pub mod statement;

pub use ids::{SecurityCode, Ticker, TSE_SUFFIX};
pub use report::{MetricField, MetricSource, StatementRow, TickerMetrics};
pub use statement::{StatementField, StatementKind, StatementRecord, StatementTable};
