//! Per-ticker fundamentals: the metrics row and reconciled statement rows.

pub mod metrics;
pub mod reconcile;
pub mod schema;

pub use metrics::{extract_or, fetch_metrics, read_number, FieldError};
pub use reconcile::{common_dates, reconcile_statements, reconcile_tables};
pub use schema::{DuplicateDatePolicy, NormalizedStatement, ReconcileError};
