//! Roster loading from the JPX listed-issues spreadsheet.
//!
//! The roster is read from the first worksheet of an Excel/ODS workbook or
//! from a CSV export with the same header row. Entries keep file order.
//! Filtering removes fund and ETF/ETN categories and explicitly excluded
//! codes; it never reorders or re-adds entries.

use crate::domain::{SecurityCode, Ticker};
use calamine::{open_workbook_auto, Data, Reader};
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// REIT / venture / country / infrastructure funds.
pub const FUND_CATEGORY: &str =
    "REIT・ベンチャーファンド・カントリーファンド・インフラファンド";
/// Exchange-traded funds and notes.
pub const ETF_ETN_CATEGORY: &str = "ETF・ETN";
/// Ito En preferred shares, listed alongside the common stock.
pub const ITO_EN_PREFERRED_CODE: &str = "25935";

/// Header names in the JPX listed-issues file.
pub mod columns {
    pub const CODE: &str = "コード";
    pub const NAME: &str = "銘柄名";
    pub const MARKET_CATEGORY: &str = "市場・商品区分";
    pub const INDUSTRY_33: &str = "33業種区分";
    pub const INDUSTRY_17: &str = "17業種区分";
}

#[derive(Debug, Error)]
pub enum RosterError {
    #[error("roster file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("unsupported roster format: {} (expected .xls, .xlsx, .xlsm, .xlsb, .ods or .csv)", path.display())]
    UnsupportedFormat { path: PathBuf },

    #[error("roster has no worksheet or header row: {}", path.display())]
    EmptyWorkbook { path: PathBuf },

    #[error("roster is missing required column '{column}'")]
    MissingColumn { column: &'static str },

    #[error("spreadsheet error: {0}")]
    Spreadsheet(String),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// One listed issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub code: SecurityCode,
    pub name: String,
    pub market_category: String,
    pub industry_33: String,
    pub industry_17: String,
}

impl RosterEntry {
    pub fn ticker(&self, exchange_suffix: &str) -> Ticker {
        self.code.ticker(exchange_suffix)
    }
}

/// Exclusion rules applied after loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterFilter {
    pub excluded_categories: Vec<String>,
    pub excluded_codes: Vec<SecurityCode>,
}

impl Default for RosterFilter {
    fn default() -> Self {
        Self {
            excluded_categories: vec![FUND_CATEGORY.to_string(), ETF_ETN_CATEGORY.to_string()],
            excluded_codes: vec![SecurityCode::new(ITO_EN_PREFERRED_CODE)],
        }
    }
}

impl RosterFilter {
    pub fn admits(&self, entry: &RosterEntry) -> bool {
        !self
            .excluded_categories
            .iter()
            .any(|c| c == &entry.market_category)
            && !self.excluded_codes.contains(&entry.code)
    }
}

/// The loaded roster, in file order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Roster {
    entries: Vec<RosterEntry>,
}

impl Roster {
    pub fn new(entries: Vec<RosterEntry>) -> Self {
        Self { entries }
    }

    /// Load and filter a roster file.
    pub fn load(path: &Path, filter: &RosterFilter) -> Result<Self, RosterError> {
        let roster = Self::from_file(path)?;
        let before = roster.len();
        let roster = roster.filtered(filter);
        tracing::info!(
            path = %path.display(),
            loaded = before,
            kept = roster.len(),
            "roster loaded"
        );
        Ok(roster)
    }

    /// Read every entry of a roster file, unfiltered.
    pub fn from_file(path: &Path) -> Result<Self, RosterError> {
        if !path.is_file() {
            return Err(RosterError::NotFound {
                path: path.to_path_buf(),
            });
        }

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match extension.as_deref() {
            Some("csv") => Self::from_csv_reader(std::fs::File::open(path)?),
            Some("xls" | "xlsx" | "xlsm" | "xlsb" | "ods") => Self::from_workbook(path),
            _ => Err(RosterError::UnsupportedFormat {
                path: path.to_path_buf(),
            }),
        }
    }

    fn from_workbook(path: &Path) -> Result<Self, RosterError> {
        let mut workbook =
            open_workbook_auto(path).map_err(|e| RosterError::Spreadsheet(e.to_string()))?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| RosterError::EmptyWorkbook {
                path: path.to_path_buf(),
            })?
            .map_err(|e| RosterError::Spreadsheet(e.to_string()))?;

        let mut rows = range.rows();
        let header: Vec<String> = rows
            .next()
            .ok_or_else(|| RosterError::EmptyWorkbook {
                path: path.to_path_buf(),
            })?
            .iter()
            .map(cell_text)
            .collect();

        Self::from_rows(&header, rows.map(|r| r.iter().map(cell_text).collect()))
    }

    /// Parse a CSV roster with the JPX header row.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self, RosterError> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let header: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
        let mut rows = Vec::new();
        for record in rdr.records() {
            rows.push(record?.iter().map(str::to_string).collect());
        }
        Self::from_rows(&header, rows.into_iter())
    }

    /// Build entries from a header row and data rows. Rows without a code are skipped.
    pub fn from_rows(
        header: &[String],
        rows: impl Iterator<Item = Vec<String>>,
    ) -> Result<Self, RosterError> {
        let code = column_index(header, columns::CODE)?;
        let name = column_index(header, columns::NAME)?;
        let market = column_index(header, columns::MARKET_CATEGORY)?;
        let industry_33 = column_index(header, columns::INDUSTRY_33)?;
        let industry_17 = column_index(header, columns::INDUSTRY_17)?;

        let cell = |row: &[String], idx: usize| -> String {
            row.get(idx).map(|s| s.trim().to_string()).unwrap_or_default()
        };

        let entries = rows
            .filter_map(|row| {
                let code = SecurityCode::new(cell(&row, code));
                if code.is_empty() {
                    return None;
                }
                Some(RosterEntry {
                    code,
                    name: cell(&row, name),
                    market_category: cell(&row, market),
                    industry_33: cell(&row, industry_33),
                    industry_17: cell(&row, industry_17),
                })
            })
            .collect();

        Ok(Self { entries })
    }

    /// Apply exclusion rules, preserving order.
    pub fn filtered(self, filter: &RosterFilter) -> Self {
        Self {
            entries: self
                .entries
                .into_iter()
                .filter(|e| filter.admits(e))
                .collect(),
        }
    }

    pub fn entries(&self) -> &[RosterEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries paired with their provider tickers.
    pub fn tickers<'a>(
        &'a self,
        exchange_suffix: &'a str,
    ) -> impl Iterator<Item = (&'a RosterEntry, Ticker)> + 'a {
        self.entries
            .iter()
            .map(move |e| (e, e.ticker(exchange_suffix)))
    }
}

fn column_index(header: &[String], column: &'static str) -> Result<usize, RosterError> {
    header
        .iter()
        .position(|h| h.trim().trim_start_matches('\u{feff}') == column)
        .ok_or(RosterError::MissingColumn { column })
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        other => other.to_string(),
    }
}
