//! Roster loading through calamine, against a checked-in workbook.
//!
//! The fixture stores codes as numeric cells, the way the JPX spreadsheet
//! does, plus one alphanumeric code stored as text.

use jpxfin_core::data::{Roster, RosterFilter};
use std::path::PathBuf;

fn fixture() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/data_j.xlsx")
}

fn codes(roster: &Roster) -> Vec<&str> {
    roster.entries().iter().map(|e| e.code.as_str()).collect()
}

#[test]
fn workbook_reads_every_row() {
    let roster = Roster::from_file(&fixture()).unwrap();
    assert_eq!(codes(&roster), ["1301", "1343", "25935", "130A", "7203"]);

    let toyota = &roster.entries()[4];
    assert_eq!(toyota.name, "トヨタ自動車");
    assert_eq!(toyota.market_category, "プライム（内国株式）");
    assert_eq!(toyota.industry_33, "輸送用機器");
    assert_eq!(toyota.industry_17, "自動車・輸送機");
}

#[test]
fn workbook_load_applies_default_filter() {
    let roster = Roster::load(&fixture(), &RosterFilter::default()).unwrap();
    assert_eq!(codes(&roster), ["1301", "130A", "7203"]);

    let tickers: Vec<String> = roster
        .tickers(".T")
        .map(|(_, t)| t.to_string())
        .collect();
    assert_eq!(tickers, ["1301.T", "130A.T", "7203.T"]);
}
