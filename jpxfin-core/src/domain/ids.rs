use serde::{Deserialize, Serialize};
use std::fmt;

/// Exchange suffix Yahoo uses for Tokyo Stock Exchange listings.
pub const TSE_SUFFIX: &str = ".T";

/// JPX security code (`7203`, or the alphanumeric `130A` form issued since 2024).
///
/// Spreadsheet readers hand numeric cells back as floats, so `7203.0` is
/// normalized to `7203` on construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SecurityCode(String);

impl SecurityCode {
    pub fn new(raw: impl AsRef<str>) -> Self {
        let trimmed = raw.as_ref().trim();
        let normalized = match trimmed.strip_suffix(".0") {
            Some(int_part) if !int_part.is_empty() && int_part.bytes().all(|b| b.is_ascii_digit()) => {
                int_part
            }
            _ => trimmed,
        };
        Self(normalized.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Provider ticker for this code on the given exchange.
    pub fn ticker(&self, exchange_suffix: &str) -> Ticker {
        Ticker(format!("{}{}", self.0, exchange_suffix))
    }
}

impl fmt::Display for SecurityCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Provider symbol: security code plus exchange suffix (`7203.T`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Ticker(String);

impl Ticker {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self(symbol.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Ticker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Ticker {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
