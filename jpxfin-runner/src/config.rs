//! Serializable pipeline configuration.
//!
//! Loaded from TOML. Every field has a default, so an empty file (or no file
//! at all) reproduces the standard JPX run.

use encoding_rs::Encoding;
use jpxfin_core::data::roster::{ETF_ETN_CATEGORY, FUND_CATEGORY, ITO_EN_PREFERRED_CODE};
use jpxfin_core::data::{RosterFilter, YahooConfig};
use jpxfin_core::domain::{SecurityCode, TSE_SUFFIX};
use jpxfin_core::fundamentals::DuplicateDatePolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("unknown output encoding '{0}'")]
    UnknownEncoding(String),
}

/// Top-level configuration for one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub roster: RosterConfig,
    pub output: OutputConfig,
    pub statements: StatementsConfig,
    pub provider: ProviderConfig,
}

impl PipelineConfig {
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.output.encoding()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RosterConfig {
    pub path: PathBuf,
    pub exchange_suffix: String,
    pub excluded_categories: Vec<String>,
    pub excluded_codes: Vec<String>,
}

impl Default for RosterConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./data_j.xls"),
            exchange_suffix: TSE_SUFFIX.to_string(),
            excluded_categories: vec![FUND_CATEGORY.to_string(), ETF_ETN_CATEGORY.to_string()],
            excluded_codes: vec![ITO_EN_PREFERRED_CODE.to_string()],
        }
    }
}

impl RosterConfig {
    pub fn filter(&self) -> RosterFilter {
        RosterFilter {
            excluded_categories: self.excluded_categories.clone(),
            excluded_codes: self.excluded_codes.iter().map(SecurityCode::new).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub metrics_path: PathBuf,
    pub statements_path: PathBuf,
    /// WHATWG encoding label for both reports.
    pub encoding: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            metrics_path: PathBuf::from("./company_metrics.csv"),
            statements_path: PathBuf::from("./company_financial_info.csv"),
            encoding: "shift_jis".into(),
        }
    }
}

impl OutputConfig {
    pub fn encoding(&self) -> Result<&'static Encoding, ConfigError> {
        Encoding::for_label(self.encoding.as_bytes())
            .ok_or_else(|| ConfigError::UnknownEncoding(self.encoding.clone()))
    }

    /// Re-root both report paths under `dir`, keeping their file names.
    pub fn relocate(&mut self, dir: &Path) {
        for path in [&mut self.metrics_path, &mut self.statements_path] {
            if let Some(name) = path.file_name() {
                *path = dir.join(name);
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StatementsConfig {
    pub duplicate_dates: DuplicateDatePolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProviderConfig {
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        let yahoo = YahooConfig::default();
        Self {
            timeout_secs: yahoo.timeout.as_secs(),
            user_agent: yahoo.user_agent,
        }
    }
}

impl ProviderConfig {
    pub fn yahoo(&self) -> YahooConfig {
        YahooConfig {
            timeout: Duration::from_secs(self.timeout_secs),
            user_agent: self.user_agent.clone(),
            ..YahooConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = PipelineConfig::from_toml("").unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert_eq!(config.roster.path, PathBuf::from("./data_j.xls"));
        assert_eq!(config.roster.exchange_suffix, ".T");
        assert_eq!(config.output.encoding().unwrap(), encoding_rs::SHIFT_JIS);
        assert_eq!(config.statements.duplicate_dates, DuplicateDatePolicy::KeepLast);
        assert_eq!(config.provider.timeout_secs, 30);
    }

    #[test]
    fn default_filter_matches_jpx_exclusions() {
        assert_eq!(RosterConfig::default().filter(), RosterFilter::default());
    }

    #[test]
    fn partial_sections_override_fields() {
        let config = PipelineConfig::from_toml(
            r#"
            [roster]
            path = "listing.csv"

            [statements]
            duplicate_dates = "reject"

            [provider]
            timeout_secs = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.roster.path, PathBuf::from("listing.csv"));
        assert_eq!(config.roster.excluded_codes, vec!["25935".to_string()]);
        assert_eq!(config.statements.duplicate_dates, DuplicateDatePolicy::Reject);
        assert_eq!(config.provider.yahoo().timeout, Duration::from_secs(5));
    }

    #[test]
    fn cp932_label_resolves_to_shift_jis() {
        let config = PipelineConfig::from_toml("[output]\nencoding = \"windows-31j\"").unwrap();
        assert_eq!(config.output.encoding().unwrap(), encoding_rs::SHIFT_JIS);
    }

    #[test]
    fn unknown_encoding_is_rejected() {
        let err = PipelineConfig::from_toml("[output]\nencoding = \"klingon\"").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownEncoding(label) if label == "klingon"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = PipelineConfig::from_toml("[roster]\nsheet = 2").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn relocate_keeps_file_names() {
        let mut output = OutputConfig::default();
        output.relocate(Path::new("/tmp/out"));
        assert_eq!(output.metrics_path, PathBuf::from("/tmp/out/company_metrics.csv"));
        assert_eq!(
            output.statements_path,
            PathBuf::from("/tmp/out/company_financial_info.csv")
        );
    }

    #[test]
    fn toml_roundtrip_preserves_config() {
        let mut config = PipelineConfig::default();
        config.statements.duplicate_dates = DuplicateDatePolicy::Reject;
        let text = config.to_toml().unwrap();
        assert_eq!(PipelineConfig::from_toml(&text).unwrap(), config);
    }

    #[test]
    fn missing_file_is_read_error() {
        let err = PipelineConfig::from_file(Path::new("/nonexistent/jpxfin.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
