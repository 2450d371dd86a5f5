//! Serializable analysis configuration, loaded from TOML.
//!
//! Every section has defaults, so an empty file is a valid config that
//! reproduces the classic BTC-index + altcoin correlation study.

use chrono::NaiveDate;
use cryptolab_core::analysis::Transform;
use cryptolab_core::data::{poloniex, quandl, AlignOptions, PoloniexConfig, QuandlConfig, SyntheticConfig};
use cryptolab_core::domain::{PriceField, RunId};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Provider names accepted in `index.provider` / `altcoins.provider`.
pub const KNOWN_PROVIDERS: [&str; 3] = ["quandl", "poloniex", "synthetic"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Complete configuration of one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AnalysisConfig {
    pub paths: PathsConfig,
    pub range: RangeConfig,
    pub providers: ProvidersConfig,
    pub index: IndexConfig,
    pub altcoins: AltcoinConfig,
    pub align: AlignOptions,
    pub analysis: AnalysisSettings,
    pub charts: ChartsConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub cache_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("data"),
            output_dir: PathBuf::from("results"),
        }
    }
}

/// Requested date range. Missing bounds are left to each provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RangeConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ProvidersConfig {
    pub quandl: QuandlSettings,
    pub poloniex: PoloniexSettings,
    pub synthetic: SyntheticSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuandlSettings {
    pub base_url: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    pub timeout_secs: u64,
}

impl Default for QuandlSettings {
    fn default() -> Self {
        Self {
            base_url: quandl::DEFAULT_BASE_URL.to_string(),
            api_key_env: "QUANDL_API_KEY".to_string(),
            timeout_secs: 30,
        }
    }
}

impl QuandlSettings {
    /// Read the API key from the configured environment variable.
    pub fn api_key_from_env(&self) -> Option<SecretString> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .map(SecretString::from)
    }

    pub fn provider_config(&self, api_key: Option<SecretString>) -> QuandlConfig {
        QuandlConfig {
            base_url: self.base_url.clone(),
            api_key,
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoloniexSettings {
    pub base_url: String,
    pub period_secs: u32,
    /// Start used when `range.start` is not set.
    pub default_start: NaiveDate,
    pub timeout_secs: u64,
}

impl Default for PoloniexSettings {
    fn default() -> Self {
        let defaults = PoloniexConfig::default();
        Self {
            base_url: poloniex::DEFAULT_BASE_URL.to_string(),
            period_secs: poloniex::DAILY_PERIOD_SECS,
            default_start: defaults.default_start,
            timeout_secs: defaults.timeout.as_secs(),
        }
    }
}

impl PoloniexSettings {
    pub fn provider_config(&self) -> PoloniexConfig {
        PoloniexConfig {
            base_url: self.base_url.clone(),
            period_secs: self.period_secs,
            default_start: self.default_start,
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticSettings {
    pub daily_volatility: f64,
    pub outage_rate: f64,
}

impl Default for SyntheticSettings {
    fn default() -> Self {
        let defaults = SyntheticConfig::default();
        Self {
            daily_volatility: defaults.daily_volatility,
            outage_rate: 0.01,
        }
    }
}

impl SyntheticSettings {
    pub fn provider_config(&self, range: &RangeConfig) -> SyntheticConfig {
        let defaults = SyntheticConfig::default();
        SyntheticConfig {
            default_start: range.start.unwrap_or(defaults.default_start),
            default_end: range.end,
            daily_volatility: self.daily_volatility,
            outage_rate: self.outage_rate,
        }
    }
}

/// The aggregate BTC price: one series per exchange, averaged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    pub provider: String,
    /// `{}` is replaced by each symbol.
    pub dataset_template: String,
    pub symbols: Vec<String>,
    pub field: PriceField,
    /// Replace zero prices (exchange outage days) with gaps before averaging.
    pub clean_zeros: bool,
    pub average_label: String,
    /// Column name of the index in the combined table.
    pub label: String,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            provider: "quandl".to_string(),
            dataset_template: "BCHARTS/{}USD".to_string(),
            symbols: ["KRAKEN", "COINBASE", "BITSTAMP", "ITBIT"]
                .map(String::from)
                .to_vec(),
            field: PriceField::WeightedPrice,
            clean_zeros: true,
            average_label: "avg_btc_price_usd".to_string(),
            label: "BTC".to_string(),
        }
    }
}

impl IndexConfig {
    pub fn dataset_for(&self, symbol: &str) -> String {
        self.dataset_template.replace("{}", symbol)
    }
}

/// BTC-quoted altcoins, converted to USD through the index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AltcoinConfig {
    pub provider: String,
    /// `{}` is replaced by each symbol.
    pub pair_template: String,
    pub symbols: Vec<String>,
    pub field: PriceField,
}

impl Default for AltcoinConfig {
    fn default() -> Self {
        Self {
            provider: "poloniex".to_string(),
            pair_template: "BTC_{}".to_string(),
            symbols: ["ETH", "LTC", "XRP", "ETC", "STR", "DASH", "SC", "XMR", "XEM"]
                .map(String::from)
                .to_vec(),
            field: PriceField::WeightedPrice,
        }
    }
}

impl AltcoinConfig {
    pub fn pair_for(&self, symbol: &str) -> String {
        self.pair_template.replace("{}", symbol)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisSettings {
    pub transform: Transform,
    /// One correlation matrix per calendar year; empty means the whole table.
    pub years: Vec<i32>,
    /// Columns with fewer values than this in a window are left out of that
    /// window's matrix.
    pub min_observations: usize,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            transform: Transform::PctChange,
            years: vec![2016, 2017],
            min_observations: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartsConfig {
    pub enabled: bool,
    /// Log-scale y axis on the combined USD chart.
    pub log_scale: bool,
    /// Script URL embedded in every HTML chart.
    pub plotly_cdn: String,
}

impl Default for ChartsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            log_scale: true,
            plotly_cdn: "https://cdn.plot.ly/plotly-2.35.2.min.js".to_string(),
        }
    }
}

impl AnalysisConfig {
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Deterministic run ID over the whole config.
    pub fn run_id(&self) -> Result<RunId, ConfigError> {
        RunId::for_config(self).map_err(|e| ConfigError::Invalid(format!("unhashable config: {e}")))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        for (section, provider) in [("index", &self.index.provider), ("altcoins", &self.altcoins.provider)] {
            if !KNOWN_PROVIDERS.contains(&provider.as_str()) {
                return invalid(format!(
                    "{section}.provider '{provider}' is not one of {}",
                    KNOWN_PROVIDERS.join(", ")
                ));
            }
        }
        if self.index.symbols.is_empty() {
            return invalid("index.symbols must not be empty".into());
        }
        if self.altcoins.symbols.is_empty() {
            return invalid("altcoins.symbols must not be empty".into());
        }
        if !self.index.dataset_template.contains("{}") {
            return invalid("index.dataset_template must contain '{}'".into());
        }
        if !self.altcoins.pair_template.contains("{}") {
            return invalid("altcoins.pair_template must contain '{}'".into());
        }
        if let (Some(start), Some(end)) = (self.range.start, self.range.end) {
            if start > end {
                return invalid(format!("range.start {start} is after range.end {end}"));
            }
        }
        // Points are keyed by calendar date, so only daily candles fit.
        if self.providers.poloniex.period_secs != poloniex::DAILY_PERIOD_SECS {
            return invalid(format!(
                "providers.poloniex.period_secs must be {} (daily candles), got {}",
                poloniex::DAILY_PERIOD_SECS,
                self.providers.poloniex.period_secs
            ));
        }
        if self.analysis.min_observations < 2 {
            return invalid("analysis.min_observations must be at least 2".into());
        }
        if self.index.average_label.is_empty() || self.index.label.is_empty() {
            return invalid("index labels must not be empty".into());
        }

        // Every column of the combined table must be distinct.
        let mut names: Vec<&str> = self.altcoins.symbols.iter().map(String::as_str).collect();
        names.push(&self.index.label);
        names.sort_unstable();
        if let Some(w) = names.windows(2).find(|w| w[0] == w[1]) {
            return invalid(format!("column '{}' appears twice in the combined table", w[0]));
        }
        let mut exchanges: Vec<&str> = self.index.symbols.iter().map(String::as_str).collect();
        exchanges.push(&self.index.average_label);
        exchanges.sort_unstable();
        if let Some(w) = exchanges.windows(2).find(|w| w[0] == w[1]) {
            return invalid(format!("column '{}' appears twice in the index table", w[0]));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_is_default_config() {
        let config = AnalysisConfig::from_toml("").unwrap();
        assert_eq!(config, AnalysisConfig::default());
        assert_eq!(config.index.symbols.len(), 4);
        assert_eq!(config.altcoins.symbols.len(), 9);
        assert_eq!(config.providers.quandl.api_key_env, "QUANDL_API_KEY");
    }

    #[test]
    fn default_roundtrips_through_toml() {
        let config = AnalysisConfig::default();
        let text = config.to_toml().unwrap();
        assert!(text.contains("[providers.quandl]"));
        assert_eq!(AnalysisConfig::from_toml(&text).unwrap(), config);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = AnalysisConfig::from_toml(
            r#"
            [range]
            start = "2016-01-01"
            end = "2017-12-31"

            [altcoins]
            symbols = ["ETH", "LTC"]

            [align]
            mode = "intersection"

            [analysis]
            transform = "log"
            years = []
            "#,
        )
        .unwrap();
        assert_eq!(config.range.start, NaiveDate::from_ymd_opt(2016, 1, 1));
        assert_eq!(config.altcoins.symbols, vec!["ETH", "LTC"]);
        assert_eq!(config.altcoins.pair_template, "BTC_{}");
        assert_eq!(config.analysis.transform, Transform::Log);
        assert!(config.analysis.years.is_empty());
        assert_eq!(config.index, IndexConfig::default());
    }

    #[test]
    fn templates_expand_symbols() {
        let config = AnalysisConfig::default();
        assert_eq!(config.index.dataset_for("KRAKEN"), "BCHARTS/KRAKENUSD");
        assert_eq!(config.altcoins.pair_for("ETH"), "BTC_ETH");
    }

    #[test]
    fn validation_catches_bad_configs() {
        let cases = [
            "[index]\nsymbols = []",
            "[altcoins]\npair_template = \"BTC_ETH\"",
            "[range]\nstart = \"2018-01-01\"\nend = \"2017-01-01\"",
            "[index]\nprovider = \"coinmarketcap\"",
            "[analysis]\nmin_observations = 1",
            "[altcoins]\nsymbols = [\"ETH\", \"BTC\"]",
            "[providers.poloniex]\nperiod_secs = 14400",
        ];
        for case in cases {
            assert!(
                matches!(AnalysisConfig::from_toml(case), Err(ConfigError::Invalid(_))),
                "accepted: {case}"
            );
        }
    }

    #[test]
    fn unknown_field_value_is_parse_error() {
        assert!(matches!(
            AnalysisConfig::from_toml("[index]\nfield = \"vwap\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn run_id_tracks_config() {
        let a = AnalysisConfig::default();
        let mut b = a.clone();
        b.analysis.years = vec![2017];
        assert_eq!(a.run_id().unwrap(), a.run_id().unwrap());
        assert_ne!(a.run_id().unwrap(), b.run_id().unwrap());
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            AnalysisConfig::from_file(&dir.path().join("nope.toml")),
            Err(ConfigError::Io { .. })
        ));
    }
}
