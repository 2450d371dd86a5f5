//! Quandl dataset provider.
//!
//! Fetches full daily datasets (e.g. `BCHARTS/KRAKENUSD`) from the v3
//! datasets API. Columns are located by header name, so datasets with extra
//! or reordered columns still parse. Quandl returns rows newest-first; the
//! series constructor puts them in date order.

use super::provider::{
    retry_after, status_error, transport_error, DataSource, FetchRequest, ParseError,
    PriceProvider, RetrievalError,
};
use crate::domain::{PricePoint, PriceSeries, SeriesSource};
use chrono::NaiveDate;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://www.quandl.com/api/v3/datasets";

/// Connection settings for [`QuandlProvider`].
#[derive(Debug, Clone)]
pub struct QuandlConfig {
    pub base_url: String,
    /// Sent as the `api_key` query parameter. Anonymous requests work but are
    /// heavily rate limited.
    pub api_key: Option<SecretString>,
    pub timeout: Duration,
}

impl Default for QuandlConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Deserialize)]
struct DatasetResponse {
    dataset: Dataset,
}

#[derive(Debug, Deserialize)]
struct Dataset {
    column_names: Vec<String>,
    data: Vec<Vec<serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    quandl_error: QuandlError,
}

#[derive(Debug, Deserialize)]
struct QuandlError {
    code: String,
    message: String,
}

/// Column headers used by the BCHARTS family of datasets.
const DATE_COL: &str = "Date";
const COLUMN_MAP: [(&str, Field); 7] = [
    ("Open", Field::Open),
    ("High", Field::High),
    ("Low", Field::Low),
    ("Close", Field::Close),
    ("Volume (BTC)", Field::Volume),
    ("Volume (Currency)", Field::QuoteVolume),
    ("Weighted Price", Field::Weighted),
];

#[derive(Debug, Clone, Copy)]
enum Field {
    Open,
    High,
    Low,
    Close,
    Volume,
    QuoteVolume,
    Weighted,
}

pub struct QuandlProvider {
    client: reqwest::blocking::Client,
    config: QuandlConfig,
}

impl QuandlProvider {
    pub fn new(config: QuandlConfig) -> Result<Self, RetrievalError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(transport_error)?;
        Ok(Self { client, config })
    }

    /// Dataset URL without credentials (safe to log).
    pub fn dataset_url(&self, dataset: &str) -> String {
        format!("{}/{dataset}.json", self.config.base_url.trim_end_matches('/'))
    }

    fn query(&self, request: &FetchRequest) -> Vec<(&'static str, String)> {
        let mut q = Vec::new();
        if let Some(start) = request.start {
            q.push(("start_date", start.to_string()));
        }
        if let Some(end) = request.end {
            q.push(("end_date", end.to_string()));
        }
        if let Some(key) = &self.config.api_key {
            q.push(("api_key", key.expose_secret().to_string()));
        }
        q
    }

    /// Parse a successful dataset body.
    pub fn parse_dataset(dataset_code: &str, body: &str) -> Result<PriceSeries, ParseError> {
        let resp: DatasetResponse =
            serde_json::from_str(body).map_err(|e| ParseError::Json(e.to_string()))?;
        let columns = &resp.dataset.column_names;

        let date_idx = columns
            .iter()
            .position(|c| c == DATE_COL)
            .ok_or_else(|| ParseError::MissingColumn(DATE_COL.to_string()))?;

        // Every BCHARTS dataset has at least a close; the rest are optional.
        let mut indices: Vec<(usize, Field)> = Vec::new();
        for (name, field) in COLUMN_MAP {
            if let Some(i) = columns.iter().position(|c| c == name) {
                indices.push((i, field));
            }
        }
        if !indices.iter().any(|(_, f)| matches!(f, Field::Close)) {
            return Err(ParseError::MissingColumn("Close".to_string()));
        }

        let mut points = Vec::with_capacity(resp.dataset.data.len());
        for row in &resp.dataset.data {
            let raw_date = row
                .get(date_idx)
                .and_then(|v| v.as_str())
                .ok_or_else(|| ParseError::BadDate(format!("{:?}", row.get(date_idx))))?;
            let date = NaiveDate::parse_from_str(raw_date, "%Y-%m-%d")
                .map_err(|_| ParseError::BadDate(raw_date.to_string()))?;

            let mut point = PricePoint {
                date,
                open: f64::NAN,
                high: f64::NAN,
                low: f64::NAN,
                close: f64::NAN,
                volume: f64::NAN,
                quote_volume: f64::NAN,
                weighted_price: f64::NAN,
            };
            for &(i, field) in &indices {
                let v = row.get(i).and_then(|v| v.as_f64()).unwrap_or(f64::NAN);
                match field {
                    Field::Open => point.open = v,
                    Field::High => point.high = v,
                    Field::Low => point.low = v,
                    Field::Close => point.close = v,
                    Field::Volume => point.volume = v,
                    Field::QuoteVolume => point.quote_volume = v,
                    Field::Weighted => point.weighted_price = v,
                }
            }
            points.push(point);
        }

        if points.is_empty() {
            return Err(ParseError::Empty);
        }

        Ok(PriceSeries::new(
            SeriesSource::new("quandl", dataset_code),
            points,
        )?)
    }

    /// Map a Quandl error body to a retrieval error, if it is one.
    fn classify_error(dataset_code: &str, body: &str) -> Option<RetrievalError> {
        let err: ErrorResponse = serde_json::from_str(body).ok()?;
        let code = err.quandl_error.code.as_str();
        Some(match code {
            "QECx02" | "QECx01" => RetrievalError::SymbolNotFound {
                symbol: dataset_code.to_string(),
            },
            "QELx01" | "QELx03" => RetrievalError::RateLimited {
                retry_after_secs: 60,
            },
            c if c.starts_with("QEA") || c.starts_with("QEP") => {
                RetrievalError::AuthenticationRequired(err.quandl_error.message)
            }
            _ => return None,
        })
    }
}

impl PriceProvider for QuandlProvider {
    fn name(&self) -> &str {
        "quandl"
    }

    fn source(&self) -> DataSource {
        DataSource::Quandl
    }

    fn fetch(&self, request: &FetchRequest) -> Result<PriceSeries, RetrievalError> {
        let url = self.dataset_url(&request.symbol);
        tracing::debug!(%url, start = ?request.start, end = ?request.end, "quandl request");

        let resp = self
            .client
            .get(&url)
            .query(&self.query(request))
            .send()
            .map_err(transport_error)?;

        let status = resp.status();
        let retry = retry_after(&resp);
        let body = resp.text().map_err(transport_error)?;

        if !status.is_success() {
            return Err(Self::classify_error(&request.symbol, &body)
                .unwrap_or_else(|| status_error(status, &request.symbol, retry)));
        }

        Ok(Self::parse_dataset(&request.symbol, &body)?)
    }
}
