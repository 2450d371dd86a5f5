//! Poloniex chart-data provider.
//!
//! Fetches candles from the public `returnChartData` endpoint. Pairs are
//! quoted in the first currency (`BTC_ETH` is ETH priced in BTC). An unknown
//! pair comes back as HTTP 200 with `{"error": "..."}`.

use super::provider::{
    retry_after, status_error, transport_error, DataSource, FetchRequest, ParseError,
    PriceProvider, RetrievalError,
};
use crate::domain::{PricePoint, PriceSeries, SeriesSource};
use chrono::{DateTime, NaiveDate};
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://poloniex.com/public";

/// One day, in seconds.
pub const DAILY_PERIOD_SECS: u32 = 86_400;

#[derive(Debug, Clone)]
pub struct PoloniexConfig {
    pub base_url: String,
    /// Candle period in seconds.
    pub period_secs: u32,
    /// Used when a request has no start date.
    pub default_start: NaiveDate,
    pub timeout: Duration,
}

impl Default for PoloniexConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            period_secs: DAILY_PERIOD_SECS,
            default_start: NaiveDate::from_ymd_opt(2015, 1, 1).unwrap_or_default(),
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ChartResponse {
    Candles(Vec<Candle>),
    Error { error: String },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candle {
    date: i64,
    high: f64,
    low: f64,
    open: f64,
    close: f64,
    volume: f64,
    quote_volume: f64,
    weighted_average: f64,
}

pub struct PoloniexProvider {
    client: reqwest::blocking::Client,
    config: PoloniexConfig,
}

impl PoloniexProvider {
    pub fn new(config: PoloniexConfig) -> Result<Self, RetrievalError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(transport_error)?;
        Ok(Self { client, config })
    }

    /// Query parameters for a chart request; the end defaults to today.
    pub fn chart_query(&self, request: &FetchRequest, today: NaiveDate) -> Vec<(&'static str, String)> {
        let start = request.start.unwrap_or(self.config.default_start);
        let end = request.end.unwrap_or(today);
        vec![
            ("command", "returnChartData".to_string()),
            ("currencyPair", request.symbol.clone()),
            ("start", day_start_ts(start).to_string()),
            ("end", day_end_ts(end).to_string()),
            ("period", self.config.period_secs.to_string()),
        ]
    }

    /// Parse a chart body into a series, or classify an `{"error": ..}` body.
    pub fn parse_chart(pair: &str, body: &str) -> Result<PriceSeries, RetrievalError> {
        let resp: ChartResponse =
            serde_json::from_str(body).map_err(|e| ParseError::Json(e.to_string()))?;

        let candles = match resp {
            ChartResponse::Candles(c) => c,
            ChartResponse::Error { error } => {
                tracing::debug!(pair, %error, "poloniex returned an error body");
                return Err(RetrievalError::SymbolNotFound {
                    symbol: pair.to_string(),
                });
            }
        };

        // A pair with no trades in range comes back as a single all-zero
        // candle with date 0.
        let candles: Vec<Candle> = candles.into_iter().filter(|c| c.date > 0).collect();
        if candles.is_empty() {
            return Err(ParseError::Empty.into());
        }

        let points = candles
            .into_iter()
            .map(|c| {
                let date = DateTime::from_timestamp(c.date, 0)
                    .map(|dt| dt.date_naive())
                    .ok_or(ParseError::BadTimestamp(c.date))?;
                Ok(PricePoint {
                    date,
                    open: c.open,
                    high: c.high,
                    low: c.low,
                    close: c.close,
                    volume: c.volume,
                    quote_volume: c.quote_volume,
                    weighted_price: c.weighted_average,
                })
            })
            .collect::<Result<Vec<_>, ParseError>>()?;

        Ok(PriceSeries::new(SeriesSource::new("poloniex", pair), points).map_err(ParseError::from)?)
    }
}

fn day_start_ts(date: NaiveDate) -> i64 {
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp())
        .unwrap_or_default()
}

fn day_end_ts(date: NaiveDate) -> i64 {
    date.and_hms_opt(23, 59, 59)
        .map(|dt| dt.and_utc().timestamp())
        .unwrap_or_default()
}

impl PriceProvider for PoloniexProvider {
    fn name(&self) -> &str {
        "poloniex"
    }

    fn source(&self) -> DataSource {
        DataSource::Poloniex
    }

    fn fetch(&self, request: &FetchRequest) -> Result<PriceSeries, RetrievalError> {
        let today = chrono::Utc::now().date_naive();
        let query = self.chart_query(request, today);
        tracing::debug!(url = %self.config.base_url, ?query, "poloniex request");

        let resp = self
            .client
            .get(&self.config.base_url)
            .query(&query)
            .send()
            .map_err(transport_error)?;

        let status = resp.status();
        let retry = retry_after(&resp);
        let body = resp.text().map_err(transport_error)?;

        if !status.is_success() {
            return Err(status_error(status, &request.symbol, retry));
        }

        Self::parse_chart(&request.symbol, &body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{PriceField, SeriesError};

    const BODY: &str = r#"[
        {"date":1483315200,"high":0.0105,"low":0.0098,"open":0.0100,"close":0.0102,"volume":310.5,"quoteVolume":30500.0,"weightedAverage":0.01015},
        {"date":1483228800,"high":0.0101,"low":0.0095,"open":0.0097,"close":0.0100,"volume":250.0,"quoteVolume":25500.0,"weightedAverage":0.00985}
    ]"#;

    #[test]
    fn parses_candles_into_daily_points() {
        let s = PoloniexProvider::parse_chart("BTC_ETH", BODY).unwrap();
        assert_eq!(s.len(), 2);
        assert_eq!(s.first_date(), NaiveDate::from_ymd_opt(2017, 1, 1));
        assert_eq!(s.points()[0].value(PriceField::WeightedPrice), Some(0.00985));
        assert_eq!(s.points()[1].quote_volume, 30500.0);
        assert_eq!(s.source().provider, "poloniex");
    }

    #[test]
    fn error_body_is_unknown_symbol() {
        let err = PoloniexProvider::parse_chart("BTC_NOPE", r#"{"error":"Invalid currency pair."}"#)
            .unwrap_err();
        assert!(matches!(err, RetrievalError::SymbolNotFound { symbol } if symbol == "BTC_NOPE"));
    }

    #[test]
    fn placeholder_candle_is_empty() {
        let body = r#"[{"date":0,"high":0,"low":0,"open":0,"close":0,"volume":0,"quoteVolume":0,"weightedAverage":0}]"#;
        assert!(matches!(
            PoloniexProvider::parse_chart("BTC_ETH", body),
            Err(RetrievalError::Parse(ParseError::Empty))
        ));
    }

    #[test]
    fn malformed_body_is_parse_error() {
        assert!(matches!(
            PoloniexProvider::parse_chart("BTC_ETH", r#"{"candles":1}"#),
            Err(RetrievalError::Parse(ParseError::Json(_)))
        ));
    }

    #[test]
    fn duplicate_candles_are_rejected() {
        let body = r#"[
            {"date":1483228800,"high":1,"low":1,"open":1,"close":1,"volume":1,"quoteVolume":1,"weightedAverage":1},
            {"date":1483228800,"high":2,"low":2,"open":2,"close":2,"volume":2,"quoteVolume":2,"weightedAverage":2}
        ]"#;
        assert!(matches!(
            PoloniexProvider::parse_chart("BTC_ETH", body),
            Err(RetrievalError::Parse(ParseError::Series(SeriesError::DuplicateDate { .. })))
        ));
    }

    #[test]
    fn sub_daily_candles_collide_on_the_same_date() {
        // Two 4h candles from 2017-01-01.
        let body = r#"[
            {"date":1483228800,"high":1,"low":1,"open":1,"close":1,"volume":1,"quoteVolume":1,"weightedAverage":1},
            {"date":1483243200,"high":2,"low":2,"open":2,"close":2,"volume":2,"quoteVolume":2,"weightedAverage":2}
        ]"#;
        match PoloniexProvider::parse_chart("BTC_ETH", body) {
            Err(RetrievalError::Parse(ParseError::Series(SeriesError::DuplicateDate { series, date }))) => {
                assert_eq!(series, "poloniex:BTC_ETH");
                assert_eq!(Some(date), NaiveDate::from_ymd_opt(2017, 1, 1));
            }
            other => panic!("expected a duplicate date, got {other:?}"),
        }
    }

    #[test]
    fn query_uses_default_start_and_today() {
        let provider = PoloniexProvider::new(PoloniexConfig::default()).unwrap();
        let today = NaiveDate::from_ymd_opt(2017, 12, 31).unwrap();
        let q = provider.chart_query(&FetchRequest::new("BTC_LTC"), today);
        let get = |k: &str| q.iter().find(|(n, _)| *n == k).map(|(_, v)| v.as_str());
        assert_eq!(get("currencyPair"), Some("BTC_LTC"));
        assert_eq!(get("start"), Some("1420070400"));
        assert_eq!(get("end"), Some("1514764799"));
        assert_eq!(get("period"), Some("86400"));
    }
}
