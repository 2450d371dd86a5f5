//! Deterministic synthetic prices for offline runs and tests.
//!
//! Each symbol gets its own random walk seeded from the BLAKE3 hash of the
//! symbol, so the same request always yields the same series. Series built
//! here are tagged [`DataSource::Synthetic`] and must never be mistaken for
//! market data.

use super::provider::{DataSource, FetchRequest, ParseError, PriceProvider, RetrievalError};
use crate::domain::{PricePoint, PriceSeries, SeriesSource};
use chrono::{Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[derive(Debug, Clone)]
pub struct SyntheticConfig {
    pub default_start: NaiveDate,
    /// `None` means today.
    pub default_end: Option<NaiveDate>,
    /// Max absolute daily return.
    pub daily_volatility: f64,
    /// Probability that a day is published as all zeros, the way exchanges
    /// report outages.
    pub outage_rate: f64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            default_start: NaiveDate::from_ymd_opt(2015, 1, 1).unwrap_or_default(),
            default_end: None,
            daily_volatility: 0.05,
            outage_rate: 0.0,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SyntheticProvider {
    config: SyntheticConfig,
}

impl SyntheticProvider {
    pub fn new(config: SyntheticConfig) -> Self {
        Self { config }
    }

    /// Random walk over every calendar day in `start..=end`.
    pub fn generate(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Vec<PricePoint> {
        let seed: [u8; 32] = *blake3::hash(symbol.as_bytes()).as_bytes();
        let mut rng = StdRng::from_seed(seed);

        // BTC-quoted pairs trade at a fraction of a coin.
        let base = if symbol.starts_with("BTC_") { 0.02 } else { 400.0 };
        let mut price: f64 = base * rng.gen_range(0.5..2.0);
        let vol = self.config.daily_volatility.abs().max(f64::EPSILON);

        let mut points = Vec::new();
        let mut current = start;
        while current <= end {
            let ret: f64 = rng.gen_range(-vol..vol);
            let open = price;
            let close = price * (1.0 + ret);
            let high = open.max(close) * (1.0 + rng.gen_range(0.0..vol / 4.0));
            let low = open.min(close) * (1.0 - rng.gen_range(0.0..vol / 4.0));
            let volume: f64 = rng.gen_range(100.0..10_000.0);
            let weighted = (open + high + low + close) / 4.0;
            let outage = rng.gen_bool(self.config.outage_rate.clamp(0.0, 1.0));

            points.push(if outage {
                PricePoint {
                    date: current,
                    open: 0.0,
                    high: 0.0,
                    low: 0.0,
                    close: 0.0,
                    volume: 0.0,
                    quote_volume: 0.0,
                    weighted_price: 0.0,
                }
            } else {
                PricePoint {
                    date: current,
                    open,
                    high,
                    low,
                    close,
                    volume,
                    quote_volume: volume * weighted,
                    weighted_price: weighted,
                }
            });

            price = close;
            current += Duration::days(1);
        }
        points
    }
}

impl PriceProvider for SyntheticProvider {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn source(&self) -> DataSource {
        DataSource::Synthetic
    }

    fn fetch(&self, request: &FetchRequest) -> Result<PriceSeries, RetrievalError> {
        let start = request.start.unwrap_or(self.config.default_start);
        let end = request
            .end
            .or(self.config.default_end)
            .unwrap_or_else(|| chrono::Utc::now().date_naive());
        if start > end {
            return Err(ParseError::Empty.into());
        }

        tracing::warn!(
            symbol = %request.symbol,
            "generating synthetic data; results are not market data"
        );
        let points = self.generate(&request.symbol, start, end);
        Ok(PriceSeries::new(SeriesSource::new("synthetic", &request.symbol), points)
            .map_err(ParseError::from)?)
    }
}
