//! Ordered, immutable daily history of one asset/exchange pair.

use super::price::PricePoint;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Where a series came from: provider name plus the provider's symbol
/// (a Quandl dataset code, a Poloniex currency pair, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SeriesSource {
    pub provider: String,
    pub symbol: String,
}

impl SeriesSource {
    pub fn new(provider: impl Into<String>, symbol: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            symbol: symbol.into(),
        }
    }
}

impl fmt::Display for SeriesSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.provider, self.symbol)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SeriesError {
    #[error("duplicate date {date} in series {series}")]
    DuplicateDate { series: String, date: NaiveDate },
}

/// Daily price history. Dates are unique and strictly increasing.
///
/// The only way to build one is [`PriceSeries::new`], which sorts the points
/// and rejects duplicate dates, so every value of this type upholds the
/// ordering invariant. There are no mutating methods.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSeries")]
pub struct PriceSeries {
    source: SeriesSource,
    points: Vec<PricePoint>,
}

/// Unchecked serde mirror; deserialization re-runs the invariant check.
#[derive(Deserialize)]
struct RawSeries {
    source: SeriesSource,
    points: Vec<PricePoint>,
}

impl TryFrom<RawSeries> for PriceSeries {
    type Error = SeriesError;

    fn try_from(raw: RawSeries) -> Result<Self, Self::Error> {
        PriceSeries::new(raw.source, raw.points)
    }
}

impl PriceSeries {
    pub fn new(source: SeriesSource, mut points: Vec<PricePoint>) -> Result<Self, SeriesError> {
        points.sort_by_key(|p| p.date);
        if let Some(w) = points.windows(2).find(|w| w[0].date == w[1].date) {
            return Err(SeriesError::DuplicateDate {
                series: source.to_string(),
                date: w[0].date,
            });
        }
        Ok(Self { source, points })
    }

    pub fn source(&self) -> &SeriesSource {
        &self.source
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.first().map(|p| p.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|p| p.date)
    }

    /// Binary search by date.
    pub fn get(&self, date: NaiveDate) -> Option<&PricePoint> {
        self.points
            .binary_search_by_key(&date, |p| p.date)
            .ok()
            .map(|i| &self.points[i])
    }

    /// New series restricted to `start..=end`.
    pub fn between(&self, start: NaiveDate, end: NaiveDate) -> PriceSeries {
        let points = self
            .points
            .iter()
            .filter(|p| p.date >= start && p.date <= end)
            .cloned()
            .collect();
        PriceSeries {
            source: self.source.clone(),
            points,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(date: &str, close: f64) -> PricePoint {
        PricePoint {
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            open: close,
            high: close,
            low: close,
            close,
            volume: 1.0,
            quote_volume: close,
            weighted_price: close,
        }
    }

    fn src() -> SeriesSource {
        SeriesSource::new("quandl", "BCHARTS/KRAKENUSD")
    }

    #[test]
    fn new_sorts_points_ascending() {
        let s = PriceSeries::new(
            src(),
            vec![point("2017-01-03", 3.0), point("2017-01-01", 1.0), point("2017-01-02", 2.0)],
        )
        .unwrap();
        let closes: Vec<f64> = s.points().iter().map(|p| p.close).collect();
        assert_eq!(closes, vec![1.0, 2.0, 3.0]);
        assert_eq!(s.first_date(), NaiveDate::from_ymd_opt(2017, 1, 1));
        assert_eq!(s.last_date(), NaiveDate::from_ymd_opt(2017, 1, 3));
    }

    #[test]
    fn new_rejects_duplicate_dates() {
        let err = PriceSeries::new(src(), vec![point("2017-01-01", 1.0), point("2017-01-01", 2.0)])
            .unwrap_err();
        assert!(matches!(err, SeriesError::DuplicateDate { .. }));
    }

    #[test]
    fn get_finds_by_date() {
        let s = PriceSeries::new(src(), vec![point("2017-01-01", 1.0), point("2017-01-05", 5.0)])
            .unwrap();
        assert_eq!(s.get(NaiveDate::from_ymd_opt(2017, 1, 5).unwrap()).unwrap().close, 5.0);
        assert!(s.get(NaiveDate::from_ymd_opt(2017, 1, 2).unwrap()).is_none());
    }

    #[test]
    fn deserialization_enforces_ordering_invariant() {
        let json = r#"{"source":{"provider":"p","symbol":"s"},"points":[
            {"date":"2017-01-01","open":1,"high":1,"low":1,"close":1,"volume":1,"quote_volume":1,"weighted_price":1},
            {"date":"2017-01-01","open":2,"high":2,"low":2,"close":2,"volume":2,"quote_volume":2,"weighted_price":2}
        ]}"#;
        assert!(serde_json::from_str::<PriceSeries>(json).is_err());
    }

    #[test]
    fn between_is_inclusive() {
        let s = PriceSeries::new(
            src(),
            vec![point("2016-12-31", 0.5), point("2017-01-01", 1.0), point("2017-12-31", 2.0)],
        )
        .unwrap();
        let y = s.between(
            NaiveDate::from_ymd_opt(2017, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2017, 12, 31).unwrap(),
        );
        assert_eq!(y.len(), 2);
        assert_eq!(y.source(), s.source());
    }
}
