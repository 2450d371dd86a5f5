//! One day of market data for a single asset/exchange pair.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Daily OHLCV record.
///
/// Providers that omit a field store NaN; [`PricePoint::value`] reads NaN back
/// as "no value". `volume` is denominated in the base asset, `quote_volume` in
/// the quote currency. `weighted_price` is the volume-weighted average price
/// of the day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    #[serde(with = "nan_as_null")]
    pub open: f64,
    #[serde(with = "nan_as_null")]
    pub high: f64,
    #[serde(with = "nan_as_null")]
    pub low: f64,
    #[serde(with = "nan_as_null")]
    pub close: f64,
    #[serde(with = "nan_as_null")]
    pub volume: f64,
    #[serde(with = "nan_as_null")]
    pub quote_volume: f64,
    #[serde(with = "nan_as_null")]
    pub weighted_price: f64,
}

impl PricePoint {
    /// Read one field, treating non-finite values as missing.
    pub fn value(&self, field: PriceField) -> Option<f64> {
        let v = match field {
            PriceField::Open => self.open,
            PriceField::High => self.high,
            PriceField::Low => self.low,
            PriceField::Close => self.close,
            PriceField::Volume => self.volume,
            PriceField::QuoteVolume => self.quote_volume,
            PriceField::WeightedPrice => self.weighted_price,
        };
        v.is_finite().then_some(v)
    }
}

/// Typed selector for a single numeric column of a [`PricePoint`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceField {
    Open,
    High,
    Low,
    Close,
    Volume,
    QuoteVolume,
    WeightedPrice,
}

impl PriceField {
    pub const ALL: [PriceField; 7] = [
        PriceField::Open,
        PriceField::High,
        PriceField::Low,
        PriceField::Close,
        PriceField::Volume,
        PriceField::QuoteVolume,
        PriceField::WeightedPrice,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PriceField::Open => "open",
            PriceField::High => "high",
            PriceField::Low => "low",
            PriceField::Close => "close",
            PriceField::Volume => "volume",
            PriceField::QuoteVolume => "quote_volume",
            PriceField::WeightedPrice => "weighted_price",
        }
    }
}

impl fmt::Display for PriceField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PriceField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PriceField::ALL
            .into_iter()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| {
                let valid: Vec<&str> = PriceField::ALL.iter().map(|f| f.as_str()).collect();
                format!("unknown price field '{s}'. Valid: {}", valid.join(", "))
            })
    }
}

/// JSON has no NaN: missing values travel as `null`.
mod nan_as_null {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(v: &f64, s: S) -> Result<S::Ok, S::Error> {
        if v.is_finite() {
            s.serialize_f64(*v)
        } else {
            s.serialize_none()
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(d)?.unwrap_or(f64::NAN))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_point() -> PricePoint {
        PricePoint {
            date: NaiveDate::from_ymd_opt(2017, 6, 1).unwrap(),
            open: 2300.0,
            high: 2450.0,
            low: 2280.0,
            close: 2420.0,
            volume: 11_000.0,
            quote_volume: 26_000_000.0,
            weighted_price: 2390.5,
        }
    }

    #[test]
    fn value_reads_selected_field() {
        let p = sample_point();
        assert_eq!(p.value(PriceField::Close), Some(2420.0));
        assert_eq!(p.value(PriceField::WeightedPrice), Some(2390.5));
        assert_eq!(p.value(PriceField::QuoteVolume), Some(26_000_000.0));
    }

    #[test]
    fn nan_reads_as_missing() {
        let mut p = sample_point();
        p.weighted_price = f64::NAN;
        assert_eq!(p.value(PriceField::WeightedPrice), None);
        assert_eq!(p.value(PriceField::Close), Some(2420.0));
    }

    #[test]
    fn missing_values_roundtrip_through_json() {
        let mut p = sample_point();
        p.quote_volume = f64::NAN;
        let json = serde_json::to_string(&p).unwrap();
        assert!(json.contains("\"quote_volume\":null"));
        let back: PricePoint = serde_json::from_str(&json).unwrap();
        assert!(back.quote_volume.is_nan());
        assert_eq!(back.close, p.close);
    }

    #[test]
    fn field_parses_from_config_name() {
        assert_eq!("weighted_price".parse::<PriceField>().unwrap(), PriceField::WeightedPrice);
        assert!("vwap".parse::<PriceField>().is_err());
    }

    #[test]
    fn field_serde_matches_display() {
        for field in PriceField::ALL {
            let json = serde_json::to_string(&field).unwrap();
            assert_eq!(json, format!("\"{field}\""));
        }
    }
}
