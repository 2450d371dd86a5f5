//! Integration tests for the fetch → cache → align → analyze chain, driven
//! by the synthetic provider so no network is needed.

use chrono::NaiveDate;
use cryptolab_core::analysis::{
    clean_zeros, correlation_matrix, scale_by, with_average, Transform,
};
use cryptolab_core::data::{
    align_series, AlignOptions, CacheKey, FetchRequest, PriceProvider, RetrievalError,
    SeriesCache, SyntheticConfig, SyntheticProvider,
};
use cryptolab_core::domain::{PriceField, PriceSeries};
use std::cell::Cell;

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn request(symbol: &str) -> FetchRequest {
    FetchRequest::new(symbol).with_range(Some(d(2016, 1, 1)), Some(d(2017, 12, 31)))
}

#[test]
fn second_fetch_is_byte_identical() {
    let dir = tempfile::tempdir().unwrap();
    let cache = SeriesCache::new(dir.path());
    let provider = SyntheticProvider::default();
    let calls = Cell::new(0);

    for symbol in ["BCHARTS/KRAKENUSD", "BTC_ETH", "BTC_XMR"] {
        let req = request(symbol);
        let key = CacheKey::for_request(provider.name(), &req).unwrap();
        let fetch = || {
            calls.set(calls.get() + 1);
            provider.fetch(&req)
        };

        let first: PriceSeries = cache.get_or_fetch::<RetrievalError, _>(&key, fetch).unwrap();
        let second: PriceSeries = cache.get_or_fetch::<RetrievalError, _>(&key, fetch).unwrap();

        assert_eq!(
            serde_json::to_vec(&first).unwrap(),
            serde_json::to_vec(&second).unwrap(),
            "cache changed {symbol}"
        );
    }
    assert_eq!(calls.get(), 3);
    assert_eq!(cache.entries().unwrap().len(), 3);
}

#[test]
fn btc_index_and_altcoin_conversion() {
    let provider = SyntheticProvider::new(SyntheticConfig {
        outage_rate: 0.05,
        ..SyntheticConfig::default()
    });

    let exchanges = ["KRAKEN", "COINBASE", "BITSTAMP"];
    let btc: Vec<PriceSeries> = exchanges
        .iter()
        .map(|e| provider.fetch(&request(&format!("BCHARTS/{e}USD"))).unwrap())
        .collect();
    let inputs: Vec<(&str, &PriceSeries)> = exchanges.iter().copied().zip(btc.iter()).collect();

    let merged = align_series(&inputs, PriceField::WeightedPrice, &AlignOptions::default()).unwrap();
    let cleaned = clean_zeros(&merged);
    assert!(cleaned
        .columns()
        .iter()
        .all(|c| c.values.iter().all(|v| *v != Some(0.0))));

    let index = with_average(&cleaned, &exchanges, "avg_btc_price_usd").unwrap();
    let avg = index.column("avg_btc_price_usd").unwrap();
    for i in 0..index.len() {
        let (_, row) = index.row(i).unwrap();
        let any_exchange = row[..exchanges.len()].iter().any(Option::is_some);
        assert_eq!(avg.values[i].is_some(), any_exchange);
    }

    let eth = provider.fetch(&request("BTC_ETH")).unwrap();
    let alts = align_series(&[("ETH", &eth)], PriceField::WeightedPrice, &AlignOptions::default())
        .unwrap()
        .with_column(avg.clone())
        .unwrap();
    let usd = scale_by(&alts, "avg_btc_price_usd", &["ETH"]).unwrap();

    let (_, row) = usd.row(100).unwrap();
    let (_, raw) = alts.row(100).unwrap();
    match (raw[0], raw[1]) {
        (Some(btc_price), Some(usd_per_btc)) => assert_eq!(row[0], Some(btc_price * usd_per_btc)),
        _ => assert_eq!(row[0], None),
    }

    let m = correlation_matrix(&usd.for_year(2017), Transform::PctChange).unwrap();
    assert_eq!(m.labels(), &["ETH".to_string(), "avg_btc_price_usd".to_string()]);
    assert_eq!(m.get("ETH", "ETH"), Some(1.0));
}
