//! Criterion benchmarks for the analysis hot paths.
//!
//! Benchmarks:
//! 1. Union alignment with forward-fill across several series
//! 2. Correlation matrix over percent changes

use chrono::NaiveDate;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use cryptolab_core::analysis::{correlation_matrix, Transform};
use cryptolab_core::data::{align_series, AlignOptions, SyntheticProvider};
use cryptolab_core::domain::{PriceField, PriceSeries, SeriesSource};

// ── Helpers ──────────────────────────────────────────────────────────

const SYMBOLS: [&str; 10] = [
    "BTC_ETH", "BTC_LTC", "BTC_XRP", "BTC_ETC", "BTC_STR", "BTC_DASH", "BTC_SC", "BTC_XMR",
    "BTC_XEM", "BCHARTS/KRAKENUSD",
];

fn make_series(days: i64) -> Vec<PriceSeries> {
    let provider = SyntheticProvider::default();
    let start = NaiveDate::from_ymd_opt(2015, 1, 1).unwrap();
    let end = start + chrono::Duration::days(days - 1);
    SYMBOLS
        .iter()
        .map(|s| {
            PriceSeries::new(SeriesSource::new("synthetic", *s), provider.generate(s, start, end))
                .unwrap()
        })
        .collect()
}

// ── Benchmarks ───────────────────────────────────────────────────────

fn bench_align(c: &mut Criterion) {
    let mut group = c.benchmark_group("align_series");
    for days in [365, 1095] {
        let series = make_series(days);
        let inputs: Vec<(&str, &PriceSeries)> =
            SYMBOLS.iter().copied().zip(series.iter()).collect();
        group.bench_with_input(BenchmarkId::from_parameter(days), &inputs, |b, inputs| {
            b.iter(|| {
                align_series(
                    black_box(inputs),
                    PriceField::WeightedPrice,
                    &AlignOptions::default(),
                )
            })
        });
    }
    group.finish();
}

fn bench_correlation(c: &mut Criterion) {
    let mut group = c.benchmark_group("correlation_matrix");
    for days in [365, 1095] {
        let series = make_series(days);
        let inputs: Vec<(&str, &PriceSeries)> =
            SYMBOLS.iter().copied().zip(series.iter()).collect();
        let table =
            align_series(&inputs, PriceField::WeightedPrice, &AlignOptions::default()).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(days), &table, |b, table| {
            b.iter(|| correlation_matrix(black_box(table), Transform::PctChange))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_align, bench_correlation);
criterion_main!(benches);
